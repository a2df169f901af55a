use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub backend: BackendConfig,
    pub runtime: RuntimeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Model execution backend. When `endpoint` is unset the service runs in
/// offline mode with canned replies and no tool dispatch.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub max_tool_rounds: u32,
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_ref().map(|value| !value.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub providers: ProviderMode,
    pub seed_demo_data: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    Sqlite,
    Fixture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub provider_mode: Option<ProviderMode>,
    pub seed_demo_data: Option<bool>,
    pub backend_endpoint: Option<String>,
    pub backend_api_key: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://concierge.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            backend: BackendConfig {
                endpoint: None,
                api_key: None,
                model: "gpt-4o".to_string(),
                poll_interval_ms: 250,
                poll_timeout_secs: 60,
                max_tool_rounds: 10,
            },
            runtime: RuntimeConfig { providers: ProviderMode::Sqlite, seed_demo_data: true },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl ProviderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Fixture => "fixture",
        }
    }
}

impl std::str::FromStr for ProviderMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "fixture" => Ok(Self::Fixture),
            other => Err(ConfigError::Validation(format!(
                "unsupported provider mode `{other}` (expected sqlite|fixture)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(endpoint) = backend.endpoint {
                self.backend.endpoint = Some(endpoint);
            }
            if let Some(api_key_value) = backend.api_key {
                self.backend.api_key = Some(api_key_value.into());
            }
            if let Some(model) = backend.model {
                self.backend.model = model;
            }
            if let Some(poll_interval_ms) = backend.poll_interval_ms {
                self.backend.poll_interval_ms = poll_interval_ms;
            }
            if let Some(poll_timeout_secs) = backend.poll_timeout_secs {
                self.backend.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(max_tool_rounds) = backend.max_tool_rounds {
                self.backend.max_tool_rounds = max_tool_rounds;
            }
        }

        if let Some(runtime) = patch.runtime {
            if let Some(providers) = runtime.providers {
                self.runtime.providers = providers;
            }
            if let Some(seed_demo_data) = runtime.seed_demo_data {
                self.runtime.seed_demo_data = seed_demo_data;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CONCIERGE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CONCIERGE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_BACKEND_ENDPOINT") {
            self.backend.endpoint = Some(value);
        }
        if let Some(value) = read_env("CONCIERGE_BACKEND_API_KEY") {
            self.backend.api_key = Some(value.into());
        }
        if let Some(value) = read_env("CONCIERGE_BACKEND_MODEL") {
            self.backend.model = value;
        }
        if let Some(value) = read_env("CONCIERGE_BACKEND_POLL_INTERVAL_MS") {
            self.backend.poll_interval_ms =
                parse_u64("CONCIERGE_BACKEND_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_BACKEND_POLL_TIMEOUT_SECS") {
            self.backend.poll_timeout_secs =
                parse_u64("CONCIERGE_BACKEND_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_BACKEND_MAX_TOOL_ROUNDS") {
            self.backend.max_tool_rounds = parse_u32("CONCIERGE_BACKEND_MAX_TOOL_ROUNDS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_RUNTIME_PROVIDERS") {
            self.runtime.providers = value.parse()?;
        }
        if let Some(value) = read_env("CONCIERGE_RUNTIME_SEED_DEMO_DATA") {
            self.runtime.seed_demo_data = parse_bool("CONCIERGE_RUNTIME_SEED_DEMO_DATA", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_PORT") {
            self.server.port = parse_u16("CONCIERGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("CONCIERGE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CONCIERGE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(provider_mode) = overrides.provider_mode {
            self.runtime.providers = provider_mode;
        }
        if let Some(seed_demo_data) = overrides.seed_demo_data {
            self.runtime.seed_demo_data = seed_demo_data;
        }
        if let Some(backend_endpoint) = overrides.backend_endpoint {
            self.backend.endpoint = Some(backend_endpoint);
        }
        if let Some(backend_api_key) = overrides.backend_api_key {
            self.backend.api_key = Some(backend_api_key.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_backend(&self.backend)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    if backend.is_configured() {
        let missing_key = backend
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing_key {
            return Err(ConfigError::Validation(
                "backend.api_key is required when backend.endpoint is set".to_string(),
            ));
        }

        let endpoint = backend.endpoint.as_deref().unwrap_or_default();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(
                "backend.endpoint must start with http:// or https://".to_string(),
            ));
        }
    }

    if backend.poll_interval_ms == 0 || backend.poll_interval_ms > 10_000 {
        return Err(ConfigError::Validation(
            "backend.poll_interval_ms must be in range 1..=10000".to_string(),
        ));
    }

    if backend.poll_timeout_secs == 0 || backend.poll_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "backend.poll_timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if backend.max_tool_rounds == 0 || backend.max_tool_rounds > 100 {
        return Err(ConfigError::Validation(
            "backend.max_tool_rounds must be in range 1..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    backend: Option<BackendPatch>,
    runtime: Option<RuntimePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    poll_interval_ms: Option<u64>,
    poll_timeout_secs: Option<u64>,
    max_tool_rounds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RuntimePatch {
    providers: Option<ProviderMode>,
    seed_demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
