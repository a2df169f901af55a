use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use concierge_agent::{
    AgentRunner, Classifier, HttpModelBackend, Orchestrator, ReplyEngine, RunnerSettings,
    ToolDispatcher,
};
use concierge_core::config::{AppConfig, ConfigError, LoadOptions, ProviderMode};
use concierge_db::{
    connect_with_settings, fixtures, migrations, ConversationStore, DbPool,
    InMemoryConversationStore, InMemoryOrderStore, InMemoryProductCatalog, OrderStore,
    ProductCatalog, RepositoryError, SqlConversationStore, SqlOrderStore, SqlProductCatalog,
};

use crate::chat::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("demo data seed failed: {0}")]
    Seed(#[source] RepositoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let (conversations, catalog, orders) = providers(&config, &db_pool).await?;

    let dispatcher = ToolDispatcher::new(Arc::clone(&catalog), Arc::clone(&orders));
    let (classifier, engine) = reply_stack(&config);

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&conversations),
        classifier,
        engine,
        dispatcher,
    ));

    info!(
        event_name = "system.bootstrap.ready",
        providers = config.runtime.providers.as_str(),
        backend_configured = config.backend.is_configured(),
        "application assembled"
    );

    Ok(Application {
        state: ApiState::new(orchestrator, conversations, catalog, orders),
        config,
        db_pool,
    })
}

type Providers =
    (Arc<dyn ConversationStore>, Arc<dyn ProductCatalog>, Arc<dyn OrderStore>);

async fn providers(config: &AppConfig, db_pool: &DbPool) -> Result<Providers, BootstrapError> {
    match config.runtime.providers {
        ProviderMode::Sqlite => {
            if config.runtime.seed_demo_data {
                fixtures::seed(db_pool).await.map_err(BootstrapError::Seed)?;
            }
            Ok((
                Arc::new(SqlConversationStore::new(db_pool.clone())),
                Arc::new(SqlProductCatalog::new(db_pool.clone())),
                Arc::new(SqlOrderStore::new(db_pool.clone())),
            ))
        }
        ProviderMode::Fixture => Ok((
            Arc::new(InMemoryConversationStore::default()),
            Arc::new(InMemoryProductCatalog::default()),
            Arc::new(InMemoryOrderStore::default()),
        )),
    }
}

fn reply_stack(config: &AppConfig) -> (Classifier, ReplyEngine) {
    match HttpModelBackend::from_config(&config.backend) {
        Some(backend) => {
            let runner =
                AgentRunner::new(Arc::new(backend), RunnerSettings::from(&config.backend));
            (Classifier::live(runner.clone()), ReplyEngine::Live(runner))
        }
        None => {
            info!(
                event_name = "system.bootstrap.canned_replies",
                "no model backend configured, serving canned replies"
            );
            (Classifier::offline(), ReplyEngine::Canned)
        }
    }
}
