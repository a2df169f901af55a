use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use concierge_core::config::BackendConfig;
use concierge_core::{AgentKind, BackendError, Message, MessageRole};

use crate::backend::{ModelBackend, RunState};
use crate::tools::ToolDispatcher;

/// Most recent history messages submitted alongside the new user message.
const HISTORY_WINDOW: usize = 5;

#[derive(Clone, Copy, Debug)]
pub struct RunnerSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub max_tool_rounds: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            poll_timeout: Duration::from_secs(60),
            max_tool_rounds: 10,
        }
    }
}

impl From<&BackendConfig> for RunnerSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

/// Drives one agent run to a terminal state: fresh thread, bounded history,
/// fixed-delay polling, tool resolution rounds under a hard cap, and a
/// wall-clock ceiling on the whole cycle.
#[derive(Clone)]
pub struct AgentRunner {
    backend: Arc<dyn ModelBackend>,
    settings: RunnerSettings,
}

impl AgentRunner {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: RunnerSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn run(
        &self,
        agent: AgentKind,
        message: &str,
        history: &[Message],
        dispatcher: &ToolDispatcher,
    ) -> Result<String, BackendError> {
        self.run_inner(agent, message, history, Some(dispatcher)).await
    }

    /// Single-turn exchange with no history and no tool resolution. Used for
    /// classification, where the triage agent declares no tools.
    pub async fn run_single_turn(
        &self,
        agent: AgentKind,
        message: &str,
    ) -> Result<String, BackendError> {
        self.run_inner(agent, message, &[], None).await
    }

    async fn run_inner(
        &self,
        agent: AgentKind,
        message: &str,
        history: &[Message],
        dispatcher: Option<&ToolDispatcher>,
    ) -> Result<String, BackendError> {
        let thread = self.backend.create_thread().await?;

        let window_start = history.len().saturating_sub(HISTORY_WINDOW);
        for past in &history[window_start..] {
            self.backend.append_message(&thread, past.role, &past.content).await?;
        }
        self.backend.append_message(&thread, MessageRole::User, message).await?;

        let run = self.backend.start_run(&thread, agent).await?;
        let deadline = Instant::now() + self.settings.poll_timeout;
        let mut rounds = 0u32;

        loop {
            if Instant::now() >= deadline {
                return Err(BackendError::PollTimeout {
                    secs: self.settings.poll_timeout.as_secs(),
                });
            }

            match self.backend.poll_run(&thread, &run).await? {
                RunState::Pending | RunState::InProgress => {
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
                RunState::NeedsToolResults(invocations) => {
                    rounds += 1;
                    if rounds > self.settings.max_tool_rounds {
                        return Err(BackendError::RoundCapExceeded {
                            cap: self.settings.max_tool_rounds,
                        });
                    }
                    let Some(dispatcher) = dispatcher else {
                        warn!(
                            event_name = "runner.unexpected_tool_request",
                            agent = %agent,
                            "toolless run paused for tool results"
                        );
                        return Err(BackendError::RunFailed { run_id: run.0.clone() });
                    };

                    debug!(
                        event_name = "runner.tool_round",
                        agent = %agent,
                        round = rounds,
                        invocations = invocations.len(),
                        "resolving tool invocations"
                    );
                    let mut outputs = Vec::with_capacity(invocations.len());
                    for invocation in &invocations {
                        outputs.push(dispatcher.dispatch(invocation).await);
                    }
                    self.backend.submit_tool_outputs(&thread, &run, outputs).await?;
                }
                RunState::Completed => return self.backend.final_message(&thread).await,
                RunState::Failed => {
                    return Err(BackendError::RunFailed { run_id: run.0.clone() })
                }
            }
        }
    }
}

/// Either a live backend-driven runner or a fixed canned reply per agent.
/// Selected once at bootstrap, so the orchestration path never branches on
/// whether a backend is configured.
#[derive(Clone)]
pub enum ReplyEngine {
    Live(AgentRunner),
    Canned,
}

impl ReplyEngine {
    pub async fn reply(
        &self,
        agent: AgentKind,
        message: &str,
        history: &[Message],
        dispatcher: &ToolDispatcher,
    ) -> Result<String, BackendError> {
        match self {
            Self::Live(runner) => runner.run(agent, message, history, dispatcher).await,
            Self::Canned => Ok(canned_reply(agent).to_string()),
        }
    }
}

/// Offline/demo reply, keyed by agent identity. Never touches the dispatcher.
pub fn canned_reply(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::Triage => {
            "Thanks for reaching out! I can help with product questions, order \
             status, deliveries, and returns. Could you tell me a bit more about \
             what you need?"
        }
        AgentKind::Product => {
            "I'd be happy to help you find the right product. We carry shampoos, \
             laundry detergents, soaps, and household cleaners. Let me know what \
             you're looking for and I'll suggest a good match."
        }
        AgentKind::Order => {
            "I can help with your order. Please share your order ID (it looks \
             like ORD-123) or the email address used at checkout, and I'll look \
             up the status for you."
        }
    }
}
