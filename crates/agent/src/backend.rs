use async_trait::async_trait;
use serde_json::Value;

use concierge_core::{AgentKind, BackendError, MessageRole};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreadId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(pub String);

/// One tool call requested by a paused run. The id correlates the later
/// result with this request.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub invocation_id: String,
    pub output: Value,
}

/// Closed state machine for one agent run. A run lives for exactly one
/// `AgentRunner` invocation and is never persisted.
#[derive(Clone, Debug, PartialEq)]
pub enum RunState {
    Pending,
    InProgress,
    NeedsToolResults(Vec<ToolInvocation>),
    Completed,
    Failed,
}

/// Black-box model execution backend. Threads are isolated per call and never
/// reused across sessions.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId, BackendError>;

    async fn append_message(
        &self,
        thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> Result<(), BackendError>;

    async fn start_run(&self, thread: &ThreadId, agent: AgentKind) -> Result<RunId, BackendError>;

    async fn poll_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunState, BackendError>;

    /// Every invocation surfaced by `NeedsToolResults` must receive exactly
    /// one correlated output before the run resumes.
    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError>;

    /// Latest assistant message on the thread, once the run has completed.
    async fn final_message(&self, thread: &ThreadId) -> Result<String, BackendError>;
}
