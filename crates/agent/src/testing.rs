//! Scripted backend for exercising the runner and orchestrator without a
//! live model service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use concierge_core::{AgentKind, BackendError, MessageRole};

use crate::backend::{ModelBackend, RunId, RunState, ThreadId, ToolInvocation, ToolOutput};

/// One pre-scripted run: the sequence of states `poll_run` walks through and
/// the final reply once `Completed` is reached.
#[derive(Clone, Debug)]
pub struct RunScript {
    states: Vec<RunState>,
    final_text: String,
}

impl RunScript {
    pub fn new(states: Vec<RunState>, final_text: impl Into<String>) -> Self {
        Self { states, final_text: final_text.into() }
    }

    pub fn completed(final_text: impl Into<String>) -> Self {
        Self::new(vec![RunState::InProgress, RunState::Completed], final_text)
    }

    pub fn failed() -> Self {
        Self::new(vec![RunState::InProgress, RunState::Failed], String::new())
    }

    pub fn with_tool_round(
        invocations: Vec<ToolInvocation>,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(
            vec![RunState::NeedsToolResults(invocations), RunState::Completed],
            final_text,
        )
    }
}

struct ActiveRun {
    states: VecDeque<RunState>,
    final_text: String,
}

/// Backend that replays one `RunScript` per started run, in order. Records
/// appended messages and submitted tool outputs for assertions.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<RunScript>>,
    runs: Mutex<HashMap<String, ActiveRun>>,
    counter: AtomicU64,
    appended: Mutex<Vec<(MessageRole, String)>>,
    submitted: Mutex<Vec<Vec<ToolOutput>>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<RunScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            runs: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            appended: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn appended_messages(&self) -> Vec<(MessageRole, String)> {
        self.appended.lock().unwrap().clone()
    }

    pub fn submitted_outputs(&self) -> Vec<Vec<ToolOutput>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn create_thread(&self) -> Result<ThreadId, BackendError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ThreadId(format!("thread-{n}")))
    }

    async fn append_message(
        &self,
        _thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> Result<(), BackendError> {
        self.appended.lock().unwrap().push((role, content.to_string()));
        Ok(())
    }

    async fn start_run(
        &self,
        thread: &ThreadId,
        _agent: AgentKind,
    ) -> Result<RunId, BackendError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Unreachable("no script left".to_string()))?;
        self.runs.lock().unwrap().insert(
            thread.0.clone(),
            ActiveRun { states: script.states.into(), final_text: script.final_text },
        );
        Ok(RunId(format!("run-for-{}", thread.0)))
    }

    async fn poll_run(&self, thread: &ThreadId, _run: &RunId) -> Result<RunState, BackendError> {
        let mut runs = self.runs.lock().unwrap();
        let active = runs
            .get_mut(&thread.0)
            .ok_or_else(|| BackendError::Unreachable("unknown thread".to_string()))?;
        Ok(active.states.pop_front().unwrap_or(RunState::Completed))
    }

    async fn submit_tool_outputs(
        &self,
        _thread: &ThreadId,
        _run: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError> {
        self.submitted.lock().unwrap().push(outputs);
        Ok(())
    }

    async fn final_message(&self, thread: &ThreadId) -> Result<String, BackendError> {
        let runs = self.runs.lock().unwrap();
        let active = runs
            .get(&thread.0)
            .ok_or_else(|| BackendError::Unreachable("unknown thread".to_string()))?;
        Ok(active.final_text.clone())
    }
}

/// Backend whose every call fails, for exercising degraded paths.
pub struct UnreachableBackend;

#[async_trait]
impl ModelBackend for UnreachableBackend {
    async fn create_thread(&self) -> Result<ThreadId, BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }

    async fn append_message(
        &self,
        _thread: &ThreadId,
        _role: MessageRole,
        _content: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }

    async fn start_run(
        &self,
        _thread: &ThreadId,
        _agent: AgentKind,
    ) -> Result<RunId, BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }

    async fn poll_run(&self, _thread: &ThreadId, _run: &RunId) -> Result<RunState, BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }

    async fn submit_tool_outputs(
        &self,
        _thread: &ThreadId,
        _run: &RunId,
        _outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }

    async fn final_message(&self, _thread: &ThreadId) -> Result<String, BackendError> {
        Err(BackendError::Unreachable("connection refused".to_string()))
    }
}
