use thiserror::Error;

/// Failures of the model execution backend. These are the only errors that
/// surface to the caller as a request failure; classification and tool
/// failures are absorbed locally into degraded results.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("model backend unreachable: {0}")]
    Unreachable(String),
    #[error("run `{run_id}` ended in a failed state")]
    RunFailed { run_id: String },
    #[error("tool-resolution round cap of {cap} exceeded")]
    RoundCapExceeded { cap: u32 },
    #[error("run polling exceeded the {secs}s wall-clock ceiling")]
    PollTimeout { secs: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl OrchestratorError {
    /// Message safe to show an end user; detail stays in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Backend(_) => {
                "The assistant is temporarily unavailable. Please retry shortly."
            }
            Self::Persistence(_) => "The service could not save this conversation. Please retry.",
        }
    }
}
