//! Routing-and-dispatch core of the concierge service.
//!
//! An inbound message flows strictly downward:
//! 1. **Classification** (`classifier`) - place the message in a closed intent set
//! 2. **Routing** (`router`) - map the intent to a specialist agent
//! 3. **Execution** (`runner`) - drive one agent run against the model backend,
//!    resolving tool calls through the dispatcher until a final reply lands
//! 4. **Persistence** - the orchestrator appends exactly one user and one
//!    assistant message per inbound call
//!
//! # Key Types
//!
//! - `Orchestrator` - top-level coordinator with single-shot and streaming paths
//! - `ModelBackend` - pluggable trait for the agent execution backend
//! - `ToolDispatcher` - tool name -> capability-provider call, never raises
//!
//! The model backend is strictly a text generator. Order lookups, catalog
//! search, and return decisions are deterministic provider calls; the backend
//! only chooses which tools to ask for and how to phrase the reply.

pub mod backend;
pub mod classifier;
pub mod http;
pub mod orchestrator;
pub mod router;
pub mod runner;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ModelBackend, RunId, RunState, ThreadId, ToolInvocation, ToolOutput};
pub use classifier::Classifier;
pub use http::HttpModelBackend;
pub use orchestrator::{ChatEvent, ChatOutcome, Orchestrator};
pub use runner::{AgentRunner, ReplyEngine, RunnerSettings};
pub use tools::ToolDispatcher;
