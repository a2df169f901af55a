use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

use concierge_core::{
    AgentKind, Classification, Message, NewMessage, OrchestratorError, SessionId,
};
use concierge_db::ConversationStore;

use crate::classifier::Classifier;
use crate::runner::ReplyEngine;
use crate::tools::ToolDispatcher;

/// Tokens per streamed `content` fragment.
const CHUNK_TOKENS: usize = 3;

const STREAM_BUFFER: usize = 32;

/// Result of one single-shot orchestration call. The trace is display-only
/// and never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub agent: &'static str,
    pub trace: Vec<String>,
}

/// Discriminated streaming event. The concatenation of all `content`
/// fragments equals the single-shot response for the same input.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Thought { agent: String, content: String },
    AgentSwitch { agent: String },
    Content { agent: String, content: String },
    Error { message: String },
    Done,
}

/// Top-level coordinator. Owns session persistence glue around one linear
/// pass: classify, route, run the agent, persist the reply. Collaborators
/// arrive by injection; there is no ambient state.
pub struct Orchestrator {
    conversations: Arc<dyn ConversationStore>,
    classifier: Classifier,
    engine: ReplyEngine,
    dispatcher: ToolDispatcher,
}

impl Orchestrator {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        classifier: Classifier,
        engine: ReplyEngine,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self { conversations, classifier, engine, dispatcher }
    }

    /// Single-shot path. Appends exactly one user message before
    /// classification and exactly one agent-tagged assistant message after a
    /// reply is obtained; a backend failure appends no assistant message.
    pub async fn process(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<ChatOutcome, OrchestratorError> {
        let (agent, context, classification) = self.prepare(session_id, message).await?;

        let response = self.engine.reply(agent, message, &context, &self.dispatcher).await?;

        self.conversations
            .append_message(session_id, NewMessage::assistant(&response, agent))
            .await
            .map_err(|e| OrchestratorError::Persistence(e.to_string()))?;

        info!(
            event_name = "orchestrator.replied",
            session_id = %session_id,
            agent = %agent,
            intent = classification.intent.as_label(),
            "assistant reply persisted"
        );

        Ok(ChatOutcome {
            response,
            agent: agent.display_name(),
            trace: vec![
                format!(
                    "Classified as {}: {}",
                    classification.intent.as_label(),
                    classification.summary
                ),
                format!("Routing to {}", agent.display_name()),
            ],
        })
    }

    /// Streaming path. Same routing semantics as `process`, delivered as a
    /// finite event sequence ending in `done`, or in `error` if the run
    /// fails mid-stream (in which case no assistant message is appended).
    pub fn process_stream(
        self: &Arc<Self>,
        session_id: SessionId,
        message: String,
    ) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.stream_inner(&session_id, &message, tx).await;
        });
        rx
    }

    async fn stream_inner(
        &self,
        session_id: &SessionId,
        message: &str,
        tx: mpsc::Sender<ChatEvent>,
    ) {
        let triage = AgentKind::Triage.display_name().to_string();
        let _ = tx
            .send(ChatEvent::Thought {
                agent: triage.clone(),
                content: "Analyzing the request to pick the right specialist...".to_string(),
            })
            .await;

        let (agent, context, classification) = match self.prepare(session_id, message).await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.emit_failure(&tx, &err).await;
                return;
            }
        };

        let _ = tx
            .send(ChatEvent::Thought {
                agent: triage,
                content: format!(
                    "Classified as {}. Routing to {}.",
                    classification.intent.as_label(),
                    agent.display_name()
                ),
            })
            .await;
        let _ =
            tx.send(ChatEvent::AgentSwitch { agent: agent.display_name().to_string() }).await;

        let response = match self.engine.reply(agent, message, &context, &self.dispatcher).await
        {
            Ok(response) => response,
            Err(err) => {
                self.emit_failure(&tx, &OrchestratorError::from(err)).await;
                return;
            }
        };

        for fragment in chunk_response(&response) {
            let _ = tx
                .send(ChatEvent::Content {
                    agent: agent.display_name().to_string(),
                    content: fragment,
                })
                .await;
        }

        if let Err(e) = self
            .conversations
            .append_message(session_id, NewMessage::assistant(&response, agent))
            .await
        {
            self.emit_failure(&tx, &OrchestratorError::Persistence(e.to_string())).await;
            return;
        }

        let _ = tx.send(ChatEvent::Done).await;
    }

    /// Shared front half of both paths: persist the user message, fetch
    /// context, classify, route.
    async fn prepare(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<(AgentKind, Vec<Message>, Classification), OrchestratorError> {
        self.conversations
            .append_message(session_id, NewMessage::user(message))
            .await
            .map_err(|e| OrchestratorError::Persistence(e.to_string()))?;

        let history = self
            .conversations
            .history(session_id)
            .await
            .map_err(|e| OrchestratorError::Persistence(e.to_string()))?;
        // The context window excludes the message just appended.
        let context = match history.split_last() {
            Some((_, earlier)) => earlier.to_vec(),
            None => Vec::new(),
        };

        let classification = self.classifier.classify(message).await;
        let agent = crate::router::route(classification.intent);

        info!(
            event_name = "orchestrator.routed",
            session_id = %session_id,
            intent = classification.intent.as_label(),
            agent = %agent,
            "message classified and routed"
        );

        Ok((agent, context, classification))
    }

    async fn emit_failure(&self, tx: &mpsc::Sender<ChatEvent>, err: &OrchestratorError) {
        error!(
            event_name = "orchestrator.stream_failed",
            error = %err,
            "stream terminated with an error event"
        );
        let _ = tx.send(ChatEvent::Error { message: err.user_message().to_string() }).await;
    }
}

/// Splits a complete reply into fragments of `CHUNK_TOKENS` whitespace
/// delimited tokens. Fragments are slices of the original text, so their
/// concatenation reproduces it byte for byte.
fn chunk_response(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut tokens_seen = 0;
    let mut in_token = false;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_token {
                in_token = false;
                tokens_seen += 1;
            }
        } else if !in_token {
            in_token = true;
            if tokens_seen == CHUNK_TOKENS {
                fragments.push(text[start..idx].to_string());
                start = idx;
                tokens_seen = 0;
            }
        }
    }
    if start < text.len() {
        fragments.push(text[start..].to_string());
    }

    fragments
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use concierge_core::{MessageRole, SessionId};
    use concierge_db::{
        ConversationStore, InMemoryConversationStore, InMemoryOrderStore, InMemoryProductCatalog,
    };

    use super::{chunk_response, ChatEvent, Orchestrator};
    use crate::classifier::Classifier;
    use crate::runner::{AgentRunner, ReplyEngine, RunnerSettings};
    use crate::testing::{RunScript, ScriptedBackend};
    use crate::backend::ToolInvocation;
    use crate::tools::ToolDispatcher;

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(
            Arc::new(InMemoryProductCatalog::default()),
            Arc::new(InMemoryOrderStore::default()),
        )
    }

    fn fast_settings() -> RunnerSettings {
        RunnerSettings {
            poll_interval: Duration::from_millis(1),
            poll_timeout: Duration::from_secs(5),
            max_tool_rounds: 3,
        }
    }

    fn live_orchestrator(
        backend: Arc<ScriptedBackend>,
        conversations: Arc<InMemoryConversationStore>,
    ) -> Arc<Orchestrator> {
        let runner = AgentRunner::new(backend, fast_settings());
        Arc::new(Orchestrator::new(
            conversations,
            Classifier::live(runner.clone()),
            ReplyEngine::Live(runner),
            dispatcher(),
        ))
    }

    fn canned_orchestrator(conversations: Arc<InMemoryConversationStore>) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            conversations,
            Classifier::offline(),
            ReplyEngine::Canned,
            dispatcher(),
        ))
    }

    async fn collect_events(mut rx: tokio::sync::mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn chunks_reassemble_to_the_original_text() {
        let text = "Your order ORD-001 shipped via UPS and should arrive by January 14.";
        let fragments = chunk_response(text);
        assert!(fragments.len() > 1);
        assert_eq!(fragments.concat(), text);
    }

    #[test]
    fn empty_replies_produce_no_fragments() {
        assert!(chunk_response("").is_empty());
    }

    #[tokio::test]
    async fn tracked_order_scenario_ends_with_two_messages() {
        let triage = RunScript::completed(
            r#"{"classification": "ORDER", "summary": "order status question"}"#,
        );
        let agent_run = RunScript::with_tool_round(
            vec![ToolInvocation {
                id: "call-1".to_string(),
                name: "track_delivery".to_string(),
                arguments: json!({ "order_id": "ORD-001" }),
            }],
            "ORD-001 is on its way via UPS, tracking 1Z999AA10123456784.",
        );
        let backend = Arc::new(ScriptedBackend::new(vec![triage, agent_run]));
        let conversations = Arc::new(InMemoryConversationStore::default());
        let orchestrator = live_orchestrator(backend, Arc::clone(&conversations));

        let session = SessionId("s1".to_string());
        let outcome = orchestrator
            .process(&session, "Where is my order ORD-001?")
            .await
            .expect("process should succeed");

        assert_eq!(outcome.agent, "Order Support Specialist");
        assert!(outcome.response.contains("1Z999AA10123456784"));

        let history = conversations.history(&session).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, outcome.response);
    }

    #[tokio::test]
    async fn backend_failure_appends_no_assistant_message() {
        let triage = RunScript::completed(
            r#"{"classification": "ORDER", "summary": "order status question"}"#,
        );
        let backend = Arc::new(ScriptedBackend::new(vec![triage, RunScript::failed()]));
        let conversations = Arc::new(InMemoryConversationStore::default());
        let orchestrator = live_orchestrator(backend, Arc::clone(&conversations));

        let session = SessionId("s1".to_string());
        let err = orchestrator
            .process(&session, "track my order")
            .await
            .expect_err("run failure should surface");
        assert!(matches!(err, concierge_core::OrchestratorError::Backend(_)));

        let history = conversations.history(&session).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn stream_concatenation_matches_the_single_shot_reply() {
        let reply = "ORD-001 is on its way via UPS and should arrive by January 14.";
        let session = SessionId("s1".to_string());

        let single_conversations = Arc::new(InMemoryConversationStore::default());
        let single = live_orchestrator(
            Arc::new(ScriptedBackend::new(vec![
                RunScript::completed(r#"{"classification": "ORDER", "summary": "s"}"#),
                RunScript::completed(reply),
            ])),
            single_conversations,
        );
        let outcome = single
            .process(&session, "Where is my order ORD-001?")
            .await
            .expect("single shot");

        let stream_conversations = Arc::new(InMemoryConversationStore::default());
        let streaming = live_orchestrator(
            Arc::new(ScriptedBackend::new(vec![
                RunScript::completed(r#"{"classification": "ORDER", "summary": "s"}"#),
                RunScript::completed(reply),
            ])),
            Arc::clone(&stream_conversations),
        );
        let events = collect_events(
            streaming
                .process_stream(session.clone(), "Where is my order ORD-001?".to_string()),
        )
        .await;

        let streamed: String = events
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Content { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, outcome.response);
        assert_eq!(events.last(), Some(&ChatEvent::Done));

        let history = stream_conversations.history(&session).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, outcome.response);
    }

    #[tokio::test]
    async fn stream_emits_events_in_the_required_order() {
        let conversations = Arc::new(InMemoryConversationStore::default());
        let orchestrator = canned_orchestrator(conversations);

        let events = collect_events(
            orchestrator
                .process_stream(SessionId("s1".to_string()), "hello there".to_string()),
        )
        .await;

        assert!(matches!(events[0], ChatEvent::Thought { .. }));
        assert!(matches!(events[1], ChatEvent::Thought { .. }));
        assert!(matches!(events[2], ChatEvent::AgentSwitch { .. }));
        assert!(matches!(events[3], ChatEvent::Content { .. }));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
    }

    #[tokio::test]
    async fn stream_failure_ends_with_an_error_event_and_no_assistant_message() {
        let triage = RunScript::completed(
            r#"{"classification": "ORDER", "summary": "order status question"}"#,
        );
        let backend = Arc::new(ScriptedBackend::new(vec![triage, RunScript::failed()]));
        let conversations = Arc::new(InMemoryConversationStore::default());
        let orchestrator = live_orchestrator(backend, Arc::clone(&conversations));

        let session = SessionId("s1".to_string());
        let events = collect_events(
            orchestrator.process_stream(session.clone(), "track my order".to_string()),
        )
        .await;

        assert!(matches!(events.last(), Some(ChatEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Content { .. })));

        let history = conversations.history(&session).await.expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn canned_mode_still_honors_the_two_message_invariant() {
        let conversations = Arc::new(InMemoryConversationStore::default());
        let orchestrator = canned_orchestrator(Arc::clone(&conversations));

        let session = SessionId("s1".to_string());
        let outcome = orchestrator
            .process(&session, "what is the best shampoo for dry hair?")
            .await
            .expect("canned mode never fails on the backend");

        assert_eq!(outcome.agent, "Product Expert");
        let history = conversations.history(&session).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].agent, Some(concierge_core::AgentKind::Product));
    }
}
