use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use concierge_core::config::BackendConfig;
use concierge_core::{AgentKind, BackendError, MessageRole};

use crate::backend::{ModelBackend, RunId, RunState, ThreadId, ToolInvocation, ToolOutput};
use crate::tools::tool_definition;

/// Assistants-style REST client for the model execution backend. One thread
/// per orchestration call; the api key travels in a header and is never
/// logged.
pub struct HttpModelBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl HttpModelBackend {
    pub fn new(endpoint: impl Into<String>, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Builds a client from config when an endpoint and api key are present.
    pub fn from_config(config: &BackendConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let api_key = config.api_key.clone()?;
        Some(Self::new(endpoint, api_key, config.model.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        response.json().await.map_err(|e| BackendError::Unreachable(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Value, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .header("api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        response.json().await.map_err(|e| BackendError::Unreachable(e.to_string()))
    }
}

#[derive(Deserialize)]
struct CreatedResource {
    id: String,
}

#[derive(Deserialize)]
struct RunStatus {
    status: String,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    // The wire format carries arguments as a JSON-encoded string.
    arguments: String,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Unreachable(e.to_string()))
}

fn run_state_from(status: RunStatus, run_id: &RunId) -> RunState {
    match status.status.as_str() {
        "queued" => RunState::Pending,
        "in_progress" => RunState::InProgress,
        "requires_action" => {
            let invocations = status
                .required_action
                .map(|action| {
                    action
                        .submit_tool_outputs
                        .tool_calls
                        .into_iter()
                        .map(|call| ToolInvocation {
                            id: call.id,
                            name: call.function.name,
                            arguments: serde_json::from_str(&call.function.arguments)
                                .unwrap_or(Value::Null),
                        })
                        .collect()
                })
                .unwrap_or_default();
            RunState::NeedsToolResults(invocations)
        }
        "completed" => RunState::Completed,
        other => {
            debug!(
                event_name = "backend.terminal_status",
                run_id = %run_id.0,
                status = other,
                "treating run status as failed"
            );
            RunState::Failed
        }
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn create_thread(&self) -> Result<ThreadId, BackendError> {
        let created: CreatedResource = decode(self.post("/threads", json!({})).await?)?;
        Ok(ThreadId(created.id))
    }

    async fn append_message(
        &self,
        thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> Result<(), BackendError> {
        self.post(
            &format!("/threads/{}/messages", thread.0),
            json!({ "role": role.as_str(), "content": content }),
        )
        .await?;
        Ok(())
    }

    async fn start_run(&self, thread: &ThreadId, agent: AgentKind) -> Result<RunId, BackendError> {
        let tools: Vec<Value> =
            agent.tool_names().iter().map(|name| tool_definition(name)).collect();
        let created: CreatedResource = decode(
            self.post(
                &format!("/threads/{}/runs", thread.0),
                json!({
                    "model": self.model,
                    "instructions": agent.instructions(),
                    "tools": tools,
                }),
            )
            .await?,
        )?;
        Ok(RunId(created.id))
    }

    async fn poll_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunState, BackendError> {
        let status: RunStatus =
            decode(self.get(&format!("/threads/{}/runs/{}", thread.0, run.0)).await?)?;
        Ok(run_state_from(status, run))
    }

    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError> {
        let tool_outputs: Vec<Value> = outputs
            .iter()
            .map(|output| {
                json!({
                    "tool_call_id": output.invocation_id,
                    "output": output.output.to_string(),
                })
            })
            .collect();
        self.post(
            &format!("/threads/{}/runs/{}/submit_tool_outputs", thread.0, run.0),
            json!({ "tool_outputs": tool_outputs }),
        )
        .await?;
        Ok(())
    }

    async fn final_message(&self, thread: &ThreadId) -> Result<String, BackendError> {
        let body =
            self.get(&format!("/threads/{}/messages?order=desc&limit=1", thread.0)).await?;
        let text = body["data"][0]["content"][0]["text"]["value"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{run_state_from, RunStatus};
    use crate::backend::{RunId, RunState};

    fn status(json: &str) -> RunStatus {
        serde_json::from_str(json).expect("valid status json")
    }

    #[test]
    fn wire_statuses_map_onto_the_run_state_machine() {
        let run = RunId("run-1".to_string());
        assert_eq!(run_state_from(status(r#"{"status": "queued"}"#), &run), RunState::Pending);
        assert_eq!(
            run_state_from(status(r#"{"status": "in_progress"}"#), &run),
            RunState::InProgress
        );
        assert_eq!(
            run_state_from(status(r#"{"status": "completed"}"#), &run),
            RunState::Completed
        );
        assert_eq!(run_state_from(status(r#"{"status": "expired"}"#), &run), RunState::Failed);
    }

    #[test]
    fn required_action_carries_decoded_invocations() {
        let run = RunId("run-1".to_string());
        let state = run_state_from(
            status(
                r#"{
                    "status": "requires_action",
                    "required_action": {
                        "submit_tool_outputs": {
                            "tool_calls": [{
                                "id": "call-1",
                                "function": {
                                    "name": "track_delivery",
                                    "arguments": "{\"order_id\": \"ORD-001\"}"
                                }
                            }]
                        }
                    }
                }"#,
            ),
            &run,
        );

        let RunState::NeedsToolResults(invocations) = state else {
            panic!("expected a tool request");
        };
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].name, "track_delivery");
        assert_eq!(invocations[0].arguments["order_id"], "ORD-001");
    }
}
