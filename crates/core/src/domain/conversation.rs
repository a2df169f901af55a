use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

/// A single turn in a persisted conversation. Immutable once appended;
/// history order is append order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Set only on assistant messages, naming the agent that produced the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
    pub created_at: DateTime<Utc>,
}

/// A message about to be appended; the store assigns the timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub agent: Option<AgentKind>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into(), agent: None }
    }

    pub fn assistant(content: impl Into<String>, agent: AgentKind) -> Self {
        Self { role: MessageRole::Assistant, content: content.into(), agent: Some(agent) }
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageRole, NewMessage};
    use crate::domain::agent::AgentKind;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(MessageRole::parse(MessageRole::User.as_str()), MessageRole::User);
        assert_eq!(MessageRole::parse(MessageRole::Assistant.as_str()), MessageRole::Assistant);
    }

    #[test]
    fn user_messages_carry_no_agent_tag() {
        let message = NewMessage::user("hello");
        assert_eq!(message.role, MessageRole::User);
        assert!(message.agent.is_none());
    }

    #[test]
    fn assistant_messages_are_agent_tagged() {
        let message = NewMessage::assistant("hi there", AgentKind::Order);
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.agent, Some(AgentKind::Order));
    }
}
