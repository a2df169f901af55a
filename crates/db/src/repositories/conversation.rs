use chrono::{DateTime, Utc};
use sqlx::Row;

use concierge_core::domain::agent::AgentKind;
use concierge_core::domain::conversation::{Message, MessageRole, NewMessage, SessionId};

use super::{ConversationStore, RepositoryError};
use crate::DbPool;

pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn ensure_session(&self, session_id: &SessionId, now: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(&session_id.0)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, RepositoryError> {
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let agent: Option<String> =
        row.try_get("agent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Message {
        role: MessageRole::parse(&role),
        content,
        agent: agent.as_deref().and_then(AgentKind::parse),
        created_at,
    })
}

#[async_trait::async_trait]
impl ConversationStore for SqlConversationStore {
    async fn create_session(&self, session_id: &SessionId) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        self.ensure_session(session_id, &now).await?;
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &SessionId,
        message: NewMessage,
    ) -> Result<Message, RepositoryError> {
        let created_at = Utc::now();
        let created_at_str = created_at.to_rfc3339();
        self.ensure_session(session_id, &created_at_str).await?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, agent, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session_id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.agent.map(|agent| agent.as_str()))
        .bind(&created_at_str)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            role: message.role,
            content: message.content,
            agent: message.agent,
            created_at,
        })
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT role, content, agent, created_at FROM messages
             WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::agent::AgentKind;
    use concierge_core::domain::conversation::{MessageRole, NewMessage, SessionId};

    use super::SqlConversationStore;
    use crate::repositories::ConversationStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlConversationStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlConversationStore::new(pool)
    }

    #[tokio::test]
    async fn history_preserves_append_order_and_agent_tags() {
        let store = store().await;
        let session = SessionId("s1".to_string());

        store.append_message(&session, NewMessage::user("where is my order?")).await.expect("append");
        store
            .append_message(&session, NewMessage::assistant("let me check", AgentKind::Order))
            .await
            .expect("append");

        let history = store.history(&session).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert!(history[0].agent.is_none());
        assert_eq!(history[1].agent, Some(AgentKind::Order));
    }

    #[tokio::test]
    async fn appending_creates_the_session_implicitly() {
        let store = store().await;
        let session = SessionId("fresh".to_string());

        store.append_message(&session, NewMessage::user("hello")).await.expect("append");
        let history = store.history(&session).await.expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_history_is_empty() {
        let store = store().await;
        let history = store.history(&SessionId("missing".to_string())).await.expect("history");
        assert!(history.is_empty());
    }
}
