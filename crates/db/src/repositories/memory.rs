use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use concierge_core::domain::conversation::{Message, NewMessage, SessionId};
use concierge_core::domain::order::{Order, OrderId};
use concierge_core::domain::product::{filter_catalog, Product, ProductCategory, ProductId};

use super::{ConversationStore, OrderStore, ProductCatalog, RepositoryError};
use crate::fixtures;

/// Fixture-backed providers for offline/demo operation and tests. Selected
/// once at startup; the orchestration core only ever sees the traits.
#[derive(Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_session(&self, session_id: &SessionId) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.0.clone()).or_default();
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &SessionId,
        message: NewMessage,
    ) -> Result<Message, RepositoryError> {
        let message = Message {
            role: message.role,
            content: message.content,
            agent: message.agent,
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.0.clone()).or_default().push(message.clone());
        Ok(message)
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id.0).cloned().unwrap_or_default())
    }
}

pub struct InMemoryOrderStore {
    orders: Vec<Order>,
}

impl InMemoryOrderStore {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::with_orders(fixtures::demo_orders())
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.iter().find(|order| order.id == *id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders.iter().filter(|order| order.email == email).cloned().collect())
    }
}

pub struct InMemoryProductCatalog {
    products: Vec<Product>,
}

impl InMemoryProductCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self { products }
    }
}

impl Default for InMemoryProductCatalog {
    fn default() -> Self {
        Self::with_products(fixtures::demo_products())
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn search(
        &self,
        query: &str,
        category: Option<ProductCategory>,
        top: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        Ok(filter_catalog(&self.products, query, category, top))
    }

    async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.clone())
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.iter().find(|product| product.id == *id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::conversation::{NewMessage, SessionId};
    use concierge_core::domain::order::{OrderId, OrderStatus};

    use super::{InMemoryConversationStore, InMemoryOrderStore};
    use crate::repositories::{ConversationStore, OrderStore};

    #[tokio::test]
    async fn in_memory_history_preserves_append_order() {
        let store = InMemoryConversationStore::default();
        let session = SessionId("s1".to_string());

        store.append_message(&session, NewMessage::user("first")).await.expect("append");
        store.append_message(&session, NewMessage::user("second")).await.expect("append");

        let history = store.history(&session).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[tokio::test]
    async fn fixture_orders_match_the_demo_dataset() {
        let store = InMemoryOrderStore::default();

        let shipped = store
            .find_by_id(&OrderId("ORD-001".to_string()))
            .await
            .expect("query")
            .expect("demo order");
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let missing = store.find_by_id(&OrderId("ORD-999".to_string())).await.expect("query");
        assert!(missing.is_none());
    }
}
