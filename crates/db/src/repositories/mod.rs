use async_trait::async_trait;
use thiserror::Error;

use concierge_core::domain::conversation::{Message, NewMessage, SessionId};
use concierge_core::domain::order::{Order, OrderId};
use concierge_core::domain::product::{Product, ProductCategory, ProductId};

pub mod conversation;
pub mod memory;
pub mod order;
pub mod product;

pub use conversation::SqlConversationStore;
pub use memory::{InMemoryConversationStore, InMemoryOrderStore, InMemoryProductCatalog};
pub use order::SqlOrderStore;
pub use product::SqlProductCatalog;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persisted conversation sessions. Messages are append-only; history order
/// is append order.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_session(&self, session_id: &SessionId) -> Result<(), RepositoryError>;

    /// Appends a message, creating the session implicitly when missing.
    async fn append_message(
        &self,
        session_id: &SessionId,
        message: NewMessage,
    ) -> Result<Message, RepositoryError>;

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError>;
}

/// Keyword search over the product catalog (the knowledge index).
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn search(
        &self,
        query: &str,
        category: Option<ProductCategory>,
        top: usize,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn all(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
}
