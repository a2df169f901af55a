pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::SeedSummary;
pub use repositories::{
    ConversationStore, InMemoryConversationStore, InMemoryOrderStore, InMemoryProductCatalog,
    OrderStore, ProductCatalog, RepositoryError, SqlConversationStore, SqlOrderStore,
    SqlProductCatalog,
};
