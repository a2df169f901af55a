pub mod config;
pub mod domain;
pub mod errors;

pub use domain::agent::AgentKind;
pub use domain::conversation::{Message, MessageRole, NewMessage, SessionId};
pub use domain::intent::{Classification, Intent};
pub use domain::order::{
    Order, OrderId, OrderItem, OrderStatus, ReturnReceipt, ReturnRefused, TrackingInfo,
};
pub use domain::product::{Product, ProductCategory, ProductId};
pub use errors::{BackendError, OrchestratorError};
