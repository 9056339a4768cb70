pub mod error;
pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use error::ConversationError;
pub use models::*;
pub use router::*;
