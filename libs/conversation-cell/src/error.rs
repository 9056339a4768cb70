use thiserror::Error;

use appointment_cell::models::AppointmentError;

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Conversation store error: {0}")]
    StoreError(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Booking(#[from] AppointmentError),
}
