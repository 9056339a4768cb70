use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::error::ConversationError;
use crate::models::BookingIntent;
use crate::services::{ChatBookingAdapter, ConversationStore};

#[derive(Clone)]
pub struct ChatState {
    pub app: AppState,
    pub store: Arc<dyn ConversationStore>,
}

impl From<ConversationError> for AppError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::Booking(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn handle_intent(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
    Json(intent): Json<BookingIntent>,
) -> Result<Json<Value>, AppError> {
    let adapter = ChatBookingAdapter::new(&state.app, Arc::clone(&state.store));

    let reply = adapter.handle_intent(&conversation_id, intent).await?;

    Ok(Json(json!(reply)))
}

#[axum::debug_handler]
pub async fn reset_conversation(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let adapter = ChatBookingAdapter::new(&state.app, Arc::clone(&state.store));

    adapter.reset(&conversation_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
