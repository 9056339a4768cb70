use std::sync::Arc;

use axum::{
    routing::{delete, post},
    Router,
};

use shared_utils::AppState;

use crate::handlers::{self, ChatState};
use crate::services::ConversationStore;

pub fn chat_routes(app: AppState, store: Arc<dyn ConversationStore>) -> Router {
    Router::new()
        .route("/{conversation_id}/intent", post(handlers::handle_intent))
        .route("/{conversation_id}", delete(handlers::reset_conversation))
        .with_state(ChatState { app, store })
}
