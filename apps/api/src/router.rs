use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use conversation_cell::router::chat_routes;
use conversation_cell::services::ConversationStore;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState, conversations: Arc<dyn ConversationStore>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/chat", chat_routes(state, conversations))
}
