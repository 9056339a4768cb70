// libs/appointment-cell/src/router.rs
use axum::{
    routing::{get, patch, post},
    Router,
};

use shared_utils::AppState;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    Router::new()
        // Availability and slot layout
        .route("/availability", get(handlers::get_availability))
        .route("/slots", get(handlers::get_generated_slots))
        .route("/settings", get(handlers::get_settings).put(handlers::save_settings))
        // Booking and slot moves
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/swap", post(handlers::swap_appointments))
        .route("/emergency", post(handlers::register_emergency))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .with_state(state)
}
