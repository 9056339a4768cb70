use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers::*;

pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/next-identifier", get(next_identifier))
        .route("/{patient_id}", get(get_patient))
        .with_state(state)
}
