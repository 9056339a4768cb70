use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::PatientError;
use crate::services::PatientService;

#[derive(Debug, Deserialize)]
pub struct NextIdentifierQuery {
    pub prefix: Option<String>,
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Identifier(e) => AppError::ValidationError(e.to_string()),
            PatientError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let patient = service.get_patient(patient_id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn next_identifier(
    State(state): State<AppState>,
    Query(query): Query<NextIdentifierQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let visible_id = service.preview_next_identifier(query.prefix.as_deref()).await?;

    Ok(Json(json!({
        "visible_id": visible_id,
        "reserved": false
    })))
}
