// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentError, AppointmentSettings, BookAppointmentRequest, RegisterEmergencyRequest,
    RescheduleAppointmentRequest, SwapAppointmentsRequest,
};
use crate::services::{
    AppointmentBookingService, AvailabilityService, EmergencyAllocator, RescheduleService,
    SettingsStore, SwapService,
};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            e @ AppointmentError::CapacityReached { .. } => AppError::Capacity(e.to_string()),
            AppointmentError::ConflictDetected(msg) => AppError::Conflict(msg),
            e @ AppointmentError::InvalidStatusTransition(_) => AppError::State(e.to_string()),
            AppointmentError::ConfigError(msg) => AppError::Config(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let availability = service.get_availability(query.date, query.duration).await?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn get_generated_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let slots = service.generated_slots(query.duration).await?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let store = SettingsStore::new(state.db.clone());

    let settings = store.require().await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn save_settings(
    State(state): State<AppState>,
    Json(settings): Json<AppointmentSettings>,
) -> Result<Json<Value>, AppError> {
    let store = SettingsStore::new(state.db.clone());

    let saved = store.save(settings).await?;

    Ok(Json(json!(saved)))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.book_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointments = service.appointments_on(query.date).await?;

    Ok(Json(json!({
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = RescheduleService::new(&state);

    let appointment = service.reschedule_appointment(appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn swap_appointments(
    State(state): State<AppState>,
    Json(request): Json<SwapAppointmentsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SwapService::new(&state);

    let result = service
        .swap_appointments(request.first_appointment_id, request.second_appointment_id)
        .await?;

    Ok(Json(json!(result)))
}

// ==============================================================================
// EMERGENCY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn register_emergency(
    State(state): State<AppState>,
    Json(request): Json<RegisterEmergencyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let allocator = EmergencyAllocator::new(&state);

    let registration = allocator.register_emergency(request).await?;

    Ok((StatusCode::CREATED, Json(json!(registration))))
}
