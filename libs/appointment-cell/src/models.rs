// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use patient_cell::models::{Patient, PatientDraft, PatientError};
use shared_database::{rusqlite, DatabaseError};
use shared_models::TimeOfDay;

// ==============================================================================
// SETTINGS MODELS
// ==============================================================================

pub const MAX_ADVANCE_BOOKING_DAYS: u32 = 3650;
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DurationOption {
    pub minutes: u32,
    pub is_active: bool,
}

/// Clinic-wide scheduling configuration. One row, edited by staff; the
/// scheduling services only ever read it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentSettings {
    pub working_hours_start: TimeOfDay,
    pub working_hours_end: TimeOfDay,
    pub break_start: Option<TimeOfDay>,
    pub break_end: Option<TimeOfDay>,
    pub durations: Vec<DurationOption>,
    pub default_duration: u32,
    pub appointment_types: Vec<String>,
    pub max_appointments_per_day: u32,
    pub allow_overlap: bool,
    pub buffer_minutes: u32,
    pub advance_booking_days: u32,
    pub auto_generate_slots: bool,
}

impl AppointmentSettings {
    /// The default duration when it is active, else the first active entry.
    pub fn active_duration(&self) -> Option<u32> {
        if self.is_active_duration(self.default_duration) {
            return Some(self.default_duration);
        }
        self.durations
            .iter()
            .find(|option| option.is_active && option.minutes > 0)
            .map(|option| option.minutes)
    }

    pub fn is_active_duration(&self, minutes: u32) -> bool {
        minutes > 0
            && self
                .durations
                .iter()
                .any(|option| option.is_active && option.minutes == minutes)
    }

    /// Break window, when both ends are configured and ordered.
    pub fn break_window(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    pub fn default_appointment_type(&self) -> String {
        self.appointment_types
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_APPOINTMENT_TYPE.to_string())
    }

    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.working_hours_start >= self.working_hours_end {
            return Err(AppointmentError::ValidationError(
                "Working hours must start before they end".to_string(),
            ));
        }

        match (self.break_start, self.break_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if start >= end {
                    return Err(AppointmentError::ValidationError(
                        "Break must start before it ends".to_string(),
                    ));
                }
                if start < self.working_hours_start || end > self.working_hours_end {
                    return Err(AppointmentError::ValidationError(
                        "Break must lie within working hours".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppointmentError::ValidationError(
                    "Break start and end must be set together".to_string(),
                ));
            }
        }

        if self.default_duration == 0 {
            return Err(AppointmentError::ValidationError(
                "Default duration must be positive".to_string(),
            ));
        }
        if self.default_duration > MAX_DURATION_MINUTES
            || self.durations.iter().any(|option| option.minutes > MAX_DURATION_MINUTES)
        {
            return Err(AppointmentError::ValidationError(format!(
                "Durations cannot exceed {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        if !self.durations.iter().any(|option| option.minutes > 0) {
            return Err(AppointmentError::ValidationError(
                "At least one positive duration is required".to_string(),
            ));
        }
        if self.max_appointments_per_day == 0 {
            return Err(AppointmentError::ValidationError(
                "Daily appointment limit must be positive".to_string(),
            ));
        }
        if self.advance_booking_days > MAX_ADVANCE_BOOKING_DAYS {
            return Err(AppointmentError::ValidationError(format!(
                "Advance booking is limited to {} days",
                MAX_ADVANCE_BOOKING_DAYS
            )));
        }

        Ok(())
    }
}

impl Default for AppointmentSettings {
    fn default() -> Self {
        Self {
            working_hours_start: TimeOfDay::from_hm(8, 0).unwrap_or(TimeOfDay::MIDNIGHT),
            working_hours_end: TimeOfDay::from_hm(18, 0).unwrap_or(TimeOfDay::MIDNIGHT),
            break_start: TimeOfDay::from_hm(12, 0),
            break_end: TimeOfDay::from_hm(13, 0),
            durations: vec![
                DurationOption { minutes: 15, is_active: false },
                DurationOption { minutes: 30, is_active: true },
                DurationOption { minutes: 45, is_active: true },
                DurationOption { minutes: 60, is_active: true },
            ],
            default_duration: 30,
            appointment_types: vec![
                "Consultation".to_string(),
                "Follow-up".to_string(),
                "Check-up".to_string(),
            ],
            max_appointments_per_day: 20,
            allow_overlap: false,
            buffer_minutes: 0,
            advance_booking_days: 30,
            auto_generate_slots: true,
        }
    }
}

pub const DEFAULT_APPOINTMENT_TYPE: &str = "Consultation";
pub const EMERGENCY_APPOINTMENT_TYPE: &str = "Emergency";

/// A generated, bookable point in the day. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlotLabel {
    pub time: TimeOfDay,
    pub label: String,
    pub is_active: bool,
}

impl TimeSlotLabel {
    pub fn new(time: TimeOfDay) -> Self {
        Self {
            time,
            label: time.label(),
            is_active: true,
        }
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: TimeOfDay,
    pub appointment_type: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub is_emergency: bool,
    pub emergency_case_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scheduled_start(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time.to_naive_time())
    }

    pub fn scheduled_end(&self) -> NaiveDateTime {
        self.scheduled_start()
            .checked_add_signed(Duration::minutes(self.duration_minutes as i64))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn holds_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Transferred,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Transferred => "transferred",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "in_progress" => Some(AppointmentStatus::InProgress),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "transferred" => Some(AppointmentStatus::Transferred),
            _ => None,
        }
    }

    /// Only confirmed appointments may move (reschedule or swap).
    pub fn can_reschedule(&self) -> bool {
        matches!(self, AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::InProgress => write!(f, "In Progress"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Transferred => write!(f, "Transferred"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatientRef {
    Existing { patient_id: Uuid },
    New(PatientDraft),
}

/// The one booking request shape. Manual booking and chat-driven booking
/// both translate their input into this before calling the booking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub appointment_type: Option<String>,
    pub duration_minutes: Option<u32>,
    pub patient: PatientRef,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: Option<NaiveDate>,
    pub new_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapAppointmentsRequest {
    pub first_appointment_id: Uuid,
    pub second_appointment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    pub first: Appointment,
    pub second: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub slots: Vec<TimeSlotLabel>,
}

// ==============================================================================
// EMERGENCY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyPriority {
    Low,
    Medium,
    #[default]
    High,
    Critical,
}

impl EmergencyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyPriority::Low => "low",
            EmergencyPriority::Medium => "medium",
            EmergencyPriority::High => "high",
            EmergencyPriority::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(EmergencyPriority::Low),
            "medium" => Some(EmergencyPriority::Medium),
            "high" => Some(EmergencyPriority::High),
            "critical" => Some(EmergencyPriority::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyCaseStatus {
    Waiting,
    InTreatment,
    Resolved,
}

impl EmergencyCaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyCaseStatus::Waiting => "waiting",
            EmergencyCaseStatus::InTreatment => "in_treatment",
            EmergencyCaseStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(EmergencyCaseStatus::Waiting),
            "in_treatment" => Some(EmergencyCaseStatus::InTreatment),
            "resolved" => Some(EmergencyCaseStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyCaseDraft {
    #[serde(default)]
    pub priority: EmergencyPriority,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyCase {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Uuid,
    pub priority: EmergencyPriority,
    pub status: EmergencyCaseStatus,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEmergencyRequest {
    pub patient: PatientDraft,
    #[serde(default)]
    pub case: EmergencyCaseDraft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRegistration {
    pub case: EmergencyCase,
    pub patient: Patient,
    pub appointment: Appointment,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Daily limit of {max} appointments reached for {date}")]
    CapacityReached { date: NaiveDate, max: u32 },

    #[error("Appointment conflicts with existing booking: {0}")]
    ConflictDetected(String),

    #[error("Appointment cannot be moved in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Scheduling is not configured: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// SQLite names the columns of the violated index in its message; only the
/// active-slot index on `appointments` covers `appointment_date`.
const ACTIVE_SLOT_COLUMN: &str = "appointments.appointment_date";

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(msg) if msg.contains(ACTIVE_SLOT_COLUMN) => {
                AppointmentError::ConflictDetected(
                    "the slot was taken by a concurrent booking".to_string(),
                )
            }
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for AppointmentError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            PatientError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            PatientError::Identifier(e) => AppointmentError::ConfigError(e.to_string()),
            PatientError::DatabaseError(e) => e.into(),
        }
    }
}
