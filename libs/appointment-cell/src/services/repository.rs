// libs/appointment-cell/src/services/repository.rs
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shared_database::rusqlite::{self, params, Connection, OptionalExtension, Row};
use shared_database::parse_text_column;
use shared_models::TimeOfDay;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, EmergencyCase, EmergencyCaseStatus,
    EmergencyPriority,
};

/// Time value an appointment holds while a swap is in flight. It is outside
/// the valid range, so it can never collide with a real slot and is never
/// visible outside the swap's transaction.
pub const SWAP_PLACEHOLDER_MINUTES: i64 = -1;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, patient_name, patient_phone, appointment_date,
    appointment_time, appointment_type, duration_minutes, status, is_emergency,
    emergency_case_id, notes, created_at, updated_at";

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ==============================================================================
// APPOINTMENT QUERIES
// ==============================================================================

/// Appointments on `date` that still hold their slot, earliest first.
pub fn list_active_on(conn: &Connection, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE appointment_date = ?1 AND status <> 'cancelled'
         ORDER BY appointment_time, created_at",
        APPOINTMENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![format_date(date)], row_to_appointment)?;

    let appointments = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(appointments)
}

/// Number of appointments on `date` counting toward the daily limit.
pub fn count_active_on(
    conn: &Connection,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<u32, AppointmentError> {
    let exclude = exclude.map(|id| id.to_string()).unwrap_or_default();
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE appointment_date = ?1 AND status <> 'cancelled' AND id <> ?2",
        params![format_date(date), exclude],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn find_appointment(conn: &Connection, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
    let sql = format!("SELECT {} FROM appointments WHERE id = ?1", APPOINTMENT_COLUMNS);
    let appointment = conn
        .query_row(&sql, params![appointment_id.to_string()], row_to_appointment)
        .optional()?;
    Ok(appointment)
}

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), AppointmentError> {
    conn.execute(
        "INSERT INTO appointments (
             id, patient_id, patient_name, patient_phone, appointment_date, appointment_time,
             appointment_type, duration_minutes, status, is_emergency, emergency_case_id, notes,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            appointment.id.to_string(),
            appointment.patient_id.to_string(),
            appointment.patient_name,
            appointment.patient_phone,
            format_date(appointment.appointment_date),
            appointment.appointment_time.minutes(),
            appointment.appointment_type,
            appointment.duration_minutes,
            appointment.status.as_str(),
            appointment.is_emergency,
            appointment.emergency_case_id.map(|id| id.to_string()),
            appointment.notes,
            appointment.created_at.to_rfc3339(),
            appointment.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Moves an appointment to `(date, time)`. The slot index rejects the move
/// when another live appointment already holds that slot.
pub fn move_appointment(
    conn: &Connection,
    appointment_id: Uuid,
    date: NaiveDate,
    time: TimeOfDay,
) -> Result<(), AppointmentError> {
    set_slot(conn, appointment_id, &format_date(date), time.minutes() as i64)
}

/// Parks an appointment on the swap placeholder, freeing its slot.
pub fn park_on_placeholder(conn: &Connection, appointment_id: Uuid) -> Result<(), AppointmentError> {
    let date: String = conn.query_row(
        "SELECT appointment_date FROM appointments WHERE id = ?1",
        params![appointment_id.to_string()],
        |row| row.get(0),
    )?;
    set_slot(conn, appointment_id, &date, SWAP_PLACEHOLDER_MINUTES)
}

fn set_slot(conn: &Connection, appointment_id: Uuid, date: &str, minutes: i64) -> Result<(), AppointmentError> {
    let updated = conn.execute(
        "UPDATE appointments
         SET appointment_date = ?1, appointment_time = ?2, updated_at = ?3
         WHERE id = ?4",
        params![date, minutes, Utc::now().to_rfc3339(), appointment_id.to_string()],
    )?;

    if updated == 0 {
        return Err(AppointmentError::NotFound);
    }
    Ok(())
}

/// Records a status change made by the downstream visit workflow
/// (check-in, completion, cancellation, transfer).
pub fn update_status(
    conn: &Connection,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> Result<(), AppointmentError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), Utc::now().to_rfc3339(), appointment_id.to_string()],
    )?;

    if updated == 0 {
        return Err(AppointmentError::NotFound);
    }
    Ok(())
}

pub fn link_emergency_case(conn: &Connection, appointment_id: Uuid, case_id: Uuid) -> Result<(), AppointmentError> {
    conn.execute(
        "UPDATE appointments SET emergency_case_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![case_id.to_string(), Utc::now().to_rfc3339(), appointment_id.to_string()],
    )?;
    Ok(())
}

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let id: String = row.get(0)?;
    let patient_id: String = row.get(1)?;
    let appointment_date: String = row.get(4)?;
    let minutes: i64 = row.get(5)?;
    let status: String = row.get(8)?;
    let emergency_case_id: Option<String> = row.get(10)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    let appointment_time = u16::try_from(minutes)
        .ok()
        .and_then(TimeOfDay::from_minutes)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, minutes))?;

    Ok(Appointment {
        id: parse_text_column(0, &id, Uuid::parse_str)?,
        patient_id: parse_text_column(1, &patient_id, Uuid::parse_str)?,
        patient_name: row.get(2)?,
        patient_phone: row.get(3)?,
        appointment_date: parse_text_column(4, &appointment_date, |v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
        })?,
        appointment_time,
        appointment_type: row.get(6)?,
        duration_minutes: row.get(7)?,
        status: parse_text_column(8, &status, |v| {
            AppointmentStatus::parse(v).ok_or_else(|| UnknownValue(v.to_string()))
        })?,
        is_emergency: row.get(9)?,
        emergency_case_id: emergency_case_id
            .map(|v| parse_text_column(10, &v, Uuid::parse_str))
            .transpose()?,
        notes: row.get(11)?,
        created_at: parse_text_column(12, &created_at, parse_timestamp)?,
        updated_at: parse_text_column(13, &updated_at, parse_timestamp)?,
    })
}

// ==============================================================================
// EMERGENCY CASES
// ==============================================================================

pub fn insert_emergency_case(conn: &Connection, case: &EmergencyCase) -> Result<(), AppointmentError> {
    conn.execute(
        "INSERT INTO emergency_cases (
             id, patient_id, appointment_id, priority, status, chief_complaint, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            case.id.to_string(),
            case.patient_id.to_string(),
            case.appointment_id.to_string(),
            case.priority.as_str(),
            case.status.as_str(),
            case.chief_complaint,
            case.notes,
            case.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_emergency_case(conn: &Connection, case_id: Uuid) -> Result<Option<EmergencyCase>, AppointmentError> {
    let case = conn
        .query_row(
            "SELECT id, patient_id, appointment_id, priority, status, chief_complaint, notes, created_at
             FROM emergency_cases WHERE id = ?1",
            params![case_id.to_string()],
            |row| {
                let id: String = row.get(0)?;
                let patient_id: String = row.get(1)?;
                let appointment_id: String = row.get(2)?;
                let priority: String = row.get(3)?;
                let status: String = row.get(4)?;
                let created_at: String = row.get(7)?;

                Ok(EmergencyCase {
                    id: parse_text_column(0, &id, Uuid::parse_str)?,
                    patient_id: parse_text_column(1, &patient_id, Uuid::parse_str)?,
                    appointment_id: parse_text_column(2, &appointment_id, Uuid::parse_str)?,
                    priority: parse_text_column(3, &priority, |v| {
                        EmergencyPriority::parse(v).ok_or_else(|| UnknownValue(v.to_string()))
                    })?,
                    status: parse_text_column(4, &status, |v| {
                        EmergencyCaseStatus::parse(v).ok_or_else(|| UnknownValue(v.to_string()))
                    })?,
                    chief_complaint: row.get(5)?,
                    notes: row.get(6)?,
                    created_at: parse_text_column(7, &created_at, parse_timestamp)?,
                })
            },
        )
        .optional()?;
    Ok(case)
}

// ==============================================================================
// DECODING HELPERS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
#[error("unknown stored value '{0}'")]
struct UnknownValue(String);

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}
