// libs/appointment-cell/src/services/settings.rs
use chrono::Utc;
use tracing::{debug, info};

use shared_database::rusqlite::{params, Connection, OptionalExtension};
use shared_database::{Database, DatabaseError};
use shared_models::TimeOfDay;

use crate::models::{AppointmentError, AppointmentSettings, DurationOption};

/// Read/write access to the clinic's single settings row.
#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn current(&self) -> Result<Option<AppointmentSettings>, AppointmentError> {
        self.db.read(load_settings).await
    }

    /// Settings that scheduling can run against; absent settings are a
    /// configuration failure, not an empty result.
    pub async fn require(&self) -> Result<AppointmentSettings, AppointmentError> {
        self.current().await?.ok_or_else(|| {
            AppointmentError::ConfigError("appointment settings have not been saved".to_string())
        })
    }

    pub async fn save(&self, settings: AppointmentSettings) -> Result<AppointmentSettings, AppointmentError> {
        settings.validate()?;
        info!(
            "Saving appointment settings: {} - {}, default duration {} minutes",
            settings.working_hours_start, settings.working_hours_end, settings.default_duration
        );

        self.db
            .transaction(move |tx| {
                store_settings(tx, &settings)?;
                Ok(settings)
            })
            .await
    }
}

pub fn load_settings(conn: &Connection) -> Result<Option<AppointmentSettings>, AppointmentError> {
    let row = conn
        .query_row(
            "SELECT working_hours_start, working_hours_end, break_start, break_end, durations,
                    default_duration, appointment_types, max_appointments_per_day, allow_overlap,
                    buffer_minutes, advance_booking_days, auto_generate_slots
             FROM appointment_settings WHERE id = 1",
            [],
            |row| {
                Ok(RawSettings {
                    working_hours_start: row.get(0)?,
                    working_hours_end: row.get(1)?,
                    break_start: row.get(2)?,
                    break_end: row.get(3)?,
                    durations: row.get(4)?,
                    default_duration: row.get(5)?,
                    appointment_types: row.get(6)?,
                    max_appointments_per_day: row.get(7)?,
                    allow_overlap: row.get(8)?,
                    buffer_minutes: row.get(9)?,
                    advance_booking_days: row.get(10)?,
                    auto_generate_slots: row.get(11)?,
                })
            },
        )
        .optional()?;

    match row {
        Some(raw) => {
            debug!("Loaded appointment settings");
            raw.decode().map(Some)
        }
        None => Ok(None),
    }
}

pub fn store_settings(conn: &Connection, settings: &AppointmentSettings) -> Result<(), AppointmentError> {
    let durations = serde_json::to_string(&settings.durations)
        .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;
    let appointment_types = serde_json::to_string(&settings.appointment_types)
        .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

    conn.execute(
        "INSERT INTO appointment_settings (
             id, working_hours_start, working_hours_end, break_start, break_end, durations,
             default_duration, appointment_types, max_appointments_per_day, allow_overlap,
             buffer_minutes, advance_booking_days, auto_generate_slots, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
             working_hours_start = excluded.working_hours_start,
             working_hours_end = excluded.working_hours_end,
             break_start = excluded.break_start,
             break_end = excluded.break_end,
             durations = excluded.durations,
             default_duration = excluded.default_duration,
             appointment_types = excluded.appointment_types,
             max_appointments_per_day = excluded.max_appointments_per_day,
             allow_overlap = excluded.allow_overlap,
             buffer_minutes = excluded.buffer_minutes,
             advance_booking_days = excluded.advance_booking_days,
             auto_generate_slots = excluded.auto_generate_slots,
             updated_at = excluded.updated_at",
        params![
            settings.working_hours_start.minutes(),
            settings.working_hours_end.minutes(),
            settings.break_start.map(TimeOfDay::minutes),
            settings.break_end.map(TimeOfDay::minutes),
            durations,
            settings.default_duration,
            appointment_types,
            settings.max_appointments_per_day,
            settings.allow_overlap,
            settings.buffer_minutes,
            settings.advance_booking_days,
            settings.auto_generate_slots,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(())
}

struct RawSettings {
    working_hours_start: u16,
    working_hours_end: u16,
    break_start: Option<u16>,
    break_end: Option<u16>,
    durations: String,
    default_duration: u32,
    appointment_types: String,
    max_appointments_per_day: u32,
    allow_overlap: bool,
    buffer_minutes: u32,
    advance_booking_days: u32,
    auto_generate_slots: bool,
}

impl RawSettings {
    fn decode(self) -> Result<AppointmentSettings, AppointmentError> {
        let durations: Vec<DurationOption> = serde_json::from_str(&self.durations)
            .map_err(|e| DatabaseError::Decode(format!("durations: {}", e)))?;
        let appointment_types: Vec<String> = serde_json::from_str(&self.appointment_types)
            .map_err(|e| DatabaseError::Decode(format!("appointment_types: {}", e)))?;

        Ok(AppointmentSettings {
            working_hours_start: decode_time("working_hours_start", self.working_hours_start)?,
            working_hours_end: decode_time("working_hours_end", self.working_hours_end)?,
            break_start: self.break_start.map(|m| decode_time("break_start", m)).transpose()?,
            break_end: self.break_end.map(|m| decode_time("break_end", m)).transpose()?,
            durations,
            default_duration: self.default_duration,
            appointment_types,
            max_appointments_per_day: self.max_appointments_per_day,
            allow_overlap: self.allow_overlap,
            buffer_minutes: self.buffer_minutes,
            advance_booking_days: self.advance_booking_days,
            auto_generate_slots: self.auto_generate_slots,
        })
    }
}

fn decode_time(column: &str, minutes: u16) -> Result<TimeOfDay, AppointmentError> {
    TimeOfDay::from_minutes(minutes)
        .ok_or_else(|| DatabaseError::Decode(format!("{}: {} minutes is out of range", column, minutes)).into())
}
