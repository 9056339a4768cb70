use rusqlite::Connection;
use tracing::debug;

use crate::error::DatabaseResult;

/// Idempotent schema for the scheduling store.
///
/// `appointment_time` holds minutes since midnight. The partial unique index
/// is the authority on slot ownership: at most one live, non-emergency
/// appointment per (date, time).
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS appointment_settings (
    id                       INTEGER PRIMARY KEY CHECK (id = 1),
    working_hours_start      INTEGER NOT NULL,
    working_hours_end        INTEGER NOT NULL,
    break_start              INTEGER,
    break_end                INTEGER,
    durations                TEXT    NOT NULL,
    default_duration         INTEGER NOT NULL,
    appointment_types        TEXT    NOT NULL,
    max_appointments_per_day INTEGER NOT NULL,
    allow_overlap            INTEGER NOT NULL DEFAULT 0,
    buffer_minutes           INTEGER NOT NULL DEFAULT 0,
    advance_booking_days     INTEGER NOT NULL,
    auto_generate_slots      INTEGER NOT NULL DEFAULT 1,
    updated_at               TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS patients (
    id          TEXT PRIMARY KEY,
    visible_id  TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    phone       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS identifier_counters (
    prefix      TEXT PRIMARY KEY,
    last_issued TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id                TEXT PRIMARY KEY,
    patient_id        TEXT NOT NULL REFERENCES patients(id),
    patient_name      TEXT NOT NULL,
    patient_phone     TEXT NOT NULL,
    appointment_date  TEXT NOT NULL,
    appointment_time  INTEGER NOT NULL,
    appointment_type  TEXT NOT NULL,
    duration_minutes  INTEGER NOT NULL,
    status            TEXT NOT NULL,
    is_emergency      INTEGER NOT NULL DEFAULT 0,
    emergency_case_id TEXT,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot
    ON appointments (appointment_date, appointment_time)
    WHERE status <> 'cancelled' AND is_emergency = 0;

CREATE INDEX IF NOT EXISTS idx_appointments_date
    ON appointments (appointment_date);

CREATE TABLE IF NOT EXISTS emergency_cases (
    id              TEXT PRIMARY KEY,
    patient_id      TEXT NOT NULL REFERENCES patients(id),
    appointment_id  TEXT NOT NULL REFERENCES appointments(id),
    priority        TEXT NOT NULL,
    status          TEXT NOT NULL,
    chief_complaint TEXT,
    notes           TEXT,
    created_at      TEXT NOT NULL
);
"#;

pub fn migrate(conn: &Connection) -> DatabaseResult<()> {
    debug!("Applying scheduling schema");
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
