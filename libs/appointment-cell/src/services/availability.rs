// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use shared_database::Database;
use shared_models::TimeOfDay;
use shared_utils::{AppState, Clock};

use crate::models::{
    Appointment, AppointmentError, AppointmentSettings, AvailabilityResponse, TimeSlotLabel,
};
use crate::services::repository;
use crate::services::settings::SettingsStore;
use crate::services::slots::{in_break, slots_for_settings};

pub struct AvailabilityService {
    db: Database,
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            settings: SettingsStore::new(state.db.clone()),
            clock: Arc::clone(&state.clock),
        }
    }

    /// Bookable slots on `date` for `duration` (or the active duration).
    pub async fn get_availability(
        &self,
        date: NaiveDate,
        duration: Option<u32>,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let settings = self.settings.require().await?;
        let duration_minutes = resolve_duration(&settings, duration)?;

        let booked = self
            .db
            .read(move |conn| repository::list_active_on(conn, date))
            .await?;

        let slots = compute_availability(&settings, date, duration_minutes, &booked, self.clock.now());
        debug!("{} slots available on {} for {} minutes", slots.len(), date, duration_minutes);

        Ok(AvailabilityResponse {
            date,
            duration_minutes,
            slots,
        })
    }

    /// The full generated day, ignoring bookings and the clock.
    pub async fn generated_slots(&self, duration: Option<u32>) -> Result<Vec<TimeSlotLabel>, AppointmentError> {
        let settings = self.settings.require().await?;
        let duration_minutes = resolve_duration(&settings, duration)?;
        Ok(slots_for_settings(&settings, duration_minutes))
    }
}

/// Slots on `date` a new booking of `duration_minutes` could take.
///
/// Past dates and dates beyond the booking horizon have none. A slot is
/// dropped when it lies outside working hours or inside the break, when a
/// live regular appointment already starts there (unless overlap is
/// allowed), or, for today, when it has already ended. Emergency
/// appointments never claim a slot.
pub fn compute_availability(
    settings: &AppointmentSettings,
    date: NaiveDate,
    duration_minutes: u32,
    booked: &[Appointment],
    now: NaiveDateTime,
) -> Vec<TimeSlotLabel> {
    let today = now.date();
    if date < today || date > horizon_end(settings, today) {
        return Vec::new();
    }

    let taken: HashSet<TimeOfDay> = if settings.allow_overlap {
        HashSet::new()
    } else {
        booked
            .iter()
            .filter(|a| a.appointment_date == date && a.holds_slot() && !a.is_emergency)
            .map(|a| a.appointment_time)
            .collect()
    };

    slots_for_settings(settings, duration_minutes)
        .into_iter()
        .filter(|slot| slot.is_active)
        .filter(|slot| {
            slot.time >= settings.working_hours_start
                && slot.time < settings.working_hours_end
                && !in_break(slot.time, settings.break_window())
        })
        .filter(|slot| !taken.contains(&slot.time))
        .filter(|slot| date != today || slot_end(date, slot.time, duration_minutes) > now)
        .collect()
}

pub fn slot_end(date: NaiveDate, time: TimeOfDay, duration_minutes: u32) -> NaiveDateTime {
    let start = date.and_time(time.to_naive_time());
    start
        .checked_add_signed(Duration::minutes(duration_minutes as i64))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Last bookable date. Saturates at the calendar's end for settings that
/// were stored without validation.
fn horizon_end(settings: &AppointmentSettings, today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(settings.advance_booking_days as u64))
        .unwrap_or(NaiveDate::MAX)
}

// ==============================================================================
// SHARED BOOKING RULES
// ==============================================================================

/// A requested duration must be an active catalogue entry; no request
/// falls back to the active duration.
pub fn resolve_duration(settings: &AppointmentSettings, requested: Option<u32>) -> Result<u32, AppointmentError> {
    match requested {
        Some(0) => Err(AppointmentError::ValidationError(
            "Duration must be positive".to_string(),
        )),
        Some(minutes) if settings.is_active_duration(minutes) => Ok(minutes),
        Some(minutes) => Err(AppointmentError::ValidationError(format!(
            "A {}-minute appointment is not offered",
            minutes
        ))),
        None => settings.active_duration().ok_or_else(|| {
            AppointmentError::ConfigError("no active appointment duration is configured".to_string())
        }),
    }
}

pub fn resolve_appointment_type(
    settings: &AppointmentSettings,
    requested: Option<&str>,
) -> Result<String, AppointmentError> {
    match requested.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(settings.default_appointment_type()),
        Some(requested) => settings
            .appointment_types
            .iter()
            .find(|t| t.eq_ignore_ascii_case(requested))
            .cloned()
            .ok_or_else(|| {
                AppointmentError::ValidationError(format!("Unknown appointment type '{}'", requested))
            }),
    }
}

/// Parses a requested start time, which must be present.
pub fn parse_requested_time(raw: Option<&str>) -> Result<TimeOfDay, AppointmentError> {
    let raw = raw
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppointmentError::ValidationError("Appointment time is required".to_string()))?;

    TimeOfDay::parse(raw).map_err(|e| AppointmentError::ValidationError(e.to_string()))
}

/// The time must be one of the generated labels for this duration.
pub fn ensure_generated_slot(
    settings: &AppointmentSettings,
    duration_minutes: u32,
    time: TimeOfDay,
) -> Result<(), AppointmentError> {
    let offered = slots_for_settings(settings, duration_minutes)
        .iter()
        .any(|slot| slot.is_active && slot.time == time);

    if !offered {
        return Err(AppointmentError::ValidationError(format!(
            "{} is not a bookable {}-minute slot",
            time, duration_minutes
        )));
    }
    Ok(())
}

/// Rejects past dates, dates beyond the horizon and, for today, slots that
/// have already ended.
pub fn ensure_within_horizon(
    settings: &AppointmentSettings,
    date: NaiveDate,
    time: TimeOfDay,
    duration_minutes: u32,
    now: NaiveDateTime,
) -> Result<(), AppointmentError> {
    let today = now.date();

    if date < today {
        return Err(AppointmentError::ValidationError(
            "Cannot schedule appointments in the past".to_string(),
        ));
    }
    if date > horizon_end(settings, today) {
        return Err(AppointmentError::ValidationError(format!(
            "Appointments can be booked at most {} days in advance",
            settings.advance_booking_days
        )));
    }
    if slot_end(date, time, duration_minutes) <= now {
        return Err(AppointmentError::ValidationError(format!(
            "The {} slot on {} has already ended",
            time, date
        )));
    }
    Ok(())
}

pub fn ensure_capacity(
    settings: &AppointmentSettings,
    date: NaiveDate,
    active_count: u32,
) -> Result<(), AppointmentError> {
    if active_count >= settings.max_appointments_per_day {
        return Err(AppointmentError::CapacityReached {
            date,
            max: settings.max_appointments_per_day,
        });
    }
    Ok(())
}
