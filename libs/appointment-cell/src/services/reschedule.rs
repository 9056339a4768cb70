// libs/appointment-cell/src/services/reschedule.rs
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Database;
use shared_utils::{dispatch_notification, AppState, Clock, NotificationKind, NotificationPort};

use crate::models::{Appointment, AppointmentError, RescheduleAppointmentRequest};
use crate::services::availability::{
    ensure_capacity, ensure_generated_slot, ensure_within_horizon, parse_requested_time,
};
use crate::services::repository;
use crate::services::settings::SettingsStore;

pub struct RescheduleService {
    db: Database,
    settings: SettingsStore,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
}

impl RescheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            settings: SettingsStore::new(state.db.clone()),
            notifier: Arc::clone(&state.notifier),
            clock: Arc::clone(&state.clock),
        }
    }

    /// Moves a confirmed appointment to a new date and time, keeping its
    /// duration and type.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!("Rescheduling appointment {}", appointment_id);

        let new_date = request.new_date.ok_or_else(|| {
            AppointmentError::ValidationError("New appointment date is required".to_string())
        })?;
        let new_time = parse_requested_time(request.new_time.as_deref())?;

        let current = self
            .db
            .read(move |conn| repository::find_appointment(conn, appointment_id))
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if !current.status.can_reschedule() {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let settings = self.settings.require().await?;
        ensure_generated_slot(&settings, current.duration_minutes, new_time)?;
        ensure_within_horizon(&settings, new_date, new_time, current.duration_minutes, self.clock.now())?;

        let booked = self
            .db
            .read(move |conn| repository::list_active_on(conn, new_date))
            .await?;

        if new_date != current.appointment_date {
            ensure_capacity(&settings, new_date, booked.len() as u32)?;
        }

        if let Some(holder) = booked.iter().find(|a| {
            a.id != appointment_id && a.appointment_time == new_time && !a.is_emergency
        }) {
            debug!("Slot {} on {} already held by {}", new_time, new_date, holder.id);
            return Err(AppointmentError::ConflictDetected(format!(
                "{} on {} is already booked",
                new_time, new_date
            )));
        }

        let previous_date = current.appointment_date;
        let previous_time = current.appointment_time;

        let updated = self
            .db
            .transaction(move |tx| {
                let appointment = repository::find_appointment(tx, appointment_id)?
                    .ok_or(AppointmentError::NotFound)?;
                if !appointment.status.can_reschedule() {
                    return Err(AppointmentError::InvalidStatusTransition(appointment.status));
                }

                if appointment.appointment_date != new_date {
                    let active = repository::count_active_on(tx, new_date, Some(appointment_id))?;
                    ensure_capacity(&settings, new_date, active)?;
                }

                repository::move_appointment(tx, appointment_id, new_date, new_time)?;
                repository::find_appointment(tx, appointment_id)?.ok_or(AppointmentError::NotFound)
            })
            .await?;

        info!(
            "Appointment {} moved from {} {} to {} {}",
            appointment_id, previous_date, previous_time, new_date, new_time
        );

        dispatch_notification(
            Arc::clone(&self.notifier),
            NotificationKind::AppointmentRescheduled,
            json!({
                "appointment_id": updated.id,
                "patient_name": updated.patient_name,
                "patient_phone": updated.patient_phone,
                "previous_date": previous_date,
                "previous_time": previous_time,
                "appointment_date": updated.appointment_date,
                "appointment_time": updated.appointment_time,
            }),
        );

        Ok(updated)
    }
}
