// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::services::{find_patient, insert_patient};
use shared_database::Database;
use shared_utils::{dispatch_notification, AppState, Clock, NotificationKind, NotificationPort};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, PatientRef,
};
use crate::services::availability::{
    ensure_capacity, ensure_generated_slot, ensure_within_horizon, parse_requested_time,
    resolve_appointment_type, resolve_duration,
};
use crate::services::repository;
use crate::services::settings::SettingsStore;

pub struct AppointmentBookingService {
    db: Database,
    settings: SettingsStore,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
    patient_id_prefix: String,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            settings: SettingsStore::new(state.db.clone()),
            notifier: Arc::clone(&state.notifier),
            clock: Arc::clone(&state.clock),
            patient_id_prefix: state.config.patient_id_prefix.clone(),
        }
    }

    /// Books a regular appointment.
    ///
    /// The capacity and slot checks before the write are advisory and only
    /// produce friendly errors. The write transaction re-counts the day and
    /// the slot index decides any race, so of two concurrent bookings for
    /// one slot exactly one commits.
    pub async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment on {:?} at {:?}",
            request.appointment_date, request.appointment_time
        );

        // **Step 1: Validate the request**
        let date = request.appointment_date.ok_or_else(|| {
            AppointmentError::ValidationError("Appointment date is required".to_string())
        })?;
        let time = parse_requested_time(request.appointment_time.as_deref())?;
        if let PatientRef::New(draft) = &request.patient {
            draft.validate()?;
        }

        let settings = self.settings.require().await?;
        let duration_minutes = resolve_duration(&settings, request.duration_minutes)?;
        let appointment_type = resolve_appointment_type(&settings, request.appointment_type.as_deref())?;
        ensure_generated_slot(&settings, duration_minutes, time)?;

        // **Step 2: Booking window**
        ensure_within_horizon(&settings, date, time, duration_minutes, self.clock.now())?;

        // **Step 3: Advisory capacity and slot checks**
        let booked = self
            .db
            .read(move |conn| repository::list_active_on(conn, date))
            .await?;
        ensure_capacity(&settings, date, booked.len() as u32)?;

        if let Some(holder) = booked
            .iter()
            .find(|a| a.appointment_time == time && !a.is_emergency)
        {
            debug!("Slot {} on {} already held by {}", time, date, holder.id);
            return Err(AppointmentError::ConflictDetected(format!(
                "{} on {} is already booked",
                time, date
            )));
        }

        // **Step 4: Persist patient and appointment atomically**
        let prefix = self.patient_id_prefix.clone();
        let notes = request.notes.clone();
        let patient_ref = request.patient;

        let appointment = self
            .db
            .transaction(move |tx| {
                let active = repository::count_active_on(tx, date, None)?;
                ensure_capacity(&settings, date, active)?;

                let patient = match patient_ref {
                    PatientRef::Existing { patient_id } => {
                        find_patient(tx, patient_id)?.ok_or(AppointmentError::PatientNotFound)?
                    }
                    PatientRef::New(draft) => insert_patient(tx, &draft, &prefix)?,
                };

                let now = Utc::now();
                let appointment = Appointment {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    patient_name: patient.name,
                    patient_phone: patient.phone,
                    appointment_date: date,
                    appointment_time: time,
                    appointment_type,
                    duration_minutes,
                    status: AppointmentStatus::Confirmed,
                    is_emergency: false,
                    emergency_case_id: None,
                    notes,
                    created_at: now,
                    updated_at: now,
                };

                repository::insert_appointment(tx, &appointment)?;
                Ok::<_, AppointmentError>(appointment)
            })
            .await
            .map_err(|e| {
                if let AppointmentError::ConflictDetected(_) = &e {
                    warn!("Lost race for {} on {}", time, date);
                }
                e
            })?;

        info!(
            "Appointment {} booked for {} on {} at {}",
            appointment.id, appointment.patient_name, date, time
        );

        // **Step 5: Notify after commit**
        dispatch_notification(
            Arc::clone(&self.notifier),
            NotificationKind::BookingConfirmed,
            json!({
                "appointment_id": appointment.id,
                "patient_name": appointment.patient_name,
                "patient_phone": appointment.patient_phone,
                "appointment_date": appointment.appointment_date,
                "appointment_time": appointment.appointment_time,
                "appointment_type": appointment.appointment_type,
            }),
        );

        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        self.db
            .read(move |conn| repository::find_appointment(conn, appointment_id))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        self.db
            .read(move |conn| repository::list_active_on(conn, date))
            .await
    }
}
