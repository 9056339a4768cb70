// libs/appointment-cell/src/services/emergency.rs
use std::sync::Arc;

use chrono::{NaiveTime, Timelike, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use patient_cell::services::insert_patient;
use shared_database::Database;
use shared_models::TimeOfDay;
use shared_utils::{dispatch_notification, AppState, Clock, NotificationKind, NotificationPort};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, EmergencyCase, EmergencyCaseStatus,
    EmergencyRegistration, RegisterEmergencyRequest, TimeSlotLabel, EMERGENCY_APPOINTMENT_TYPE,
};
use crate::services::repository;
use crate::services::settings::load_settings;
use crate::services::slots::slots_for_settings;

pub struct EmergencyAllocator {
    db: Database,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
    patient_id_prefix: String,
}

impl EmergencyAllocator {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            notifier: Arc::clone(&state.notifier),
            clock: Arc::clone(&state.clock),
            patient_id_prefix: state.config.patient_id_prefix.clone(),
        }
    }

    /// Registers a walk-in: creates the patient, an emergency appointment in
    /// today's current or next slot, and the emergency case, all in one
    /// transaction. Emergency appointments do not claim their slot, so they
    /// may share it with a regular booking.
    pub async fn register_emergency(
        &self,
        request: RegisterEmergencyRequest,
    ) -> Result<EmergencyRegistration, AppointmentError> {
        info!("Registering emergency walk-in for {}", request.patient.name.trim());
        request.patient.validate()?;

        let now = self.clock.now();
        let today = now.date();
        let prefix = self.patient_id_prefix.clone();

        let registration = self
            .db
            .transaction(move |tx| {
                let patient = insert_patient(tx, &request.patient, &prefix)?;

                let settings = load_settings(tx)?.ok_or_else(|| {
                    AppointmentError::ConfigError("appointment settings have not been saved".to_string())
                })?;
                let duration_minutes = settings.active_duration().ok_or_else(|| {
                    AppointmentError::ConfigError("no active appointment duration is configured".to_string())
                })?;

                let slots = slots_for_settings(&settings, duration_minutes);
                let slot = select_emergency_slot(&slots, duration_minutes, now.time()).ok_or_else(|| {
                    AppointmentError::ConfigError("working hours produce no slots for today".to_string())
                })?;

                let created_at = Utc::now();
                let case_id = Uuid::new_v4();
                let mut appointment = Appointment {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    patient_name: patient.name.clone(),
                    patient_phone: patient.phone.clone(),
                    appointment_date: today,
                    appointment_time: slot,
                    appointment_type: EMERGENCY_APPOINTMENT_TYPE.to_string(),
                    duration_minutes,
                    status: AppointmentStatus::Confirmed,
                    is_emergency: true,
                    emergency_case_id: None,
                    notes: request.case.notes.clone(),
                    created_at,
                    updated_at: created_at,
                };
                repository::insert_appointment(tx, &appointment)?;

                let case = EmergencyCase {
                    id: case_id,
                    patient_id: patient.id,
                    appointment_id: appointment.id,
                    priority: request.case.priority,
                    status: EmergencyCaseStatus::Waiting,
                    chief_complaint: request.case.chief_complaint.clone(),
                    notes: request.case.notes.clone(),
                    created_at,
                };
                repository::insert_emergency_case(tx, &case)?;
                repository::link_emergency_case(tx, appointment.id, case.id)?;
                appointment.emergency_case_id = Some(case.id);

                Ok::<_, AppointmentError>(EmergencyRegistration {
                    case,
                    patient,
                    appointment,
                })
            })
            .await?;

        info!(
            "Emergency case {} registered for {} ({}) at {}",
            registration.case.id,
            registration.patient.name,
            registration.patient.visible_id,
            registration.appointment.appointment_time
        );

        dispatch_notification(
            Arc::clone(&self.notifier),
            NotificationKind::EmergencyRegistered,
            json!({
                "case_id": registration.case.id,
                "priority": registration.case.priority,
                "patient_name": registration.patient.name,
                "patient_visible_id": registration.patient.visible_id,
                "appointment_id": registration.appointment.id,
                "appointment_date": registration.appointment.appointment_date,
                "appointment_time": registration.appointment.appointment_time,
            }),
        );

        Ok(registration)
    }
}

/// Picks today's slot for a walk-in arriving at `now`.
///
/// Each slot covers `[start, start + duration)`. Arriving in the first half
/// of a slot takes that slot; from the half-way point on it takes the next
/// slot, or the last one when none remains. Arriving between or outside
/// slots takes the first slot starting later, else the day's last slot.
/// Compared at second precision.
pub fn select_emergency_slot(
    slots: &[TimeSlotLabel],
    duration_minutes: u32,
    now: NaiveTime,
) -> Option<TimeOfDay> {
    let mut starts: Vec<TimeOfDay> = slots.iter().filter(|s| s.is_active).map(|s| s.time).collect();
    starts.sort();
    let last = *starts.last()?;

    let now_secs = now.num_seconds_from_midnight();
    let slot_secs = duration_minutes.saturating_mul(60);
    let start_secs = |time: TimeOfDay| time.minutes() as u32 * 60;

    let current = starts.iter().position(|&start| {
        let begins = start_secs(start);
        begins <= now_secs && now_secs < begins.saturating_add(slot_secs)
    });

    let chosen = match current {
        Some(index) => {
            let midpoint = start_secs(starts[index]).saturating_add(slot_secs / 2);
            if now_secs < midpoint {
                starts[index]
            } else {
                starts.get(index + 1).copied().unwrap_or(last)
            }
        }
        None => starts
            .iter()
            .copied()
            .find(|&start| start_secs(start) > now_secs)
            .unwrap_or(last),
    };

    if chosen == last && now_secs >= start_secs(last).saturating_add(slot_secs) {
        warn!("Walk-in after the last slot of the day, assigning {}", last);
    }
    Some(chosen)
}
