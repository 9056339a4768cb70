// libs/appointment-cell/src/services/swap.rs
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Database;
use shared_utils::{dispatch_notification, AppState, NotificationKind, NotificationPort};

use crate::models::{AppointmentError, SwapResult};
use crate::services::repository;

pub struct SwapService {
    db: Database,
    notifier: Arc<dyn NotificationPort>,
}

impl SwapService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            notifier: Arc::clone(&state.notifier),
        }
    }

    /// Exchanges the slots of two confirmed, non-emergency appointments.
    ///
    /// Runs as one transaction in three steps: park the first appointment on
    /// the placeholder, move the second into the first's slot, then move the
    /// first into the second's. The slot index holds after every step and no
    /// other caller ever sees the intermediate state.
    pub async fn swap_appointments(
        &self,
        first_id: Uuid,
        second_id: Uuid,
    ) -> Result<SwapResult, AppointmentError> {
        info!("Swapping appointments {} and {}", first_id, second_id);

        if first_id == second_id {
            return Err(AppointmentError::ValidationError(
                "An appointment cannot be swapped with itself".to_string(),
            ));
        }

        let result = self
            .db
            .transaction(move |tx| {
                let first = repository::find_appointment(tx, first_id)?.ok_or(AppointmentError::NotFound)?;
                let second = repository::find_appointment(tx, second_id)?.ok_or(AppointmentError::NotFound)?;

                for appointment in [&first, &second] {
                    if !appointment.status.can_reschedule() {
                        return Err(AppointmentError::InvalidStatusTransition(appointment.status));
                    }
                    if appointment.is_emergency {
                        return Err(AppointmentError::ValidationError(format!(
                            "Emergency appointment {} does not hold a slot and cannot be swapped",
                            appointment.id
                        )));
                    }
                }

                repository::park_on_placeholder(tx, first.id)?;
                debug!("Parked {} on swap placeholder", first.id);

                repository::move_appointment(tx, second.id, first.appointment_date, first.appointment_time)?;
                repository::move_appointment(tx, first.id, second.appointment_date, second.appointment_time)?;

                let first = repository::find_appointment(tx, first_id)?.ok_or(AppointmentError::NotFound)?;
                let second = repository::find_appointment(tx, second_id)?.ok_or(AppointmentError::NotFound)?;
                Ok(SwapResult { first, second })
            })
            .await?;

        info!(
            "Swapped {} (now {} {}) with {} (now {} {})",
            result.first.id,
            result.first.appointment_date,
            result.first.appointment_time,
            result.second.id,
            result.second.appointment_date,
            result.second.appointment_time
        );

        dispatch_notification(
            Arc::clone(&self.notifier),
            NotificationKind::AppointmentsSwapped,
            json!({
                "appointments": [
                    {
                        "appointment_id": result.first.id,
                        "patient_name": result.first.patient_name,
                        "patient_phone": result.first.patient_phone,
                        "appointment_date": result.first.appointment_date,
                        "appointment_time": result.first.appointment_time,
                    },
                    {
                        "appointment_id": result.second.id,
                        "patient_name": result.second.patient_name,
                        "patient_phone": result.second.patient_phone,
                        "appointment_date": result.second.appointment_date,
                        "appointment_time": result.second.appointment_time,
                    }
                ]
            }),
        );

        Ok(result)
    }
}
