use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::{Appointment, BookAppointmentRequest, PatientRef, TimeSlotLabel};
use patient_cell::models::PatientDraft;

/// Structured booking details extracted from one chat turn. Every field is
/// optional; turns accumulate until the booking can be attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingIntent {
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub appointment_type: Option<String>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

impl BookingIntent {
    /// Fields present in `update` replace the stored ones.
    pub fn merge(&mut self, update: BookingIntent) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.patient_id, update.patient_id);
        take(&mut self.patient_name, non_blank(update.patient_name));
        take(&mut self.patient_phone, non_blank(update.patient_phone));
        take(&mut self.appointment_date, update.appointment_date);
        take(&mut self.appointment_time, non_blank(update.appointment_time));
        take(&mut self.appointment_type, non_blank(update.appointment_type));
        take(&mut self.duration_minutes, update.duration_minutes);
        take(&mut self.notes, non_blank(update.notes));
    }

    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.patient_id.is_none() && self.patient_name.is_none() {
            missing.push("patient_name".to_string());
        }
        if self.appointment_date.is_none() {
            missing.push("appointment_date".to_string());
        }
        if self.appointment_time.is_none() {
            missing.push("appointment_time".to_string());
        }
        missing
    }

    /// The one booking request shape the manual path uses as well.
    pub fn to_booking_request(&self) -> BookAppointmentRequest {
        let patient = match self.patient_id {
            Some(patient_id) => PatientRef::Existing { patient_id },
            None => PatientRef::New(PatientDraft {
                name: self.patient_name.clone().unwrap_or_default(),
                phone: self.patient_phone.clone().unwrap_or_default(),
            }),
        };

        BookAppointmentRequest {
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time.clone(),
            appointment_type: self.appointment_type.clone(),
            duration_minutes: self.duration_minutes,
            patient,
            notes: self.notes.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    pub conversation_id: String,
    pub intent: BookingIntent,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            intent: BookingIntent::default(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatReply {
    NeedsDetails {
        missing: Vec<String>,
        intent: BookingIntent,
    },
    Booked {
        appointment: Appointment,
    },
    SlotTaken {
        message: String,
        alternatives: Vec<TimeSlotLabel>,
        intent: BookingIntent,
    },
}
