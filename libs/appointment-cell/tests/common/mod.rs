#![allow(dead_code)]

use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentSettings, AppointmentStatus, BookAppointmentRequest, DurationOption,
    PatientRef,
};
use appointment_cell::services::repository;
use appointment_cell::services::{AppointmentBookingService, SettingsStore};
use patient_cell::models::PatientDraft;
use shared_models::TimeOfDay;
use shared_utils::test_utils::{at, date, TestHarness};

pub fn t(hour: u32, minute: u32) -> TimeOfDay {
    TimeOfDay::from_hm(hour, minute).unwrap()
}

/// Friday 20 June 2025, the day every scenario runs on.
pub fn today() -> NaiveDate {
    date(2025, 6, 20)
}

pub fn tomorrow() -> NaiveDate {
    date(2025, 6, 21)
}

/// 08:00 to 18:00 with a 12:00 to 13:00 break and 30-minute slots.
pub fn clinic_settings() -> AppointmentSettings {
    AppointmentSettings {
        working_hours_start: t(8, 0),
        working_hours_end: t(18, 0),
        break_start: Some(t(12, 0)),
        break_end: Some(t(13, 0)),
        durations: vec![
            DurationOption { minutes: 30, is_active: true },
            DurationOption { minutes: 60, is_active: true },
        ],
        default_duration: 30,
        appointment_types: vec!["Consultation".to_string(), "Follow-up".to_string()],
        max_appointments_per_day: 20,
        allow_overlap: false,
        buffer_minutes: 0,
        advance_booking_days: 30,
        auto_generate_slots: true,
    }
}

pub async fn harness_with(settings: AppointmentSettings, hour: u32, minute: u32) -> TestHarness {
    let harness = TestHarness::new(at(today(), hour, minute));
    SettingsStore::new(harness.state.db.clone())
        .save(settings)
        .await
        .unwrap();
    harness
}

/// Clinic configured with the standard settings, clock at 09:00.
pub async fn clinic() -> TestHarness {
    harness_with(clinic_settings(), 9, 0).await
}

pub fn new_patient_request(name: &str, day: NaiveDate, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        appointment_date: Some(day),
        appointment_time: Some(time.to_string()),
        appointment_type: None,
        duration_minutes: None,
        patient: PatientRef::New(PatientDraft {
            name: name.to_string(),
            phone: "0851234567".to_string(),
        }),
        notes: None,
    }
}

pub async fn book(harness: &TestHarness, name: &str, day: NaiveDate, time: &str) -> Appointment {
    AppointmentBookingService::new(&harness.state)
        .book_appointment(new_patient_request(name, day, time))
        .await
        .unwrap()
}

pub async fn set_status(harness: &TestHarness, appointment_id: Uuid, status: AppointmentStatus) {
    harness
        .state
        .db
        .transaction(move |tx| repository::update_status(tx, appointment_id, status))
        .await
        .unwrap();
}
