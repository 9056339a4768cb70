mod common;

use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::models::{AppointmentError, AppointmentStatus, PatientRef};
use appointment_cell::services::repository;
use appointment_cell::services::AppointmentBookingService;
use shared_utils::test_utils::{at, TestHarness};
use shared_utils::NotificationKind;

use common::*;

#[tokio::test]
async fn test_booking_new_patient_creates_confirmed_appointment() {
    let harness = clinic().await;
    let service = AppointmentBookingService::new(&harness.state);

    let appointment = service
        .book_appointment(new_patient_request("Ada Byrne", tomorrow(), "10:00 AM"))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.appointment_time, t(10, 0));
    assert_eq!(appointment.duration_minutes, 30);
    assert_eq!(appointment.appointment_type, "Consultation");
    assert!(!appointment.is_emergency);

    let stored = service.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored, appointment);

    assert_eq!(harness.notifier.wait_for(1).await, vec![NotificationKind::BookingConfirmed]);
    let (_, payload) = &harness.notifier.events()[0];
    assert_eq!(payload["patient_name"], "Ada Byrne");
    assert_eq!(payload["appointment_time"], "10:00 AM");
}

#[tokio::test]
async fn test_booking_existing_patient() {
    let harness = clinic().await;
    let first = book(&harness, "Ada Byrne", tomorrow(), "10:00 AM").await;

    let mut request = new_patient_request("ignored", tomorrow(), "2:00 PM");
    request.patient = PatientRef::Existing { patient_id: first.patient_id };
    request.appointment_type = Some("follow-up".to_string());

    let second = AppointmentBookingService::new(&harness.state)
        .book_appointment(request)
        .await
        .unwrap();

    assert_eq!(second.patient_id, first.patient_id);
    assert_eq!(second.patient_name, "Ada Byrne");
    assert_eq!(second.appointment_type, "Follow-up");
}

#[tokio::test]
async fn test_unknown_patient_is_not_found() {
    let harness = clinic().await;

    let mut request = new_patient_request("ignored", tomorrow(), "10:00 AM");
    request.patient = PatientRef::Existing { patient_id: uuid::Uuid::new_v4() };

    let result = AppointmentBookingService::new(&harness.state).book_appointment(request).await;

    assert_matches!(result, Err(AppointmentError::PatientNotFound));
}

#[tokio::test]
async fn test_missing_or_malformed_fields_are_rejected() {
    let harness = clinic().await;
    let service = AppointmentBookingService::new(&harness.state);

    let mut request = new_patient_request("Ada Byrne", tomorrow(), "10:00 AM");
    request.appointment_date = None;
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));

    let mut request = new_patient_request("Ada Byrne", tomorrow(), "10:00 AM");
    request.appointment_time = Some("   ".to_string());
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));

    let request = new_patient_request("Ada Byrne", tomorrow(), "ten o'clock");
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));

    let request = new_patient_request("  ", tomorrow(), "10:00 AM");
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));

    let mut request = new_patient_request("Ada Byrne", tomorrow(), "10:00 AM");
    request.duration_minutes = Some(45);
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));

    let mut request = new_patient_request("Ada Byrne", tomorrow(), "10:00 AM");
    request.appointment_type = Some("Surgery".to_string());
    assert_matches!(service.book_appointment(request).await, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn test_time_must_be_a_generated_slot() {
    let harness = clinic().await;
    let service = AppointmentBookingService::new(&harness.state);

    for time in ["10:15 AM", "12:00 PM", "6:00 PM"] {
        let result = service
            .book_appointment(new_patient_request("Ada Byrne", tomorrow(), time))
            .await;
        assert_matches!(result, Err(AppointmentError::ValidationError(_)), "time {}", time);
    }

    // 24-hour input naming a real slot is accepted.
    let appointment = service
        .book_appointment(new_patient_request("Ada Byrne", tomorrow(), "13:30"))
        .await
        .unwrap();
    assert_eq!(appointment.appointment_time, t(13, 30));
}

#[tokio::test]
async fn test_booking_window() {
    let harness = clinic().await;
    let service = AppointmentBookingService::new(&harness.state);

    let yesterday = today() - Duration::days(1);
    let result = service
        .book_appointment(new_patient_request("Ada Byrne", yesterday, "10:00 AM"))
        .await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let beyond = today() + Duration::days(31);
    let result = service
        .book_appointment(new_patient_request("Ada Byrne", beyond, "10:00 AM"))
        .await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    // Clock is 09:00: the 8:30 slot has ended, the 9:00 slot has not.
    let result = service
        .book_appointment(new_patient_request("Ada Byrne", today(), "8:30 AM"))
        .await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let appointment = service
        .book_appointment(new_patient_request("Ada Byrne", today(), "9:00 AM"))
        .await
        .unwrap();
    assert_eq!(appointment.appointment_date, today());
}

#[tokio::test]
async fn test_taken_slot_is_conflict() {
    let harness = clinic().await;
    book(&harness, "Ada Byrne", tomorrow(), "10:00 AM").await;

    let result = AppointmentBookingService::new(&harness.state)
        .book_appointment(new_patient_request("Brian Kelly", tomorrow(), "10:00 AM"))
        .await;

    assert_matches!(result, Err(AppointmentError::ConflictDetected(_)));
    assert_eq!(harness.notifier.wait_for(2).await.len(), 1);
}

#[tokio::test]
async fn test_slot_index_is_the_final_authority() {
    let harness = clinic().await;
    let existing = book(&harness, "Ada Byrne", tomorrow(), "10:00 AM").await;

    let mut clash = existing.clone();
    clash.id = uuid::Uuid::new_v4();
    let result = harness
        .state
        .db
        .transaction(move |tx| repository::insert_appointment(tx, &clash))
        .await;

    assert_matches!(result, Err(AppointmentError::ConflictDetected(_)));
}

#[tokio::test]
async fn test_patient_identifier_clash_is_not_a_slot_conflict() {
    let harness = clinic().await;
    book(&harness, "Ada Byrne", tomorrow(), "10:00 AM").await;

    let result = harness
        .state
        .db
        .transaction(|tx| {
            tx.execute(
                "INSERT INTO patients (id, visible_id, name, phone, created_at)
                 SELECT 'duplicate', visible_id, name, phone, created_at FROM patients LIMIT 1",
                [],
            )?;
            Ok::<_, AppointmentError>(())
        })
        .await;

    assert_matches!(result, Err(AppointmentError::DatabaseError(_)));
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_slot() {
    let harness = clinic().await;
    let first = AppointmentBookingService::new(&harness.state);
    let second = AppointmentBookingService::new(&harness.state);

    let (a, b) = tokio::join!(
        first.book_appointment(new_patient_request("Ada Byrne", tomorrow(), "10:00 AM")),
        second.book_appointment(new_patient_request("Brian Kelly", tomorrow(), "10:00 AM")),
    );

    let outcomes = [a, b];
    let booked = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::ConflictDetected(_))))
        .count();
    assert_eq!(booked, 1);
    assert_eq!(conflicts, 1);

    let day = first.appointments_on(tomorrow()).await.unwrap();
    assert_eq!(day.len(), 1);

    // The loser's new patient was rolled back with its appointment.
    let patients: u32 = harness
        .state
        .db
        .read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
                .map_err(AppointmentError::from)
        })
        .await
        .unwrap();
    assert_eq!(patients, 1);
}

#[tokio::test]
async fn test_daily_capacity() {
    let mut settings = clinic_settings();
    settings.max_appointments_per_day = 2;
    let harness = harness_with(settings, 9, 0).await;

    book(&harness, "Ada Byrne", tomorrow(), "10:00 AM").await;
    let second = book(&harness, "Brian Kelly", tomorrow(), "10:30 AM").await;

    let result = AppointmentBookingService::new(&harness.state)
        .book_appointment(new_patient_request("Cara Walsh", tomorrow(), "11:00 AM"))
        .await;
    assert_matches!(result, Err(AppointmentError::CapacityReached { max: 2, .. }));

    // Cancelled appointments stop counting.
    set_status(&harness, second.id, AppointmentStatus::Cancelled).await;
    let third = book(&harness, "Cara Walsh", tomorrow(), "10:30 AM").await;
    assert_eq!(third.appointment_time, t(10, 30));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_booking() {
    let harness = TestHarness::with_failing_notifier(at(today(), 9, 0));
    appointment_cell::services::SettingsStore::new(harness.state.db.clone())
        .save(clinic_settings())
        .await
        .unwrap();

    let result = AppointmentBookingService::new(&harness.state)
        .book_appointment(new_patient_request("Ada Byrne", tomorrow(), "10:00 AM"))
        .await;

    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_day_listing_is_ordered() {
    let harness = clinic().await;
    book(&harness, "Late", tomorrow(), "3:00 PM").await;
    book(&harness, "Early", tomorrow(), "8:00 AM").await;
    book(&harness, "Other day", today(), "4:00 PM").await;

    let day = AppointmentBookingService::new(&harness.state)
        .appointments_on(tomorrow())
        .await
        .unwrap();

    let names: Vec<_> = day.iter().map(|a| a.patient_name.as_str()).collect();
    assert_eq!(names, vec!["Early", "Late"]);
}
