use std::collections::HashSet;

use assert_matches::assert_matches;
use futures::future::join_all;

use patient_cell::models::{PatientDraft, PatientError};
use patient_cell::services::{insert_patient, mint_visible_id, PatientService};
use shared_database::rusqlite::params;
use shared_utils::test_utils::{at, date, TestHarness};

fn harness() -> TestHarness {
    TestHarness::new(at(date(2025, 6, 20), 9, 0))
}

fn draft(name: &str) -> PatientDraft {
    PatientDraft {
        name: name.to_string(),
        phone: "0851234567".to_string(),
    }
}

#[tokio::test]
async fn test_minted_identifiers_follow_sequence() {
    let harness = harness();

    let first = harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("Ada Byrne"), "APL"))
        .await
        .unwrap();
    let second = harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("Brian Kelly"), "APL"))
        .await
        .unwrap();

    assert_eq!(first.visible_id, "APL-00001");
    assert_eq!(second.visible_id, "APL-00002");
}

#[tokio::test]
async fn test_counter_seeds_from_existing_patients() {
    let harness = harness();

    harness
        .state
        .db
        .transaction(|tx| {
            tx.execute(
                "INSERT INTO patients (id, visible_id, name, phone, created_at)
                 VALUES ('legacy-1', 'APL-99999', 'Legacy', '', '2024-01-01T00:00:00Z'),
                        ('legacy-2', 'APL-00042', 'Legacy', '', '2024-01-01T00:00:00Z')",
                params![],
            )?;
            Ok::<_, PatientError>(())
        })
        .await
        .unwrap();

    let minted = harness
        .state
        .db
        .transaction(|tx| mint_visible_id(tx, "APL"))
        .await
        .unwrap();

    assert_eq!(minted, "APL-A-00001");
}

#[tokio::test]
async fn test_rolled_back_creation_does_not_consume_identifier() {
    let harness = harness();

    let failed: Result<(), PatientError> = harness
        .state
        .db
        .transaction(|tx| {
            insert_patient(tx, &draft("Ada Byrne"), "APL")?;
            Err(PatientError::ValidationError("later step failed".to_string()))
        })
        .await;
    assert!(failed.is_err());

    let patient = harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("Ada Byrne"), "APL"))
        .await
        .unwrap();

    assert_eq!(patient.visible_id, "APL-00001");
}

#[tokio::test]
async fn test_concurrent_creations_never_share_identifier() {
    let harness = harness();

    let creations = (0..25).map(|i| {
        let db = harness.state.db.clone();
        async move {
            db.transaction(move |tx| insert_patient(tx, &draft(&format!("Walk-in {}", i)), "APL"))
                .await
        }
    });

    let patients: Vec<_> = join_all(creations)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let unique: HashSet<_> = patients.iter().map(|p| p.visible_id.clone()).collect();
    assert_eq!(unique.len(), 25);
    assert!(unique.contains("APL-00001"));
    assert!(unique.contains("APL-00025"));
}

#[tokio::test]
async fn test_preview_does_not_reserve() {
    let harness = harness();
    let service = PatientService::new(&harness.state);

    assert_eq!(service.preview_next_identifier(None).await.unwrap(), "APL-00001");
    assert_eq!(service.preview_next_identifier(None).await.unwrap(), "APL-00001");

    harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("Ada Byrne"), "APL"))
        .await
        .unwrap();

    assert_eq!(service.preview_next_identifier(Some("apl")).await.unwrap(), "APL-00002");
    assert_eq!(service.preview_next_identifier(Some("XRY")).await.unwrap(), "XRY-00001");
}

#[tokio::test]
async fn test_invalid_prefix_and_blank_name_are_rejected() {
    let harness = harness();
    let service = PatientService::new(&harness.state);

    let result = service.preview_next_identifier(Some("A1")).await;
    assert_matches!(result, Err(PatientError::Identifier(_)));

    let result = harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("   "), "APL"))
        .await;
    assert_matches!(result, Err(PatientError::ValidationError(_)));
}

#[tokio::test]
async fn test_get_patient_round_trip_and_not_found() {
    let harness = harness();
    let service = PatientService::new(&harness.state);

    let created = harness
        .state
        .db
        .transaction(|tx| insert_patient(tx, &draft("  Ada Byrne "), "APL"))
        .await
        .unwrap();

    let fetched = service.get_patient(created.id).await.unwrap();
    assert_eq!(fetched.name, "Ada Byrne");
    assert_eq!(fetched.visible_id, created.visible_id);

    let missing = service.get_patient(uuid::Uuid::new_v4()).await;
    assert_matches!(missing, Err(PatientError::NotFound));
}
