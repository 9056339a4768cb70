use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::rusqlite::{params, Connection, OptionalExtension, Row};
use shared_database::{parse_text_column, Database};
use shared_utils::AppState;

use crate::models::{Patient, PatientDraft, PatientError};
use crate::services::identifier::VisibleId;

pub struct PatientService {
    db: Database,
    default_prefix: String,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            default_prefix: state.config.patient_id_prefix.clone(),
        }
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        self.db
            .read(move |conn| find_patient(conn, patient_id))
            .await?
            .ok_or(PatientError::NotFound)
    }

    /// Identifier the next patient created under `prefix` would receive.
    /// Nothing is reserved; concurrent creations may take it first.
    pub async fn preview_next_identifier(&self, prefix: Option<&str>) -> Result<String, PatientError> {
        let prefix = prefix.unwrap_or(self.default_prefix.as_str()).to_string();
        debug!("Previewing next visible identifier for prefix {}", prefix);

        let next = self
            .db
            .read(move |conn| resolve_next_identifier(conn, &prefix))
            .await?;
        Ok(next.to_string())
    }
}

// ==============================================================================
// TRANSACTION-SCOPED REPOSITORY FUNCTIONS
// ==============================================================================

/// Mints the next visible identifier for `prefix` and records it as issued.
///
/// Must run inside the same transaction as the insert it numbers. The
/// counter row is updated under the transaction's write lock, so two
/// concurrent creations can never read the same previous value.
pub fn mint_visible_id(conn: &Connection, prefix: &str) -> Result<String, PatientError> {
    let next = resolve_next_identifier(conn, prefix)?;
    let base = VisibleId::first(prefix)?.prefix();

    conn.execute(
        "INSERT INTO identifier_counters (prefix, last_issued, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(prefix) DO UPDATE SET
             last_issued = excluded.last_issued,
             updated_at = excluded.updated_at",
        params![base, next.to_string(), Utc::now().to_rfc3339()],
    )?;

    debug!("Minted visible identifier {} for prefix {}", next, base);
    Ok(next.to_string())
}

fn resolve_next_identifier(conn: &Connection, prefix: &str) -> Result<VisibleId, PatientError> {
    let base = VisibleId::first(prefix)?.prefix();

    let last_issued: Option<String> = conn
        .query_row(
            "SELECT last_issued FROM identifier_counters WHERE prefix = ?1",
            params![base],
            |row| row.get(0),
        )
        .optional()?;

    let previous = match last_issued {
        Some(value) => Some(VisibleId::parse(&value)?),
        None => highest_existing_identifier(conn, &base)?,
    };

    Ok(match previous {
        Some(previous) => {
            if previous.is_exhausted() {
                warn!("Visible identifier space exhausted at {}, wrapping around", previous);
            }
            previous.increment()
        }
        None => VisibleId::first(&base)?,
    })
}

/// Seeds a prefix that has no counter row yet from identifiers already on
/// file. Rows that do not parse are skipped.
fn highest_existing_identifier(conn: &Connection, base: &str) -> Result<Option<VisibleId>, PatientError> {
    let mut stmt = conn.prepare("SELECT visible_id FROM patients WHERE visible_id LIKE ?1")?;
    let rows = stmt.query_map(params![format!("{}-%", base)], |row| row.get::<_, String>(0))?;

    let mut highest: Option<VisibleId> = None;
    for row in rows {
        let value = row?;
        match VisibleId::parse(&value) {
            Ok(id) => highest = highest.max(Some(id)),
            Err(_) => debug!("Ignoring unparsable visible identifier {}", value),
        }
    }

    Ok(highest)
}

/// Creates a patient with a freshly minted visible identifier.
pub fn insert_patient(
    conn: &Connection,
    draft: &PatientDraft,
    prefix: &str,
) -> Result<Patient, PatientError> {
    draft.validate()?;

    let visible_id = mint_visible_id(conn, prefix)?;
    let patient = Patient {
        id: Uuid::new_v4(),
        visible_id,
        name: draft.name.trim().to_string(),
        phone: draft.phone.trim().to_string(),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO patients (id, visible_id, name, phone, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient.id.to_string(),
            patient.visible_id,
            patient.name,
            patient.phone,
            patient.created_at.to_rfc3339(),
        ],
    )?;

    info!("Patient {} created with visible identifier {}", patient.id, patient.visible_id);
    Ok(patient)
}

pub fn find_patient(conn: &Connection, patient_id: Uuid) -> Result<Option<Patient>, PatientError> {
    let patient = conn
        .query_row(
            "SELECT id, visible_id, name, phone, created_at FROM patients WHERE id = ?1",
            params![patient_id.to_string()],
            row_to_patient,
        )
        .optional()?;

    Ok(patient)
}

fn row_to_patient(row: &Row<'_>) -> shared_database::rusqlite::Result<Patient> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(4)?;

    Ok(Patient {
        id: parse_text_column(0, &id, Uuid::parse_str)?,
        visible_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        created_at: parse_text_column(4, &created_at, |value| {
            DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
        })?,
    })
}
