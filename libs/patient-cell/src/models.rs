use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::{rusqlite, DatabaseError};

use crate::services::identifier::IdentifierError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub visible_id: String,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Details needed to register a patient on the fly (new-patient booking or
/// emergency walk-in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

impl PatientDraft {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.name.trim().is_empty() {
            return Err(PatientError::ValidationError("Patient name is required".to_string()));
        }
        if self.name.trim().len() > 200 {
            return Err(PatientError::ValidationError("Patient name is too long".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<rusqlite::Error> for PatientError {
    fn from(err: rusqlite::Error) -> Self {
        PatientError::DatabaseError(err.into())
    }
}
