use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Database query failed: {0}")]
    Query(String),

    #[error("Failed to acquire database connection: {0}")]
    Lock(String),

    #[error("Database task failed: {0}")]
    Task(String),

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    DatabaseError::UniqueViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    DatabaseError::ForeignKeyViolation(msg)
                } else {
                    DatabaseError::Query(msg)
                }
            }
            rusqlite::Error::FromSqlConversionFailure(column, _, cause) => {
                DatabaseError::Decode(format!("column {}: {}", column, cause))
            }
            other => DatabaseError::Query(other.to_string()),
        }
    }
}
