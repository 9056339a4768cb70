pub mod columns;
pub mod error;
pub mod schema;
pub mod sqlite;

pub use columns::parse_text_column;
pub use error::{DatabaseError, DatabaseResult};
pub use sqlite::Database;

// Re-exported so cells share one rusqlite version.
pub use rusqlite;
