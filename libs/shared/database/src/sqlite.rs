use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{DatabaseError, DatabaseResult};
use crate::schema;

/// Shared handle to the scheduling store.
///
/// A single SQLite connection serialises all writers; blocking work runs on
/// tokio's blocking pool so request handlers never stall the runtime.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path`. `":memory:"` opens a
    /// private in-memory store.
    pub fn open(path: &str) -> DatabaseResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        info!("Opened scheduling database at {}", path);
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> DatabaseResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DatabaseResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(conn: &Mutex<Connection>) -> DatabaseResult<MutexGuard<'_, Connection>> {
        conn.lock().map_err(|e| DatabaseError::Lock(e.to_string()))
    }

    /// Runs `f` against the connection outside of an explicit transaction.
    pub async fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = Self::lock(&conn)?;
            f(&guard)
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(e) => Err(DatabaseError::Task(e.to_string()).into()),
        }
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// `Ok` commits; `Err` drops the transaction, which rolls every statement
    /// back. Nothing `f` wrote is visible to other callers until commit.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = Self::lock(&conn)?;
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(DatabaseError::from)?;

            let value = f(&tx)?;

            tx.commit().map_err(DatabaseError::from)?;
            debug!("Transaction committed");
            Ok(value)
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(e) => Err(DatabaseError::Task(e.to_string()).into()),
        }
    }
}
