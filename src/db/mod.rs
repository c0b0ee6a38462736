use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, MovieragError};

pub mod migrate;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -16384;";

/// Database connection wrapper
///
/// Holds only the path; every call opens its own connection inside a
/// blocking task so the async runtime never waits on SQLite.
#[derive(Debug, Clone)]
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new read-write database connection with pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(MovieragError::Database)?;
        conn.execute_batch(PRAGMAS)?;
        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        task::spawn_blocking(move || {
            let mut conn = db.open_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| MovieragError::InvalidInput(format!("database task failed: {}", e)))?
    }

    /// Execute a closure with a connection SQLite itself refuses to write through.
    ///
    /// Used for model-written queries.
    pub async fn with_read_only_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        task::spawn_blocking(move || {
            let conn = db.open_connection()?;
            conn.execute_batch("PRAGMA query_only = ON;")?;
            f(&conn)
        })
        .await
        .map_err(|e| MovieragError::InvalidInput(format!("database task failed: {}", e)))?
    }
}
