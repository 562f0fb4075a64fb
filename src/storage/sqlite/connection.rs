//! Shared connection handling for the `SQLite` graph store.
//!
//! Mutex poison recovery plus the pragmas that make concurrent reads cheap.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
///
/// The engine only reads through the connection, so a poisoned guard still
/// holds a usable connection.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!(crate::observability::metric_names::SQLITE_MUTEX_POISON_RECOVERY_TOTAL).increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies WAL journaling, NORMAL synchronous mode, a 5 second busy timeout
/// and foreign-key enforcement.
///
/// Pragma results are ignored: `journal_mode` answers with a row, and
/// in-memory databases report `memory` instead of `wal`.
pub fn configure_connection(conn: &Connection) {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
    let _ = conn.pragma_update(None, "foreign_keys", "ON");
}

/// Opens (or creates) a database file and configures it.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the parent directory cannot be
/// created or the file cannot be opened.
pub fn open_configured(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_graph_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }

    let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_graph_sqlite".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    configure_connection(&conn);
    Ok(conn)
}
