//! Connection handling for the `SQLite` store.

use crate::Result;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
///
/// A panic while holding the connection does not invalidate it, so a poisoned
/// lock is logged and reused instead of failing every later request.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a connection for concurrent use with the note service.
///
/// - **WAL mode**: readers do not block the note service's writes
/// - **NORMAL synchronous**: embeddings can be recomputed, full fsync is not needed
/// - **`busy_timeout`**: wait up to 5 seconds on lock contention instead of failing
///
/// Pragma results are ignored: in-memory databases refuse WAL and report
/// `memory`, which is fine.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    Ok(())
}
