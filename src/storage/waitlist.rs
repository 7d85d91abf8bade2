//! Waitlist: buyers interested in an out-of-stock variant.
//!
//! Registration is idempotent per (user, variant). The whole list for a
//! variant is dropped once the back-in-stock notifications have been
//! attempted, whether or not each delivery succeeded.

use rusqlite::{params, Connection};

use crate::core::error::StoreError;
use crate::storage::catalog;

/// Register interest in a variant. No-op if already subscribed.
pub fn subscribe(conn: &Connection, user_id: i64, variant_id: i64) -> Result<(), StoreError> {
    if catalog::get_variant(conn, variant_id)?.is_none() {
        return Err(StoreError::NotFound);
    }
    conn.execute(
        "INSERT OR IGNORE INTO waitlist (user_id, variant_id) VALUES (?1, ?2)",
        params![user_id, variant_id],
    )?;
    Ok(())
}

/// All user ids waiting on a variant.
pub fn subscribers(conn: &Connection, variant_id: i64) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare("SELECT user_id FROM waitlist WHERE variant_id = ?1")?;
    let rows = stmt.query_map(params![variant_id], |row| row.get(0))?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Drop every waitlist entry for a variant. Idempotent.
pub fn clear(conn: &Connection, variant_id: i64) -> Result<(), StoreError> {
    conn.execute("DELETE FROM waitlist WHERE variant_id = ?1", params![variant_id])?;
    Ok(())
}
