//! Persistence layer: SQLite pool, migrations, and per-table stores.
//!
//! The database is the only source of truth. Handlers receive the pool via
//! `HandlerDeps`; nothing in this crate opens an ambient global connection.

pub mod cart;
pub mod catalog;
pub mod db;
pub mod migrations;
pub mod orders;
pub mod waitlist;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};

/// Fresh in-memory database with the full schema, for module tests.
#[cfg(test)]
pub(crate) fn test_conn() -> rusqlite::Connection {
    #[allow(clippy::unwrap_used)]
    {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        migrations::run_migrations(&mut conn).unwrap();
        conn
    }
}
