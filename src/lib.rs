//! Parok - Telegram storefront bot for a vape shop
//!
//! This library provides all the core functionality for the bot:
//! catalog and inventory, per-user carts, the checkout engine, the
//! restock waitlist, and the Telegram integration on top of them.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging
//! - `storage`: SQLite pool, migrations, and the per-table stores
//! - `telegram`: Bot setup, dispatcher schema, menus, admin surface

pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, StoreError};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{schema, HandlerDeps};
