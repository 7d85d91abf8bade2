use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Path to the SQLite database file
/// Read from DATABASE_PATH environment variable
/// Defaults to "vape_shop.db" (the name the shop has always used)
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "vape_shop.db".to_string()));

/// Path to the log file
/// Read from LOG_FILE_PATH environment variable
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "parok.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    /// Only these identities see the admin menu and may mutate the catalog
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });
}

/// Outbound notification configuration
pub mod notify {
    use super::Duration;

    /// Timeout for a single outbound Telegram send (in seconds)
    /// Notifications are best-effort and must never stall a committed checkout
    pub const SEND_TIMEOUT_SECS: u64 = 10;

    /// Per-send timeout duration
    pub fn send_timeout() -> Duration {
        Duration::from_secs(SEND_TIMEOUT_SECS)
    }
}

/// Database configuration
pub mod db {
    use super::Duration;

    /// Maximum connections in the r2d2 pool
    pub const POOL_MAX_SIZE: u32 = 10;

    /// SQLite busy timeout: writers queue instead of failing under contention
    pub const BUSY_TIMEOUT_SECS: u64 = 30;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::admin;

    #[test]
    fn admin_ids_default_empty_without_env() {
        // Touching the Lazy is enough; with no ADMIN_IDS set nobody is admin.
        if std::env::var("ADMIN_IDS").is_err() {
            assert!(admin::ADMIN_IDS.is_empty());
        }
    }
}
