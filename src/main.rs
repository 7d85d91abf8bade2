use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use parok::core::{config, init_logger};
use parok::storage::create_pool;
use parok::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    log::info!("Starting parok (database: {})", *config::DATABASE_PATH);
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS is not set: nobody can manage the catalog or receive order alerts");
    }

    // Create database pool and run migrations
    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH)?);

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    // Create the dispatcher handler tree using the modular schema
    let handler = schema(HandlerDeps::new(Arc::clone(&db_pool)));

    log::info!("Starting bot in long polling mode");
    Dispatcher::builder(bot, handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
