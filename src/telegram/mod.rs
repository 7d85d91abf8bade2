//! Telegram integration: bot setup, routing, menus, admin surface

pub mod admin;
pub mod bot;
pub mod callback;
pub mod handlers;
pub mod menu;
pub mod notifications;
pub mod wizard;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use callback::CallbackAction;
pub use handlers::{schema, HandlerDeps, HandlerError};
