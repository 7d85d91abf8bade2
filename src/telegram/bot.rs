//! Bot initialization and command definitions

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start,
    #[command(description = "каталог товаров")]
    Catalog,
    #[command(description = "показать корзину")]
    Cart,
    #[command(description = "мои заказы")]
    Orders,
    #[command(description = "панель администратора")]
    Admin,
}

/// Creates a Bot instance from BOT_TOKEN / TELOXIDE_TOKEN
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Token is missing
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set"));
    }
    Ok(Bot::new(token))
}

/// Sets up bot commands in Telegram UI
///
/// # Arguments
/// * `bot` - Bot instance to configure
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "главное меню"),
        BotCommand::new("catalog", "каталог товаров"),
        BotCommand::new("cart", "показать корзину"),
        BotCommand::new("orders", "мои заказы"),
    ])
    .await?;

    Ok(())
}
