//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{store_error_message, HandlerDeps, HandlerError};
use crate::core::error::{AppError, StoreError};
use crate::storage::db::get_connection;
use crate::storage::{cart, orders, waitlist};
use crate::telegram::bot::Command;
use crate::telegram::callback::CallbackAction;
use crate::telegram::{admin, menu, notifications};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree is used in production and in integration tests.
///
/// # Arguments
/// * `deps` - Handler dependencies (database pool, wizard store)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_wizard = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Commands first
        .branch(command_handler(deps_commands))
        // Text while an admin wizard is active
        .branch(wizard_message_handler(deps_wizard))
        // Every button press
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                let chat_id = msg.chat.id;
                let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
                let result = match cmd {
                    Command::Start => menu::show_main_menu(&bot, chat_id, admin::is_admin(user_id)).await,
                    Command::Catalog => menu::show_categories(&bot, chat_id).await,
                    Command::Cart => menu::show_cart(&bot, chat_id, Arc::clone(&deps.db_pool), user_id).await,
                    Command::Orders => menu::show_my_orders(&bot, chat_id, Arc::clone(&deps.db_pool), user_id).await,
                    Command::Admin => {
                        if admin::is_admin(user_id) {
                            admin::show_admin_menu(&bot, chat_id).await
                        } else {
                            log::warn!("User {} tried /admin without being on the allow-list", user_id);
                            bot.send_message(chat_id, "Эта команда не для тебя 🙂").await?;
                            Ok(())
                        }
                    }
                };
                if let Err(e) = result {
                    report_error(&bot, chat_id, &e).await;
                }
                Ok(())
            }
        })
}

/// Routes plain text to the active admin wizard, if any.
fn wizard_message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
            msg.text().is_some() && admin::is_admin(user_id) && deps_filter.wizards.is_active(user_id)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let chat_id = msg.chat.id;
                let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
                let text = msg.text().unwrap_or_default().to_string();
                if let Err(e) =
                    admin::wizard_on_text(&bot, chat_id, Arc::clone(&deps.db_pool), &deps.wizards, user_id, &text).await
                {
                    report_error(&bot, chat_id, &e).await;
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            // Stop the button spinner right away
            let _ = bot.answer_callback_query(q.id.clone()).await;

            let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
                return Ok(());
            };
            let user_id = i64::try_from(q.from.id.0).unwrap_or(0);
            let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
                log::warn!("Unparseable callback data from {}: {:?}", user_id, q.data);
                bot.send_message(chat_id, "Эта кнопка устарела, открой меню заново: /start")
                    .await?;
                return Ok(());
            };

            if let Err(e) = dispatch_action(&bot, chat_id, user_id, action, &deps).await {
                report_error(&bot, chat_id, &e).await;
            }
            Ok(())
        }
    })
}

async fn dispatch_action(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    action: CallbackAction,
    deps: &HandlerDeps,
) -> Result<(), AppError> {
    let db_pool = Arc::clone(&deps.db_pool);
    match action {
        // ── buyer surface ───────────────────────────────────────────────────
        CallbackAction::MainMenu => menu::show_main_menu(bot, chat_id, admin::is_admin(user_id)).await,
        CallbackAction::Catalog => menu::show_categories(bot, chat_id).await,
        CallbackAction::ShowCategory(category) => menu::show_products(bot, chat_id, db_pool, category).await,
        CallbackAction::ShowProduct(id) => menu::show_product(bot, chat_id, db_pool, id).await,
        CallbackAction::ShowVariant(id) => menu::show_variant(bot, chat_id, db_pool, id).await,
        CallbackAction::AddToCart { variant_id, qty } => {
            let result = {
                let conn = get_connection(&db_pool)?;
                cart::add(&conn, user_id, variant_id, qty)
            };
            match result {
                Ok(()) => {
                    bot.send_message(chat_id, "Добавлено в корзину ✅")
                        .reply_markup(teloxide::types::InlineKeyboardMarkup::new(vec![vec![
                            menu::btn("🛍 Дальше", CallbackAction::Catalog),
                            menu::btn("🛒 Корзина", CallbackAction::ShowCart),
                        ]]))
                        .await?;
                }
                Err(e @ (StoreError::NotFound | StoreError::InsufficientStock { .. } | StoreError::InvalidQuantity)) => {
                    bot.send_message(chat_id, store_error_message(&e)).await?;
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        CallbackAction::Waitlist(variant_id) => {
            let result = {
                let conn = get_connection(&db_pool)?;
                waitlist::subscribe(&conn, user_id, variant_id)
            };
            match result {
                Ok(()) => {
                    bot.send_message(chat_id, "Окей, напишу, как только появится 🔔").await?;
                }
                Err(StoreError::NotFound) => {
                    bot.send_message(chat_id, "Этого вкуса больше нет 😔").await?;
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        CallbackAction::ShowCart => menu::show_cart(bot, chat_id, db_pool, user_id).await,
        CallbackAction::RemoveLine(line_id) => {
            {
                let conn = get_connection(&db_pool)?;
                cart::remove(&conn, user_id, line_id)?;
            }
            menu::show_cart(bot, chat_id, db_pool, user_id).await
        }
        CallbackAction::ClearCart => {
            {
                let conn = get_connection(&db_pool)?;
                cart::clear(&conn, user_id)?;
            }
            bot.send_message(chat_id, "Корзина очищена").await?;
            Ok(())
        }
        CallbackAction::Checkout => {
            let result = {
                let mut conn = get_connection(&db_pool)?;
                orders::checkout(&mut conn, user_id)
            };
            match result {
                Ok(receipt) => {
                    log::info!(
                        "Order #{} created for user {}: {} item(s), total {}",
                        receipt.order_id,
                        user_id,
                        receipt.items.len(),
                        receipt.total
                    );
                    bot.send_message(
                        chat_id,
                        format!(
                            "Заказ #{} оформлен ✅\nИтого: {}\nС тобой свяжутся для оплаты и доставки.",
                            receipt.order_id,
                            menu::format_price(Some(receipt.total))
                        ),
                    )
                    .await?;
                    // Fire-and-forget after commit; never reverses the order
                    notifications::notify_admins_new_order(bot, user_id, &receipt).await;
                }
                Err(e @ (StoreError::EmptyCart | StoreError::InsufficientStock { .. })) => {
                    bot.send_message(chat_id, store_error_message(&e)).await?;
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        CallbackAction::MyOrders => menu::show_my_orders(bot, chat_id, db_pool, user_id).await,

        // ── admin surface ───────────────────────────────────────────────────
        CallbackAction::AdminMenu
        | CallbackAction::AdminAddProduct
        | CallbackAction::AdminPickCategory(_)
        | CallbackAction::AdminFinishVariants
        | CallbackAction::AdminCancelWizard
        | CallbackAction::AdminProducts
        | CallbackAction::AdminDeleteProduct(_)
        | CallbackAction::AdminRestock(_)
        | CallbackAction::AdminRestockProduct(_)
        | CallbackAction::AdminOrders
        | CallbackAction::AdminShowOrder(_)
        | CallbackAction::AdminSetStatus { .. } => {
            if !admin::is_admin(user_id) {
                log::warn!("User {} pressed admin button {:?} without access", user_id, action);
                bot.send_message(chat_id, "Недостаточно прав").await?;
                return Ok(());
            }
            dispatch_admin_action(bot, chat_id, user_id, action, deps).await
        }
    }
}

async fn dispatch_admin_action(
    bot: &Bot,
    chat_id: ChatId,
    admin_id: i64,
    action: CallbackAction,
    deps: &HandlerDeps,
) -> Result<(), AppError> {
    let db_pool = Arc::clone(&deps.db_pool);
    match action {
        CallbackAction::AdminMenu => admin::show_admin_menu(bot, chat_id).await,
        CallbackAction::AdminAddProduct => admin::start_add_product(bot, chat_id, &deps.wizards, admin_id).await,
        CallbackAction::AdminPickCategory(category) => {
            admin::wizard_on_category(bot, chat_id, db_pool, &deps.wizards, admin_id, category).await
        }
        CallbackAction::AdminFinishVariants => admin::wizard_finish(bot, chat_id, &deps.wizards, admin_id).await,
        CallbackAction::AdminCancelWizard => admin::wizard_cancel(bot, chat_id, &deps.wizards, admin_id).await,
        CallbackAction::AdminProducts => admin::show_product_admin_list(bot, chat_id, db_pool).await,
        CallbackAction::AdminDeleteProduct(id) => admin::delete_product(bot, chat_id, db_pool, id).await,
        CallbackAction::AdminRestockProduct(id) => admin::show_restock_variants(bot, chat_id, db_pool, id).await,
        CallbackAction::AdminRestock(id) => {
            admin::prompt_restock(bot, chat_id, db_pool, &deps.wizards, admin_id, id).await
        }
        CallbackAction::AdminOrders => admin::show_orders(bot, chat_id, db_pool).await,
        CallbackAction::AdminShowOrder(id) => admin::show_order(bot, chat_id, db_pool, id).await,
        CallbackAction::AdminSetStatus { order_id, status } => {
            admin::set_order_status(bot, chat_id, db_pool, order_id, status).await
        }
        // Buyer actions never reach this function
        _ => Ok(()),
    }
}

/// Log the real error, tell the user something they can act on.
async fn report_error(bot: &Bot, chat_id: ChatId, err: &AppError) {
    log::error!("Handler error in chat {}: {}", chat_id.0, err);
    let text = match err {
        AppError::Store(store_err) => store_error_message(store_err),
        _ => "Что-то пошло не так, попробуй ещё раз 🙏".to_string(),
    };
    let _ = bot.send_message(chat_id, text).await;
}
