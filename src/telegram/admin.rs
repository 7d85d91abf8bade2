//! Admin surface: catalog mutations, restock, order management.
//!
//! Access is gated by the static ADMIN_IDS allow-list; every entry point
//! here must be behind an `is_admin` check in the handler layer.

use std::sync::Arc;
use strum::IntoEnumIterator;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config::admin::ADMIN_IDS;
use crate::core::error::{AppResult, StoreError};
use crate::storage::catalog::{self, Category};
use crate::storage::db::{get_connection, DbPool};
use crate::storage::orders::{self, OrderStatus};
use crate::telegram::callback::CallbackAction;
use crate::telegram::menu::{btn, format_price, status_label};
use crate::telegram::notifications;
use crate::telegram::wizard::{self, AddProduct, WizardState, WizardStore};

/// Check if user is admin
pub fn is_admin(user_id: i64) -> bool {
    ADMIN_IDS.contains(&user_id)
}

/// Top-level admin menu.
pub async fn show_admin_menu(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let rows = vec![
        vec![btn("➕ Добавить товар", CallbackAction::AdminAddProduct)],
        vec![btn("📦 Пополнить остатки", CallbackAction::AdminProducts)],
        vec![btn("📋 Заказы", CallbackAction::AdminOrders)],
        vec![btn("⬅️ Назад", CallbackAction::MainMenu)],
    ];
    bot.send_message(chat_id, "⚙️ Панель администратора")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// All products with restock and delete buttons.
pub async fn show_product_admin_list(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for category in Category::iter() {
        for product in catalog::list_by_category(&conn, category)? {
            rows.push(vec![
                btn(
                    format!("📦 {}", product.name),
                    CallbackAction::AdminRestockProduct(product.id),
                ),
                btn("🗑", CallbackAction::AdminDeleteProduct(product.id)),
            ]);
        }
    }
    drop(conn);

    if rows.is_empty() {
        bot.send_message(chat_id, "Каталог пуст. Добавь первый товар ➕").await?;
        return Ok(());
    }
    rows.push(vec![btn("⬅️ Назад", CallbackAction::AdminMenu)]);
    bot.send_message(chat_id, "Товары (📦 — остатки, 🗑 — удалить):")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Delete a product (cascades to variants) and confirm.
pub async fn delete_product(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, product_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let name = catalog::get_product(&conn, product_id)?.map(|p| p.name);
    match catalog::delete_product(&conn, product_id) {
        Ok(()) => {
            log::info!("Admin deleted product {} ({:?})", product_id, name);
            bot.send_message(chat_id, format!("Товар «{}» удалён 🗑", name.unwrap_or_default()))
                .await?;
        }
        Err(StoreError::NotFound) => {
            bot.send_message(chat_id, "Товар уже удалён").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// A product's variants with their stock, each restockable.
pub async fn show_restock_variants(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, product_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let Some(product) = catalog::get_product(&conn, product_id)? else {
        bot.send_message(chat_id, "Товар уже удалён").await?;
        return Ok(());
    };
    let variants = catalog::list_variants(&conn, product_id)?;
    drop(conn);

    let mut rows: Vec<Vec<InlineKeyboardButton>> = variants
        .iter()
        .map(|v| {
            vec![btn(
                format!("{} — {} шт.", v.label, v.stock),
                CallbackAction::AdminRestock(v.id),
            )]
        })
        .collect();
    rows.push(vec![btn("⬅️ Назад", CallbackAction::AdminProducts)]);
    bot.send_message(chat_id, format!("Остатки «{}»:", product.name))
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Ask for the new absolute stock value; the answer arrives as a text
/// message routed through the wizard state.
pub async fn prompt_restock(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: Arc<DbPool>,
    wizards: &WizardStore,
    admin_id: i64,
    variant_id: i64,
) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let Some(variant) = catalog::get_variant(&conn, variant_id)? else {
        bot.send_message(chat_id, "Этот вкус уже удалён").await?;
        return Ok(());
    };
    drop(conn);

    wizards.set(admin_id, WizardState::AwaitingRestockQty { variant_id });
    bot.send_message(
        chat_id,
        format!(
            "«{}», сейчас {} шт.\nОтправь новое количество (целое число, не дельту):",
            variant.label, variant.stock
        ),
    )
    .await?;
    Ok(())
}

/// Apply a restock. On the 0 -> positive transition, fan the back-in-stock
/// notifications out and clear the waitlist — after the update committed.
pub async fn apply_restock(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: Arc<DbPool>,
    variant_id: i64,
    new_qty: i64,
) -> AppResult<()> {
    let outcome = {
        let mut conn = get_connection(&db_pool)?;
        catalog::restock(&mut conn, variant_id, new_qty)
    };
    match outcome {
        Ok(outcome) => {
            log::info!(
                "Admin restocked variant {}: {} -> {}",
                variant_id,
                outcome.previous,
                outcome.current
            );
            bot.send_message(chat_id, format!("Готово: {} → {} шт. ✅", outcome.previous, outcome.current))
                .await?;
            if outcome.back_in_stock {
                let variant = {
                    let conn = get_connection(&db_pool)?;
                    catalog::get_variant(&conn, variant_id)?
                };
                if let Some(variant) = variant {
                    notifications::notify_waitlist(bot, db_pool, &variant).await;
                }
            }
        }
        Err(StoreError::NotFound) => {
            bot.send_message(chat_id, "Этот вкус уже удалён").await?;
        }
        Err(StoreError::InvalidQuantity) => {
            bot.send_message(chat_id, "Количество не может быть отрицательным").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Recent orders for the admin.
pub async fn show_orders(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let recent = orders::list_recent(&conn, 20)?;
    drop(conn);

    if recent.is_empty() {
        bot.send_message(chat_id, "Заказов пока нет").await?;
        return Ok(());
    }
    let mut rows: Vec<Vec<InlineKeyboardButton>> = recent
        .iter()
        .map(|o| {
            vec![btn(
                format!("#{} — {} — {}", o.id, status_label(o.status), o.created_at),
                CallbackAction::AdminShowOrder(o.id),
            )]
        })
        .collect();
    rows.push(vec![btn("⬅️ Назад", CallbackAction::AdminMenu)]);
    bot.send_message(chat_id, "📋 Последние заказы:")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// One order: snapshot items plus buttons for the allowed transitions.
pub async fn show_order(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, order_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let Some(order) = orders::get_order(&conn, order_id)? else {
        bot.send_message(chat_id, "Заказ не найден").await?;
        return Ok(());
    };
    let items = orders::get_order_items(&conn, order_id)?;
    drop(conn);

    let mut text = format!(
        "Заказ #{} — {}\nПокупатель: {}\nСоздан: {}\n",
        order.id,
        status_label(order.status),
        order.user_id,
        order.created_at
    );
    let mut total = 0;
    for item in &items {
        text.push_str(&format!("\n• {} «{}» × {}", item.name, item.label, item.qty));
        total += item.price.unwrap_or(0) * item.qty;
    }
    text.push_str(&format!("\n\nИтого: {}", format_price(Some(total))));

    let mut status_row = Vec::new();
    for (target, label) in [
        (OrderStatus::Paid, "💰 Оплачен"),
        (OrderStatus::Done, "✅ Выполнен"),
        (OrderStatus::Cancelled, "🚫 Отменить"),
    ] {
        if order.status.can_transition(target) {
            status_row.push(btn(
                label,
                CallbackAction::AdminSetStatus {
                    order_id: order.id,
                    status: target,
                },
            ));
        }
    }
    let mut rows = Vec::new();
    if !status_row.is_empty() {
        rows.push(status_row);
    }
    rows.push(vec![btn("⬅️ Назад", CallbackAction::AdminOrders)]);
    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Admin-triggered order status transition.
pub async fn set_order_status(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: Arc<DbPool>,
    order_id: i64,
    status: OrderStatus,
) -> AppResult<()> {
    let result = {
        let conn = get_connection(&db_pool)?;
        orders::set_status(&conn, order_id, status)
    };
    match result {
        Ok(()) => {
            log::info!("Admin moved order {} to {}", order_id, status);
            show_order(bot, chat_id, db_pool, order_id).await?;
        }
        Err(StoreError::NotFound) => {
            bot.send_message(chat_id, "Заказ не найден").await?;
        }
        Err(StoreError::InvalidTransition { from, to }) => {
            bot.send_message(chat_id, format!("Нельзя перевести заказ из «{from}» в «{to}»"))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

// ── add-product wizard orchestration ─────────────────────────────────────────

/// Start the add-product flow: remember the state, ask for the name.
pub async fn start_add_product(bot: &Bot, chat_id: ChatId, wizards: &WizardStore, admin_id: i64) -> AppResult<()> {
    wizards.set(admin_id, WizardState::AddProduct(AddProduct::AwaitingName));
    bot.send_message(chat_id, "Название товара?")
        .reply_markup(cancel_keyboard())
        .await?;
    Ok(())
}

fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn("🚫 Отмена", CallbackAction::AdminCancelWizard)]])
}

fn category_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Category::iter()
        .map(|c| vec![btn(c.title(), CallbackAction::AdminPickCategory(c))])
        .collect();
    rows.push(vec![btn("🚫 Отмена", CallbackAction::AdminCancelWizard)]);
    InlineKeyboardMarkup::new(rows)
}

/// Text input while a wizard state is active.
pub async fn wizard_on_text(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: Arc<DbPool>,
    wizards: &WizardStore,
    admin_id: i64,
    text: &str,
) -> AppResult<()> {
    let Some(state) = wizards.take(admin_id) else {
        return Ok(());
    };
    match state {
        WizardState::AwaitingRestockQty { variant_id } => match text.trim().parse::<i64>() {
            Ok(qty) if qty >= 0 => {
                apply_restock(bot, chat_id, db_pool, variant_id, qty).await?;
            }
            _ => {
                // Re-prompt, keep waiting
                wizards.set(admin_id, WizardState::AwaitingRestockQty { variant_id });
                bot.send_message(chat_id, "Нужно целое неотрицательное число. Ещё раз:")
                    .await?;
            }
        },
        WizardState::AddProduct(AddProduct::AwaitingVariants { product_id, added }) => {
            match wizard::parse_variant_line(text) {
                Some(input) => {
                    let result = {
                        let conn = get_connection(&db_pool)?;
                        catalog::add_variant(&conn, product_id, &input.label, input.stock, input.price)
                    };
                    match result {
                        Ok(_) => {
                            wizards.set(
                                admin_id,
                                WizardState::AddProduct(AddProduct::AwaitingVariants {
                                    product_id,
                                    added: added + 1,
                                }),
                            );
                            bot.send_message(
                                chat_id,
                                format!("Вкус «{}» добавлен ({} шт.). Ещё один — или жми «Готово».", input.label, input.stock),
                            )
                            .reply_markup(finish_variants_keyboard())
                            .await?;
                        }
                        Err(StoreError::NotFound) => {
                            // Product was deleted mid-wizard; abort the flow
                            bot.send_message(chat_id, "Товар удалили, пока ты добавлял вкусы 🤷").await?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    wizards.set(admin_id, WizardState::AddProduct(AddProduct::AwaitingVariants { product_id, added }));
                    bot.send_message(chat_id, "Формат: «Вкус, остаток» или «Вкус, остаток, цена в рублях». Ещё раз:")
                        .await?;
                }
            }
        }
        WizardState::AddProduct(step) => match step.on_text(text) {
            Ok(AddProduct::AwaitingDescription { name }) => {
                wizards.set(admin_id, WizardState::AddProduct(AddProduct::AwaitingDescription { name }));
                bot.send_message(chat_id, "Описание? (можно пустое — отправь «-»)")
                    .reply_markup(cancel_keyboard())
                    .await?;
            }
            Ok(AddProduct::AwaitingCategory { name, description }) => {
                let description = if description == "-" { String::new() } else { description };
                wizards.set(
                    admin_id,
                    WizardState::AddProduct(AddProduct::AwaitingCategory { name, description }),
                );
                bot.send_message(chat_id, "Категория?")
                    .reply_markup(category_keyboard())
                    .await?;
            }
            Ok(other) => {
                wizards.set(admin_id, WizardState::AddProduct(other));
            }
            Err(same) => {
                wizards.set(admin_id, WizardState::AddProduct(same));
                bot.send_message(chat_id, "Так не пойдёт. Отправь текст ещё раз:").await?;
            }
        },
    }
    Ok(())
}

fn finish_variants_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        btn("✅ Готово", CallbackAction::AdminFinishVariants),
        btn("🚫 Отмена", CallbackAction::AdminCancelWizard),
    ]])
}

/// Category button inside the wizard: creates the product row and moves
/// into the variants loop.
pub async fn wizard_on_category(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: Arc<DbPool>,
    wizards: &WizardStore,
    admin_id: i64,
    category: Category,
) -> AppResult<()> {
    let step = match wizards.take(admin_id) {
        Some(WizardState::AddProduct(step)) => step,
        other => {
            if let Some(state) = other {
                wizards.set(admin_id, state);
            }
            bot.send_message(chat_id, "Эта кнопка уже неактуальна").await?;
            return Ok(());
        }
    };
    let Some((name, description, category)) = step.clone().on_category(category) else {
        wizards.set(admin_id, WizardState::AddProduct(step));
        bot.send_message(chat_id, "Сначала ответь на предыдущий вопрос").await?;
        return Ok(());
    };

    let product_id = {
        let conn = get_connection(&db_pool)?;
        catalog::create_product(&conn, &name, &description, category)?
    };
    log::info!("Admin created product {} «{}» in {}", product_id, name, category);
    wizards.set(
        admin_id,
        WizardState::AddProduct(AddProduct::AwaitingVariants { product_id, added: 0 }),
    );
    bot.send_message(
        chat_id,
        format!(
            "«{}» создан в категории {}.\nТеперь вкусы, по одному в сообщении:\n«Вкус, остаток» или «Вкус, остаток, цена в рублях»",
            name,
            category.title()
        ),
    )
    .reply_markup(finish_variants_keyboard())
    .await?;
    Ok(())
}

/// The «Готово» button: close the variants loop.
pub async fn wizard_finish(bot: &Bot, chat_id: ChatId, wizards: &WizardStore, admin_id: i64) -> AppResult<()> {
    match wizards.take(admin_id) {
        Some(WizardState::AddProduct(AddProduct::AwaitingVariants { added, .. })) if added > 0 => {
            bot.send_message(chat_id, format!("Товар сохранён, вкусов: {} ✅", added))
                .await?;
        }
        Some(WizardState::AddProduct(AddProduct::AwaitingVariants { product_id, .. })) => {
            // No variants entered: keep waiting, an empty product is useless
            wizards.set(
                admin_id,
                WizardState::AddProduct(AddProduct::AwaitingVariants { product_id, added: 0 }),
            );
            bot.send_message(chat_id, "Добавь хотя бы один вкус, иначе товар не показать")
                .await?;
        }
        Some(other) => {
            wizards.set(admin_id, other);
            bot.send_message(chat_id, "Эта кнопка уже неактуальна").await?;
        }
        None => {
            bot.send_message(chat_id, "Эта кнопка уже неактуальна").await?;
        }
    }
    Ok(())
}

/// The «Отмена» button: drop whatever flow is active.
pub async fn wizard_cancel(bot: &Bot, chat_id: ChatId, wizards: &WizardStore, admin_id: i64) -> AppResult<()> {
    if wizards.take(admin_id).is_some() {
        bot.send_message(chat_id, "Отменено").await?;
    }
    show_admin_menu(bot, chat_id).await
}
