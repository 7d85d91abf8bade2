//! Buyer-facing menus: catalog browsing, variant picking, the cart.

use std::sync::Arc;
use strum::IntoEnumIterator;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::error::AppResult;
use crate::storage::catalog::{self, Category, Variant};
use crate::storage::db::{get_connection, DbPool};
use crate::storage::{cart, orders};
use crate::telegram::callback::CallbackAction;

/// Shorthand for a callback button carrying a typed action.
pub(crate) fn btn(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.encode())
}

/// "450 ₽" for priced variants, "—" for unpriced ones.
pub(crate) fn format_price(price: Option<i64>) -> String {
    match price {
        Some(kopecks) => format!("{} ₽", kopecks / 100),
        None => "—".to_string(),
    }
}

/// Greeting plus the top-level buttons. Admins get one extra row.
pub async fn show_main_menu(bot: &Bot, chat_id: ChatId, is_admin: bool) -> AppResult<()> {
    let mut rows = vec![
        vec![btn("🛍 Каталог", CallbackAction::Catalog)],
        vec![btn("🛒 Корзина", CallbackAction::ShowCart)],
        vec![btn("📦 Мои заказы", CallbackAction::MyOrders)],
    ];
    if is_admin {
        rows.push(vec![btn("⚙️ Админка", CallbackAction::AdminMenu)]);
    }
    bot.send_message(chat_id, "Привет! Это магазин Parok 💨\nВыбирай, что нужно:")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Category list.
pub async fn show_categories(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Category::iter()
        .map(|c| vec![btn(c.title(), CallbackAction::ShowCategory(c))])
        .collect();
    rows.push(vec![btn("⬅️ Назад", CallbackAction::MainMenu)]);
    bot.send_message(chat_id, "Каталог:")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Products of one category.
pub async fn show_products(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, category: Category) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let products = catalog::list_by_category(&conn, category)?;
    drop(conn);

    if products.is_empty() {
        bot.send_message(chat_id, "В этой категории пока пусто 🤷")
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![btn(
                "⬅️ Назад",
                CallbackAction::Catalog,
            )]]))
            .await?;
        return Ok(());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| vec![btn(&p.name, CallbackAction::ShowProduct(p.id))])
        .collect();
    rows.push(vec![btn("⬅️ Назад", CallbackAction::Catalog)]);
    bot.send_message(chat_id, category.title())
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

fn variant_button(variant: &Variant) -> InlineKeyboardButton {
    if variant.stock > 0 {
        btn(
            format!(
                "{} — {} ({} шт.)",
                variant.label,
                format_price(variant.price),
                variant.stock
            ),
            CallbackAction::ShowVariant(variant.id),
        )
    } else {
        btn(
            format!("{} — нет в наличии 🔔", variant.label),
            CallbackAction::Waitlist(variant.id),
        )
    }
}

/// One product: description plus a button per flavor. Out-of-stock flavors
/// offer a waitlist subscription instead of a quantity pick.
pub async fn show_product(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, product_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let product = catalog::get_product(&conn, product_id)?;
    let Some(product) = product else {
        bot.send_message(chat_id, "Этот товар больше недоступен 😔").await?;
        return Ok(());
    };
    let variants = catalog::list_variants(&conn, product_id)?;
    drop(conn);

    let mut rows: Vec<Vec<InlineKeyboardButton>> = variants.iter().map(|v| vec![variant_button(v)]).collect();
    rows.push(vec![btn("⬅️ Назад", CallbackAction::ShowCategory(product.category))]);

    let text = if product.description.is_empty() {
        product.name
    } else {
        format!("{}\n\n{}", product.name, product.description)
    };
    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Quantity picker for an in-stock variant.
pub async fn show_variant(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, variant_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let variant = catalog::get_variant(&conn, variant_id)?;
    drop(conn);

    let Some(variant) = variant else {
        bot.send_message(chat_id, "Этот вкус больше недоступен 😔").await?;
        return Ok(());
    };
    if variant.stock == 0 {
        // Stock ran out between menus; offer the waitlist instead
        bot.send_message(chat_id, format!("«{}» закончился. Сообщить, когда появится?", variant.label))
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![btn(
                "🔔 Сообщить",
                CallbackAction::Waitlist(variant.id),
            )]]))
            .await?;
        return Ok(());
    }

    let qty_row: Vec<InlineKeyboardButton> = (1..=variant.stock.min(5))
        .map(|qty| {
            btn(
                format!("{qty} шт."),
                CallbackAction::AddToCart {
                    variant_id: variant.id,
                    qty,
                },
            )
        })
        .collect();
    let rows = vec![
        qty_row,
        vec![btn("⬅️ Назад", CallbackAction::ShowProduct(variant.product_id))],
    ];
    bot.send_message(
        chat_id,
        format!(
            "«{}» — {}\nВ наличии: {} шт.\nСколько добавить в корзину?",
            variant.label,
            format_price(variant.price),
            variant.stock
        ),
    )
    .reply_markup(InlineKeyboardMarkup::new(rows))
    .await?;
    Ok(())
}

/// The cart with per-line remove buttons, clear and checkout.
pub async fn show_cart(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, user_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let lines = cart::list(&conn, user_id)?;
    drop(conn);

    if lines.is_empty() {
        bot.send_message(chat_id, "Корзина пуста 🛒")
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![btn(
                "🛍 В каталог",
                CallbackAction::Catalog,
            )]]))
            .await?;
        return Ok(());
    }

    let mut text = String::from("🛒 Корзина:\n");
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut total = 0;
    for line in &lines {
        text.push_str(&format!(
            "\n• {} «{}» × {} = {}",
            line.product_name,
            line.label,
            line.qty,
            format_price(Some(line.subtotal()))
        ));
        rows.push(vec![btn(
            format!("❌ {} «{}»", line.product_name, line.label),
            CallbackAction::RemoveLine(line.id),
        )]);
        total += line.subtotal();
    }
    text.push_str(&format!("\n\nИтого: {}", format_price(Some(total))));

    rows.push(vec![
        btn("🗑 Очистить", CallbackAction::ClearCart),
        btn("✅ Оформить", CallbackAction::Checkout),
    ]);
    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Buyer's order history.
pub async fn show_my_orders(bot: &Bot, chat_id: ChatId, db_pool: Arc<DbPool>, user_id: i64) -> AppResult<()> {
    let conn = get_connection(&db_pool)?;
    let user_orders = orders::list_for_user(&conn, user_id)?;
    drop(conn);

    if user_orders.is_empty() {
        bot.send_message(chat_id, "Заказов пока нет 📦").await?;
        return Ok(());
    }
    let mut text = String::from("📦 Твои заказы:\n");
    for order in &user_orders {
        text.push_str(&format!(
            "\n#{} — {} ({})",
            order.id,
            status_label(order.status),
            order.created_at
        ));
    }
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Human label for an order status.
pub(crate) fn status_label(status: orders::OrderStatus) -> &'static str {
    match status {
        orders::OrderStatus::New => "🆕 новый",
        orders::OrderStatus::Paid => "💰 оплачен",
        orders::OrderStatus::Done => "✅ выполнен",
        orders::OrderStatus::Cancelled => "🚫 отменён",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(Some(45_000)), "450 ₽");
        assert_eq!(format_price(Some(0)), "0 ₽");
        assert_eq!(format_price(None), "—");
    }
}
