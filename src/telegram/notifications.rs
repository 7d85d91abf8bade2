//! Outbound notifications: new-order alerts for admins and back-in-stock
//! pings for the waitlist.
//!
//! Everything here runs AFTER the relevant database commit and is
//! best-effort: a failed or slow send is logged and dropped, it never
//! fails or reverses the state change that triggered it.

use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::timeout;

use crate::core::config;
use crate::storage::catalog::Variant;
use crate::storage::db::{get_connection, DbPool};
use crate::storage::orders::CheckoutReceipt;
use crate::storage::waitlist;
use crate::telegram::menu::format_price;

/// One bounded, logged, never-propagated send.
async fn send_best_effort(bot: &Bot, recipient: i64, text: &str) -> bool {
    match timeout(config::notify::send_timeout(), bot.send_message(ChatId(recipient), text)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            log::error!("Failed to notify {}: {}", recipient, e);
            false
        }
        Err(_) => {
            log::error!(
                "Notification to {} timed out after {}s",
                recipient,
                config::notify::SEND_TIMEOUT_SECS
            );
            false
        }
    }
}

/// Tell every allow-listed admin about a freshly committed order.
pub async fn notify_admins_new_order(bot: &Bot, buyer_id: i64, receipt: &CheckoutReceipt) {
    let admins = &*config::admin::ADMIN_IDS;
    if admins.is_empty() {
        log::warn!("ADMIN_IDS is empty, order #{} notification not sent", receipt.order_id);
        return;
    }

    let mut text = format!("🆕 Заказ #{} от пользователя {}:\n", receipt.order_id, buyer_id);
    for item in &receipt.items {
        text.push_str(&format!("\n• {} «{}» × {}", item.name, item.label, item.qty));
    }
    text.push_str(&format!("\n\nИтого: {}", format_price(Some(receipt.total))));

    for &admin_id in admins {
        if send_best_effort(bot, admin_id, &text).await {
            log::info!("Order #{} notification sent to admin {}", receipt.order_id, admin_id);
        }
    }
}

/// Ping everyone waiting on a restocked variant, then clear the waitlist.
///
/// At-most-once semantics: the entries are deleted regardless of delivery
/// success, so an unreachable user is not retried on the next restock.
pub async fn notify_waitlist(bot: &Bot, db_pool: Arc<DbPool>, variant: &Variant) {
    let subscribers = {
        let conn = match get_connection(&db_pool) {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Failed to get DB connection for waitlist of variant {}: {}", variant.id, e);
                return;
            }
        };
        match waitlist::subscribers(&conn, variant.id) {
            Ok(users) => users,
            Err(e) => {
                log::error!("Failed to read waitlist for variant {}: {}", variant.id, e);
                return;
            }
        }
    };

    if subscribers.is_empty() {
        return;
    }
    log::info!(
        "Variant {} («{}») back in stock, notifying {} subscriber(s)",
        variant.id,
        variant.label,
        subscribers.len()
    );

    let text = format!("🔔 «{}» снова в наличии! Успей заказать 💨", variant.label);
    for user_id in subscribers {
        send_best_effort(bot, user_id, &text).await;
    }

    match get_connection(&db_pool) {
        Ok(conn) => {
            if let Err(e) = waitlist::clear(&conn, variant.id) {
                log::error!("Failed to clear waitlist for variant {}: {}", variant.id, e);
            }
        }
        Err(e) => log::error!("Failed to get DB connection to clear waitlist: {}", e),
    }
}
