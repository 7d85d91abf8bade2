//! Checkout engine and order store.
//!
//! Checkout is the one place where the cart, the inventory and the order
//! log meet, and it runs as a single IMMEDIATE transaction: either every
//! line's stock is decremented, the order with its item snapshots exists
//! and the cart is empty, or nothing happened at all.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use strum::{Display, EnumString};

use crate::core::error::StoreError;
use crate::storage::{cart, catalog};

/// Order lifecycle: `new -> paid -> done`, cancellable until done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    New,
    Paid,
    Done,
    Cancelled,
}

impl OrderStatus {
    /// Whether the admin may move an order from `self` to `to`.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::New, OrderStatus::Paid)
                | (OrderStatus::Paid, OrderStatus::Done)
                | (OrderStatus::New, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
        )
    }
}

/// An order row. Items are stored separately as snapshots.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub created_at: String,
    pub status: OrderStatus,
}

/// An immutable snapshot of one cart line at checkout time.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub variant_id: i64,
    pub name: String,
    pub label: String,
    pub qty: i64,
    pub price: Option<i64>,
}

/// What a successful checkout returns to the handler.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub items: Vec<OrderItem>,
    /// Sum of qty * price over all items, in kopecks (unpriced items count 0)
    pub total: i64,
}

fn parse_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(3)?;
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
        status: status.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
    })
}

/// Convert the user's cart into an order, atomically.
///
/// Inside one IMMEDIATE transaction: read the cart, decrement every line's
/// stock, insert the order with item snapshots, delete the cart lines,
/// commit. Any `InsufficientStock` aborts the whole transaction and the
/// cart is left intact so the buyer can adjust and retry. Emptying the
/// cart inside the same transaction is the double-press defense: a second
/// checkout finds no lines and fails with `EmptyCart`.
///
/// The caller notifies admins AFTER this returns; no network send ever
/// happens while the transaction is open.
pub fn checkout(conn: &mut Connection, user_id: i64) -> Result<CheckoutReceipt, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let lines = cart::list(&tx, user_id)?;
    if lines.is_empty() {
        return Err(StoreError::EmptyCart);
    }

    // Dropping `tx` on any error below rolls every decrement back.
    for line in &lines {
        catalog::decrement(&tx, line.variant_id, line.qty)?;
    }

    let created_at = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO orders (user_id, created_at, status) VALUES (?1, ?2, ?3)",
        params![user_id, created_at, OrderStatus::New.to_string()],
    )?;
    let order_id = tx.last_insert_rowid();

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        tx.execute(
            "INSERT INTO order_items (order_id, variant_id, name_snapshot, label_snapshot, qty, price_snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![order_id, line.variant_id, line.product_name, line.label, line.qty, line.price],
        )?;
        items.push(OrderItem {
            variant_id: line.variant_id,
            name: line.product_name.clone(),
            label: line.label.clone(),
            qty: line.qty,
            price: line.price,
        });
    }

    tx.execute("DELETE FROM cart_lines WHERE user_id = ?1", params![user_id])?;
    tx.commit()?;

    let total = items.iter().map(|i| i.price.unwrap_or(0) * i.qty).sum();
    Ok(CheckoutReceipt { order_id, items, total })
}

pub fn get_order(conn: &Connection, order_id: i64) -> Result<Option<Order>, StoreError> {
    conn.query_row(
        "SELECT id, user_id, created_at, status FROM orders WHERE id = ?1",
        params![order_id],
        parse_order,
    )
    .optional()
    .map_err(StoreError::Db)
}

/// The snapshot items of an order, in insertion order.
pub fn get_order_items(conn: &Connection, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT variant_id, name_snapshot, label_snapshot, qty, price_snapshot
         FROM order_items WHERE order_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![order_id], |row| {
        Ok(OrderItem {
            variant_id: row.get(0)?,
            name: row.get(1)?,
            label: row.get(2)?,
            qty: row.get(3)?,
            price: row.get(4)?,
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Most recent orders first, for the admin view.
pub fn list_recent(conn: &Connection, limit: i64) -> Result<Vec<Order>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, created_at, status FROM orders ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], parse_order)?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// A buyer's own orders, most recent first.
pub fn list_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Order>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, created_at, status FROM orders WHERE user_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], parse_order)?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Admin-triggered status transition, validated against the state machine.
///
/// The UPDATE is keyed on the status the transition was validated against,
/// so a write based on a stale view of the order changes nothing. Of two
/// concurrent transitions out of the same state exactly one lands; the
/// other gets `InvalidTransition` with the status that beat it.
pub fn set_status(conn: &Connection, order_id: i64, to: OrderStatus) -> Result<(), StoreError> {
    let from = get_order(conn, order_id)?.ok_or(StoreError::NotFound)?.status;
    if !from.can_transition(to) {
        return Err(StoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    let changed = conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to.to_string(), order_id, from.to_string()],
    )?;
    if changed == 0 {
        let current = get_order(conn, order_id)?.ok_or(StoreError::NotFound)?.status;
        return Err(StoreError::InvalidTransition {
            from: current.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::catalog::{add_variant, create_product, get_variant, Category};
    use crate::storage::test_conn;
    use pretty_assertions::assert_eq;

    fn seed_variant(conn: &Connection, stock: i64, price: Option<i64>) -> i64 {
        let pid = create_product(conn, "ElfBar", "одноразка", Category::Disposables).unwrap();
        add_variant(conn, pid, "Watermelon", stock, price).unwrap()
    }

    // ── checkout ────────────────────────────────────────────────────────────

    #[test]
    fn checkout_creates_order_and_empties_cart() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 5, Some(45000));
        cart::add(&conn, 100, vid, 2).unwrap();

        let receipt = checkout(&mut conn, 100).unwrap();
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].qty, 2);
        assert_eq!(receipt.total, 90_000);

        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 3);
        assert!(cart::list(&conn, 100).unwrap().is_empty());

        let order = get_order(&conn, receipt.order_id).unwrap().unwrap();
        assert_eq!(order.user_id, 100);
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(get_order_items(&conn, receipt.order_id).unwrap().len(), 1);
    }

    #[test]
    fn checkout_of_empty_cart_fails_without_side_effects() {
        let mut conn = test_conn();
        assert!(matches!(checkout(&mut conn, 100), Err(StoreError::EmptyCart)));
        assert!(list_for_user(&conn, 100).unwrap().is_empty());
    }

    #[test]
    fn second_checkout_sees_empty_cart() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 5, None);
        cart::add(&conn, 100, vid, 2).unwrap();

        checkout(&mut conn, 100).unwrap();
        // The duplicate button press: cart already emptied at the commit point
        assert!(matches!(checkout(&mut conn, 100), Err(StoreError::EmptyCart)));
        assert_eq!(list_for_user(&conn, 100).unwrap().len(), 1);
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 3);
    }

    #[test]
    fn partial_failure_rolls_back_every_decrement() {
        let mut conn = test_conn();
        let pid = create_product(&conn, "Husky", "жидкость", Category::Liquids).unwrap();
        let a = add_variant(&conn, pid, "A", 5, None).unwrap();
        let b = add_variant(&conn, pid, "B", 1, None).unwrap();
        cart::add(&conn, 100, a, 3).unwrap();
        // Bypass the soft check: stock drops after the line was added
        cart::add(&conn, 100, b, 1).unwrap();
        conn.execute("UPDATE cart_lines SET qty = 2 WHERE variant_id = ?1", params![b])
            .unwrap();

        let err = checkout(&mut conn, 100).unwrap_err();
        match err {
            StoreError::InsufficientStock { label, .. } => assert_eq!(label, "B"),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // A's decrement was rolled back, the cart is intact, no order exists
        assert_eq!(get_variant(&conn, a).unwrap().unwrap().stock, 5);
        assert_eq!(get_variant(&conn, b).unwrap().unwrap().stock, 1);
        assert_eq!(cart::list(&conn, 100).unwrap().len(), 2);
        assert!(list_for_user(&conn, 100).unwrap().is_empty());
    }

    #[test]
    fn two_buyers_race_for_the_last_units() {
        // Watermelon stock=3, both buyers want 2; second checkout must lose.
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 3, None);
        cart::add(&conn, 1, vid, 2).unwrap();
        cart::add(&conn, 2, vid, 2).unwrap();

        checkout(&mut conn, 1).unwrap();
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 1);

        let err = checkout(&mut conn, 2).unwrap_err();
        match err {
            StoreError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // B keeps the line to adjust and retry; stock unchanged
        assert_eq!(cart::list(&conn, 2).unwrap().len(), 1);
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 1);
    }

    #[test]
    fn order_snapshots_survive_product_deletion() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 5, Some(45000));
        let pid = get_variant(&conn, vid).unwrap().unwrap().product_id;
        cart::add(&conn, 100, vid, 1).unwrap();
        let receipt = checkout(&mut conn, 100).unwrap();

        crate::storage::catalog::delete_product(&conn, pid).unwrap();

        let items = get_order_items(&conn, receipt.order_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "ElfBar");
        assert_eq!(items[0].label, "Watermelon");
    }

    // ── status machine ──────────────────────────────────────────────────────

    #[test]
    fn status_machine_allows_the_documented_paths() {
        assert!(OrderStatus::New.can_transition(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition(OrderStatus::Done));
        assert!(OrderStatus::New.can_transition(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition(OrderStatus::Cancelled));

        assert!(!OrderStatus::New.can_transition(OrderStatus::Done));
        assert!(!OrderStatus::Done.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition(OrderStatus::Paid));
        assert!(!OrderStatus::Done.can_transition(OrderStatus::New));
    }

    #[test]
    fn set_status_enforces_the_machine() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 5, None);
        cart::add(&conn, 100, vid, 1).unwrap();
        let receipt = checkout(&mut conn, 100).unwrap();
        let id = receipt.order_id;

        set_status(&conn, id, OrderStatus::Paid).unwrap();
        assert!(matches!(
            set_status(&conn, id, OrderStatus::New),
            Err(StoreError::InvalidTransition { .. })
        ));
        set_status(&conn, id, OrderStatus::Done).unwrap();
        assert!(matches!(
            set_status(&conn, id, OrderStatus::Cancelled),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            set_status(&conn, 999, OrderStatus::Paid),
            Err(StoreError::NotFound)
        ));
    }
}
