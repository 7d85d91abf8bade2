//! Per-user cart: pending selections before checkout.
//!
//! The cart is soft state. Nothing is reserved while lines sit here; the
//! stock check on `add` is advisory and the checkout transaction is the
//! only authority.

use rusqlite::{params, Connection};

use crate::core::error::StoreError;
use crate::storage::catalog;

/// A cart line joined with display data for presentation.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub label: String,
    pub qty: i64,
    pub price: Option<i64>,
}

impl CartLine {
    /// Line subtotal in kopecks; unpriced variants count as 0.
    pub fn subtotal(&self) -> i64 {
        self.price.unwrap_or(0) * self.qty
    }
}

/// Add `qty` of a variant to the user's cart.
///
/// At most one line exists per (user, variant): adding the same variant
/// again sums the quantities. Rejects quantities that exceed the variant's
/// current stock, but stock may still drop before checkout.
pub fn add(conn: &Connection, user_id: i64, variant_id: i64, qty: i64) -> Result<(), StoreError> {
    if qty <= 0 {
        return Err(StoreError::InvalidQuantity);
    }
    let variant = catalog::get_variant(conn, variant_id)?.ok_or(StoreError::NotFound)?;
    if qty > variant.stock {
        return Err(StoreError::InsufficientStock {
            label: variant.label,
            requested: qty,
            available: variant.stock,
        });
    }
    conn.execute(
        "INSERT INTO cart_lines (user_id, variant_id, qty) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, variant_id) DO UPDATE SET qty = qty + excluded.qty",
        params![user_id, variant_id, qty],
    )?;
    Ok(())
}

/// Remove one line from the user's cart. No error if it is already gone.
pub fn remove(conn: &Connection, user_id: i64, line_id: i64) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM cart_lines WHERE id = ?1 AND user_id = ?2",
        params![line_id, user_id],
    )?;
    Ok(())
}

/// Drop all of the user's cart lines. Idempotent.
pub fn clear(conn: &Connection, user_id: i64) -> Result<(), StoreError> {
    conn.execute("DELETE FROM cart_lines WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

/// The user's cart with resolved display data, in insertion order.
pub fn list(conn: &Connection, user_id: i64) -> Result<Vec<CartLine>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.variant_id, p.name, v.label, c.qty, v.price
         FROM cart_lines c
         JOIN variants v ON v.id = c.variant_id
         JOIN products p ON p.id = v.product_id
         WHERE c.user_id = ?1
         ORDER BY c.id",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(CartLine {
            id: row.get(0)?,
            variant_id: row.get(1)?,
            product_name: row.get(2)?,
            label: row.get(3)?,
            qty: row.get(4)?,
            price: row.get(5)?,
        })
    })?;
    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::catalog::{add_variant, create_product, Category};
    use crate::storage::test_conn;
    use pretty_assertions::assert_eq;

    fn seed(conn: &Connection) -> i64 {
        let pid = create_product(conn, "Husky", "жидкость", Category::Liquids).unwrap();
        add_variant(conn, pid, "Mint", 10, Some(35000)).unwrap()
    }

    #[test]
    fn add_merges_repeated_lines() {
        let conn = test_conn();
        let vid = seed(&conn);
        add(&conn, 100, vid, 2).unwrap();
        add(&conn, 100, vid, 3).unwrap();

        let lines = list(&conn, 100).unwrap();
        assert_eq!(lines.len(), 1, "same (user, variant) must stay one line");
        assert_eq!(lines[0].qty, 5);
        assert_eq!(lines[0].product_name, "Husky");
        assert_eq!(lines[0].subtotal(), 175_000);
    }

    #[test]
    fn add_checks_quantity_and_stock_softly() {
        let conn = test_conn();
        let vid = seed(&conn);
        assert!(matches!(add(&conn, 100, vid, 0), Err(StoreError::InvalidQuantity)));
        assert!(matches!(add(&conn, 100, vid, -2), Err(StoreError::InvalidQuantity)));
        assert!(matches!(
            add(&conn, 100, vid, 11),
            Err(StoreError::InsufficientStock { .. })
        ));
        assert!(matches!(add(&conn, 100, 999, 1), Err(StoreError::NotFound)));
    }

    #[test]
    fn carts_are_per_user() {
        let conn = test_conn();
        let vid = seed(&conn);
        add(&conn, 100, vid, 2).unwrap();
        add(&conn, 200, vid, 4).unwrap();

        assert_eq!(list(&conn, 100).unwrap()[0].qty, 2);
        assert_eq!(list(&conn, 200).unwrap()[0].qty, 4);
    }

    #[test]
    fn remove_and_clear_are_idempotent() {
        let conn = test_conn();
        let vid = seed(&conn);
        add(&conn, 100, vid, 2).unwrap();
        let line_id = list(&conn, 100).unwrap()[0].id;

        remove(&conn, 100, line_id).unwrap();
        remove(&conn, 100, line_id).unwrap();
        assert!(list(&conn, 100).unwrap().is_empty());

        clear(&conn, 100).unwrap();
        clear(&conn, 100).unwrap();
    }

    #[test]
    fn remove_ignores_other_users_lines() {
        let conn = test_conn();
        let vid = seed(&conn);
        add(&conn, 100, vid, 2).unwrap();
        let line_id = list(&conn, 100).unwrap()[0].id;

        remove(&conn, 200, line_id).unwrap();
        assert_eq!(list(&conn, 100).unwrap().len(), 1);
    }
}
