//! Catalog and inventory store: products and their flavor variants.
//!
//! Stock lives on variants; products carry the category tag. All mutations
//! that touch stock are single guarded statements, so a decrement can never
//! be partially applied and stock can never go below zero.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use strum::{Display, EnumIter, EnumString};

use crate::core::error::StoreError;

/// Fixed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Liquids,
    Devices,
    Pods,
    Disposables,
}

impl Category {
    /// Menu title shown to buyers.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Liquids => "💧 Жидкости",
            Category::Devices => "🔋 Устройства",
            Category::Pods => "📦 Картриджи",
            Category::Disposables => "💨 Одноразки",
        }
    }
}

/// A product row from the database.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: Category,
}

/// A flavor variant row. The unit that actually carries stock.
#[derive(Debug, Clone)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub label: String,
    pub stock: i64,
    /// Unit price in kopecks; None when the admin has not priced it yet
    pub price: Option<i64>,
}

/// What a restock did to the variant's stock level.
#[derive(Debug, Clone, Copy)]
pub struct RestockOutcome {
    pub previous: i64,
    pub current: i64,
    /// True on the 0 -> positive transition; the caller must then notify
    /// and clear the waitlist for this variant
    pub back_in_stock: bool,
}

fn parse_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    let category: String = row.get(3)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: category.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
    })
}

fn parse_variant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Variant> {
    Ok(Variant {
        id: row.get(0)?,
        product_id: row.get(1)?,
        label: row.get(2)?,
        stock: row.get(3)?,
        price: row.get(4)?,
    })
}

/// Create a product. Returns the new product id.
pub fn create_product(
    conn: &Connection,
    name: &str,
    description: &str,
    category: Category,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO products (name, description, category) VALUES (?1, ?2, ?3)",
        params![name, description, category.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Add a flavor variant to a product. Returns the new variant id.
pub fn add_variant(
    conn: &Connection,
    product_id: i64,
    label: &str,
    stock: i64,
    price: Option<i64>,
) -> Result<i64, StoreError> {
    if stock < 0 {
        return Err(StoreError::InvalidQuantity);
    }
    if get_product(conn, product_id)?.is_none() {
        return Err(StoreError::NotFound);
    }
    conn.execute(
        "INSERT INTO variants (product_id, label, stock, price) VALUES (?1, ?2, ?3, ?4)",
        params![product_id, label, stock, price],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rename a product.
pub fn rename_product(conn: &Connection, product_id: i64, name: &str) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE products SET name = ?1 WHERE id = ?2",
        params![name, product_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Delete a product. Cascades to its variants (and their cart/waitlist rows).
/// Order history is untouched: order items are snapshots, not references.
pub fn delete_product(conn: &Connection, product_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM products WHERE id = ?1", params![product_id])?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Delete a single variant.
pub fn delete_variant(conn: &Connection, variant_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM variants WHERE id = ?1", params![variant_id])?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Products in a category, ordered by name.
pub fn list_by_category(conn: &Connection, category: Category) -> Result<Vec<Product>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, category FROM products WHERE category = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![category.to_string()], parse_product)?;
    let mut products = Vec::new();
    for row in rows {
        products.push(row?);
    }
    Ok(products)
}

/// All variants of a product, ordered by label.
pub fn list_variants(conn: &Connection, product_id: i64) -> Result<Vec<Variant>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, product_id, label, stock, price FROM variants WHERE product_id = ?1 ORDER BY label",
    )?;
    let rows = stmt.query_map(params![product_id], parse_variant)?;
    let mut variants = Vec::new();
    for row in rows {
        variants.push(row?);
    }
    Ok(variants)
}

pub fn get_product(conn: &Connection, product_id: i64) -> Result<Option<Product>, StoreError> {
    conn.query_row(
        "SELECT id, name, description, category FROM products WHERE id = ?1",
        params![product_id],
        parse_product,
    )
    .optional()
    .map_err(StoreError::Db)
}

pub fn get_variant(conn: &Connection, variant_id: i64) -> Result<Option<Variant>, StoreError> {
    conn.query_row(
        "SELECT id, product_id, label, stock, price FROM variants WHERE id = ?1",
        params![variant_id],
        parse_variant,
    )
    .optional()
    .map_err(StoreError::Db)
}

/// Set a variant's stock to an absolute value (not a delta).
///
/// Returns what changed; `back_in_stock` tells the caller it must fire the
/// waitlist notification for this variant and then clear it.
///
/// The read of the previous value and the write run in one IMMEDIATE
/// transaction, so of two concurrent restocks of a sold-out variant exactly
/// one observes the 0 -> positive transition and triggers the waitlist.
pub fn restock(conn: &mut Connection, variant_id: i64, new_qty: i64) -> Result<RestockOutcome, StoreError> {
    if new_qty < 0 {
        return Err(StoreError::InvalidQuantity);
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let previous = get_variant(&tx, variant_id)?
        .ok_or(StoreError::NotFound)?
        .stock;
    tx.execute(
        "UPDATE variants SET stock = ?1 WHERE id = ?2",
        params![new_qty, variant_id],
    )?;
    tx.commit()?;
    Ok(RestockOutcome {
        previous,
        current: new_qty,
        back_in_stock: previous == 0 && new_qty > 0,
    })
}

/// Reduce a variant's stock by `qty` in one atomic step.
///
/// The guard `stock >= qty` sits in the UPDATE itself: there is no
/// read-then-write window for concurrent checkouts to race through.
pub fn decrement(conn: &Connection, variant_id: i64, qty: i64) -> Result<(), StoreError> {
    if qty <= 0 {
        return Err(StoreError::InvalidQuantity);
    }
    let changed = conn.execute(
        "UPDATE variants SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
        params![qty, variant_id],
    )?;
    if changed == 0 {
        // Zero rows: either the variant is gone or there is not enough stock.
        let variant = get_variant(conn, variant_id)?.ok_or(StoreError::NotFound)?;
        return Err(StoreError::InsufficientStock {
            label: variant.label,
            requested: qty,
            available: variant.stock,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_conn;
    use pretty_assertions::assert_eq;

    fn seed_variant(conn: &Connection, stock: i64) -> i64 {
        let pid = create_product(conn, "ElfBar", "одноразка", Category::Disposables).unwrap();
        add_variant(conn, pid, "Watermelon", stock, Some(45000)).unwrap()
    }

    // ── products / variants ─────────────────────────────────────────────────

    #[test]
    fn create_and_list_by_category() {
        let conn = test_conn();
        create_product(&conn, "Husky", "жидкость", Category::Liquids).unwrap();
        create_product(&conn, "ElfBar", "одноразка", Category::Disposables).unwrap();

        let liquids = list_by_category(&conn, Category::Liquids).unwrap();
        assert_eq!(liquids.len(), 1);
        assert_eq!(liquids[0].name, "Husky");
        assert_eq!(liquids[0].category, Category::Liquids);
        assert!(list_by_category(&conn, Category::Pods).unwrap().is_empty());
    }

    #[test]
    fn add_variant_rejects_missing_product_and_negative_stock() {
        let conn = test_conn();
        assert!(matches!(
            add_variant(&conn, 999, "Mint", 5, None),
            Err(StoreError::NotFound)
        ));
        let pid = create_product(&conn, "Husky", "", Category::Liquids).unwrap();
        assert!(matches!(
            add_variant(&conn, pid, "Mint", -1, None),
            Err(StoreError::InvalidQuantity)
        ));
    }

    #[test]
    fn delete_product_cascades_to_variants() {
        let conn = test_conn();
        let vid = seed_variant(&conn, 3);
        let pid = get_variant(&conn, vid).unwrap().unwrap().product_id;

        delete_product(&conn, pid).unwrap();
        assert!(get_variant(&conn, vid).unwrap().is_none());
        assert!(matches!(delete_product(&conn, pid), Err(StoreError::NotFound)));
    }

    #[test]
    fn rename_and_delete_single_variant() {
        let conn = test_conn();
        let vid = seed_variant(&conn, 3);
        let pid = get_variant(&conn, vid).unwrap().unwrap().product_id;

        rename_product(&conn, pid, "ElfBar BC5000").unwrap();
        assert_eq!(get_product(&conn, pid).unwrap().unwrap().name, "ElfBar BC5000");
        assert!(matches!(rename_product(&conn, 999, "x"), Err(StoreError::NotFound)));

        delete_variant(&conn, vid).unwrap();
        assert!(get_variant(&conn, vid).unwrap().is_none());
        // The product itself stays
        assert!(get_product(&conn, pid).unwrap().is_some());
        assert!(matches!(delete_variant(&conn, vid), Err(StoreError::NotFound)));
    }

    // ── restock ─────────────────────────────────────────────────────────────

    #[test]
    fn restock_sets_absolute_value() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 7);
        let outcome = restock(&mut conn, vid, 2).unwrap();
        assert_eq!(outcome.previous, 7);
        assert_eq!(outcome.current, 2);
        assert!(!outcome.back_in_stock);
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 2);
    }

    #[test]
    fn restock_reports_zero_to_positive_transition() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 0);
        assert!(restock(&mut conn, vid, 5).unwrap().back_in_stock);
        // Already positive: not a transition
        assert!(!restock(&mut conn, vid, 9).unwrap().back_in_stock);
        // To zero: not a transition either
        assert!(!restock(&mut conn, vid, 0).unwrap().back_in_stock);
    }

    #[test]
    fn restock_rejects_negative_and_missing() {
        let mut conn = test_conn();
        let vid = seed_variant(&conn, 1);
        assert!(matches!(restock(&mut conn, vid, -3), Err(StoreError::InvalidQuantity)));
        assert!(matches!(restock(&mut conn, 999, 3), Err(StoreError::NotFound)));
    }

    // ── decrement ───────────────────────────────────────────────────────────

    #[test]
    fn decrement_reduces_stock() {
        let conn = test_conn();
        let vid = seed_variant(&conn, 5);
        decrement(&conn, vid, 3).unwrap();
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 2);
    }

    #[test]
    fn decrement_never_goes_negative() {
        let conn = test_conn();
        let vid = seed_variant(&conn, 2);
        let err = decrement(&conn, vid, 3).unwrap_err();
        match err {
            StoreError::InsufficientStock {
                label,
                requested,
                available,
            } => {
                assert_eq!(label, "Watermelon");
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // Rejected in full, not partially applied
        assert_eq!(get_variant(&conn, vid).unwrap().unwrap().stock, 2);
    }

    #[test]
    fn decrement_distinguishes_missing_variant() {
        let conn = test_conn();
        assert!(matches!(decrement(&conn, 42, 1), Err(StoreError::NotFound)));
        let vid = seed_variant(&conn, 5);
        assert!(matches!(decrement(&conn, vid, 0), Err(StoreError::InvalidQuantity)));
    }
}
