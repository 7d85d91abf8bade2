//! Multi-step admin flows as explicit tagged states.
//!
//! Each in-flight flow is an enum value keyed by the admin's user id; every
//! text message the admin sends while a state is active is validated against
//! that state and either advances it or re-prompts. Losing this map on
//! restart loses only an unfinished prompt, never committed data.

use dashmap::DashMap;

use crate::storage::catalog::Category;

/// Steps of the "add product" flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddProduct {
    AwaitingName,
    AwaitingDescription { name: String },
    AwaitingCategory { name: String, description: String },
    /// Product row exists; each further message adds a flavor line
    AwaitingVariants { product_id: i64, added: usize },
}

/// All wizard states an admin can be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    AddProduct(AddProduct),
    /// Waiting for the new absolute stock value of a variant
    AwaitingRestockQty { variant_id: i64 },
}

/// In-process store of per-admin wizard state.
#[derive(Default)]
pub struct WizardStore {
    states: DashMap<i64, WizardState>,
}

impl WizardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: i64, state: WizardState) {
        self.states.insert(user_id, state);
    }

    pub fn get(&self, user_id: i64) -> Option<WizardState> {
        self.states.get(&user_id).map(|s| s.clone())
    }

    /// Remove and return the state; used when a flow finishes or aborts.
    pub fn take(&self, user_id: i64) -> Option<WizardState> {
        self.states.remove(&user_id).map(|(_, s)| s)
    }

    pub fn is_active(&self, user_id: i64) -> bool {
        self.states.contains_key(&user_id)
    }
}

/// One parsed flavor line of the add-product wizard:
/// `"Вкус, остаток"` or `"Вкус, остаток, цена-в-рублях"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInput {
    pub label: String,
    pub stock: i64,
    /// Kopecks
    pub price: Option<i64>,
}

/// Parse a flavor line. `None` means re-prompt the admin; nothing was stored.
pub fn parse_variant_line(text: &str) -> Option<VariantInput> {
    let mut parts = text.split(',').map(str::trim);
    let label = parts.next().filter(|s| !s.is_empty())?.to_string();
    let stock: i64 = parts.next()?.parse().ok()?;
    if stock < 0 {
        return None;
    }
    let price = match parts.next() {
        Some(raw) => {
            let rub: i64 = raw.parse().ok()?;
            if rub < 0 {
                return None;
            }
            Some(rub * 100)
        }
        None => None,
    };
    // Trailing garbage means the admin mistyped; better to re-prompt
    if parts.next().is_some() {
        return None;
    }
    Some(VariantInput { label, stock, price })
}

impl AddProduct {
    /// Advance the flow with the admin's message. Category is picked via a
    /// button, not text, so `AwaitingCategory` does not accept input here.
    pub fn on_text(self, text: &str) -> Result<AddProduct, AddProduct> {
        let text = text.trim();
        match self {
            AddProduct::AwaitingName => {
                if text.is_empty() {
                    Err(AddProduct::AwaitingName)
                } else {
                    Ok(AddProduct::AwaitingDescription { name: text.to_string() })
                }
            }
            AddProduct::AwaitingDescription { name } => Ok(AddProduct::AwaitingCategory {
                name,
                description: text.to_string(),
            }),
            state @ AddProduct::AwaitingCategory { .. } => Err(state),
            state @ AddProduct::AwaitingVariants { .. } => Err(state),
        }
    }

    /// The category button press that turns collected fields into a row.
    pub fn on_category(self, category: Category) -> Option<(String, String, Category)> {
        match self {
            AddProduct::AwaitingCategory { name, description } => Some((name, description, category)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── variant line parsing ────────────────────────────────────────────────

    #[test]
    fn parses_label_stock_and_optional_price() {
        assert_eq!(
            parse_variant_line("Watermelon, 10"),
            Some(VariantInput {
                label: "Watermelon".to_string(),
                stock: 10,
                price: None,
            })
        );
        assert_eq!(
            parse_variant_line("Кислая клубника , 3, 450"),
            Some(VariantInput {
                label: "Кислая клубника".to_string(),
                stock: 3,
                price: Some(45_000),
            })
        );
    }

    #[test]
    fn rejects_bad_variant_lines() {
        for line in ["", "Watermelon", "Watermelon, -1", ", 5", "Mint, x", "Mint, 5, -450", "Mint, 5, 450, extra"] {
            assert_eq!(parse_variant_line(line), None, "line {line:?}");
        }
    }

    // ── add-product transitions ─────────────────────────────────────────────

    #[test]
    fn name_then_description_then_category() {
        let s = AddProduct::AwaitingName;
        let s = s.on_text("ElfBar BC5000").unwrap();
        let s = s.on_text("одноразка, 5000 тяг").unwrap();
        let (name, description, category) = s.on_category(Category::Disposables).unwrap();
        assert_eq!(name, "ElfBar BC5000");
        assert_eq!(description, "одноразка, 5000 тяг");
        assert_eq!(category, Category::Disposables);
    }

    #[test]
    fn empty_name_reprompts_without_advancing() {
        let s = AddProduct::AwaitingName;
        let s = s.on_text("   ").unwrap_err();
        assert_eq!(s, AddProduct::AwaitingName);
    }

    #[test]
    fn category_state_ignores_text_and_early_category_is_rejected() {
        let s = AddProduct::AwaitingCategory {
            name: "x".to_string(),
            description: String::new(),
        };
        assert!(s.clone().on_text("liquids").is_err());
        assert!(AddProduct::AwaitingName.on_category(Category::Liquids).is_none());
    }

    // ── store ───────────────────────────────────────────────────────────────

    #[test]
    fn store_set_get_take() {
        let store = WizardStore::new();
        assert!(!store.is_active(1));
        store.set(1, WizardState::AwaitingRestockQty { variant_id: 9 });
        assert!(store.is_active(1));
        assert_eq!(store.get(1), Some(WizardState::AwaitingRestockQty { variant_id: 9 }));
        assert_eq!(store.take(1), Some(WizardState::AwaitingRestockQty { variant_id: 9 }));
        assert!(store.take(1).is_none());
    }
}
