//! Typed callback routing.
//!
//! Every inline button carries an encoded `CallbackAction`; handlers match
//! on the enum instead of scattering string-prefix checks. The wire form is
//! a compact `tag:arg[:arg]` token (Telegram caps callback data at 64 bytes).

use crate::storage::catalog::Category;
use crate::storage::orders::OrderStatus;

/// Everything a button press can mean, buyer and admin surfaces alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Back to the main menu
    MainMenu,
    /// Show the category list
    Catalog,
    /// Show products of a category
    ShowCategory(Category),
    /// Show a product's variants
    ShowProduct(i64),
    /// Show one variant with quantity buttons (or a waitlist offer)
    ShowVariant(i64),
    /// Add `qty` of a variant to the cart
    AddToCart { variant_id: i64, qty: i64 },
    /// Subscribe to the variant's waitlist
    Waitlist(i64),
    /// Show the cart
    ShowCart,
    /// Remove one cart line
    RemoveLine(i64),
    /// Drop the whole cart
    ClearCart,
    /// Convert the cart into an order
    Checkout,
    /// Buyer's order history
    MyOrders,

    // Admin surface
    AdminMenu,
    AdminAddProduct,
    /// Category pick inside the add-product wizard
    AdminPickCategory(Category),
    /// Finish entering variants
    AdminFinishVariants,
    AdminCancelWizard,
    /// List products for deletion
    AdminProducts,
    AdminDeleteProduct(i64),
    /// Ask for a new absolute stock value of a variant
    AdminRestock(i64),
    /// Pick which product's variants to restock
    AdminRestockProduct(i64),
    AdminOrders,
    AdminShowOrder(i64),
    AdminSetStatus { order_id: i64, status: OrderStatus },
}

impl CallbackAction {
    /// Serialize for `InlineKeyboardButton::callback`.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::MainMenu => "menu".to_string(),
            CallbackAction::Catalog => "cat".to_string(),
            CallbackAction::ShowCategory(c) => format!("cat:{c}"),
            CallbackAction::ShowProduct(id) => format!("prod:{id}"),
            CallbackAction::ShowVariant(id) => format!("var:{id}"),
            CallbackAction::AddToCart { variant_id, qty } => format!("add:{variant_id}:{qty}"),
            CallbackAction::Waitlist(id) => format!("wait:{id}"),
            CallbackAction::ShowCart => "cart".to_string(),
            CallbackAction::RemoveLine(id) => format!("rm:{id}"),
            CallbackAction::ClearCart => "clear".to_string(),
            CallbackAction::Checkout => "co".to_string(),
            CallbackAction::MyOrders => "orders".to_string(),
            CallbackAction::AdminMenu => "adm".to_string(),
            CallbackAction::AdminAddProduct => "adm:add".to_string(),
            CallbackAction::AdminPickCategory(c) => format!("adm:cat:{c}"),
            CallbackAction::AdminFinishVariants => "adm:done".to_string(),
            CallbackAction::AdminCancelWizard => "adm:cancel".to_string(),
            CallbackAction::AdminProducts => "adm:prods".to_string(),
            CallbackAction::AdminDeleteProduct(id) => format!("adm:del:{id}"),
            CallbackAction::AdminRestock(id) => format!("adm:rs:{id}"),
            CallbackAction::AdminRestockProduct(id) => format!("adm:rsp:{id}"),
            CallbackAction::AdminOrders => "adm:orders".to_string(),
            CallbackAction::AdminShowOrder(id) => format!("adm:ord:{id}"),
            CallbackAction::AdminSetStatus { order_id, status } => format!("adm:st:{order_id}:{status}"),
        }
    }

    /// Parse callback data back into an action. `None` for unknown or
    /// malformed tokens (stale buttons from an old bot version).
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        match parts.as_slice() {
            ["menu"] => Some(CallbackAction::MainMenu),
            ["cat"] => Some(CallbackAction::Catalog),
            ["cat", c] => c.parse().ok().map(CallbackAction::ShowCategory),
            ["prod", id] => id.parse().ok().map(CallbackAction::ShowProduct),
            ["var", id] => id.parse().ok().map(CallbackAction::ShowVariant),
            ["add", id, qty] => Some(CallbackAction::AddToCart {
                variant_id: id.parse().ok()?,
                qty: qty.parse().ok()?,
            }),
            ["wait", id] => id.parse().ok().map(CallbackAction::Waitlist),
            ["cart"] => Some(CallbackAction::ShowCart),
            ["rm", id] => id.parse().ok().map(CallbackAction::RemoveLine),
            ["clear"] => Some(CallbackAction::ClearCart),
            ["co"] => Some(CallbackAction::Checkout),
            ["orders"] => Some(CallbackAction::MyOrders),
            ["adm"] => Some(CallbackAction::AdminMenu),
            ["adm", "add"] => Some(CallbackAction::AdminAddProduct),
            ["adm", "cat", c] => c.parse().ok().map(CallbackAction::AdminPickCategory),
            ["adm", "done"] => Some(CallbackAction::AdminFinishVariants),
            ["adm", "cancel"] => Some(CallbackAction::AdminCancelWizard),
            ["adm", "prods"] => Some(CallbackAction::AdminProducts),
            ["adm", "del", id] => id.parse().ok().map(CallbackAction::AdminDeleteProduct),
            ["adm", "rs", id] => id.parse().ok().map(CallbackAction::AdminRestock),
            ["adm", "rsp", id] => id.parse().ok().map(CallbackAction::AdminRestockProduct),
            ["adm", "orders"] => Some(CallbackAction::AdminOrders),
            ["adm", "ord", id] => id.parse().ok().map(CallbackAction::AdminShowOrder),
            ["adm", "st", id, status] => Some(CallbackAction::AdminSetStatus {
                order_id: id.parse().ok()?,
                status: status.parse().ok()?,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_action_round_trips() {
        let actions = [
            CallbackAction::MainMenu,
            CallbackAction::Catalog,
            CallbackAction::ShowCategory(Category::Liquids),
            CallbackAction::ShowProduct(17),
            CallbackAction::ShowVariant(3),
            CallbackAction::AddToCart { variant_id: 3, qty: 2 },
            CallbackAction::Waitlist(3),
            CallbackAction::ShowCart,
            CallbackAction::RemoveLine(8),
            CallbackAction::ClearCart,
            CallbackAction::Checkout,
            CallbackAction::MyOrders,
            CallbackAction::AdminMenu,
            CallbackAction::AdminAddProduct,
            CallbackAction::AdminPickCategory(Category::Disposables),
            CallbackAction::AdminFinishVariants,
            CallbackAction::AdminCancelWizard,
            CallbackAction::AdminProducts,
            CallbackAction::AdminDeleteProduct(17),
            CallbackAction::AdminRestock(3),
            CallbackAction::AdminRestockProduct(17),
            CallbackAction::AdminOrders,
            CallbackAction::AdminShowOrder(7),
            CallbackAction::AdminSetStatus {
                order_id: 7,
                status: OrderStatus::Paid,
            },
        ];
        for action in actions {
            let encoded = action.encode();
            assert!(encoded.len() <= 64, "{encoded} exceeds Telegram's 64-byte cap");
            assert_eq!(CallbackAction::parse(&encoded), Some(action), "token {encoded}");
        }
    }

    #[test]
    fn malformed_tokens_parse_to_none() {
        for data in ["", "nope", "prod:", "prod:abc", "add:3", "adm:st:7:teleported", "cat:coffee"] {
            assert_eq!(CallbackAction::parse(data), None, "token {data:?}");
        }
    }
}
