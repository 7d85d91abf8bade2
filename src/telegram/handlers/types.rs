//! Handler dependencies and shared helpers

use std::sync::Arc;

use crate::core::error::StoreError;
use crate::storage::db::DbPool;
use crate::telegram::wizard::WizardStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub wizards: Arc<WizardStore>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            wizards: Arc::new(WizardStore::new()),
        }
    }
}

/// What the buyer/admin sees for a given store error. Raw internals stay
/// in the logs; users get something they can act on.
pub fn store_error_message(err: &StoreError) -> String {
    match err {
        StoreError::NotFound => "Этого товара больше нет 😔".to_string(),
        StoreError::InvalidQuantity => "Количество должно быть положительным числом".to_string(),
        StoreError::InsufficientStock {
            label,
            requested,
            available,
        } => format!(
            "Недостаточно на складе: «{label}» — запрошено {requested}, осталось {available}"
        ),
        StoreError::EmptyCart => "Корзина пуста 🛒".to_string(),
        StoreError::InvalidTransition { .. } => "Этот статус уже нельзя изменить".to_string(),
        StoreError::Db(_) | StoreError::Pool(_) => "Что-то пошло не так, попробуй ещё раз 🙏".to_string(),
    }
}
