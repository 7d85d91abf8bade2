use thiserror::Error;

/// Errors produced by the storage layer (catalog, cart, orders, waitlist).
///
/// Every variant except `Db`/`Pool` maps to a message the buyer or admin can
/// act on; handlers must never show raw `Db`/`Pool` errors to users.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Referenced product/variant/order does not exist (or was deleted)
    #[error("not found")]
    NotFound,

    /// Non-positive or otherwise unusable quantity
    #[error("invalid quantity")]
    InvalidQuantity,

    /// Requested quantity exceeds current stock of a variant
    #[error("insufficient stock for \"{label}\": requested {requested}, available {available}")]
    InsufficientStock {
        label: String,
        requested: i64,
        available: i64,
    },

    /// Checkout attempted with no cart lines
    #[error("cart is empty")]
    EmptyCart,

    /// Order status transition not allowed by the state machine
    #[error("invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// SQLite errors
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Centralized error type for the application
///
/// All errors in the application are converted to this enum for consistent
/// error handling. Uses `thiserror` for automatic conversion and display.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage layer errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Db(err))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Store(StoreError::Pool(err))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
