use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PosError {
    #[error("Insufficient stock for {item}: required {required} {unit}, available {available} {unit}")]
    InsufficientStock {
        item: String,
        required: f64,
        available: f64,
        unit: String,
    },

    #[error("Payment of {paid:.2} exceeds the open balance of {balance:.2} by {overage:.2}")]
    PaymentExceedsBalance {
        paid: f64,
        balance: f64,
        overage: f64,
    },

    #[error("Payment of {paid:.2} is below the required {required:.2}")]
    PaymentBelowRequired { paid: f64, required: f64 },

    #[error("Invalid transfer: {0}")]
    InvalidTransferSelection(String),

    #[error("Nothing to revert: {0}")]
    RevertTargetNotFound(String),

    #[error("Category {category} still has {products} product(s)")]
    CategoryInUse { category: String, products: usize },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table {0} has an open bill or is occupied")]
    TableInUse(String),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order item not found or already paid: {0}")]
    ItemNotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Ingredient not found: {0}")]
    IngredientNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Front ends receive the message, the same way the command layer hands back `String` errors.
impl Serialize for PosError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type PosResult<T> = Result<T, PosError>;
