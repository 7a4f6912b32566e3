//! Error types for the marketplace toolkit.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unparseable timestamp: {0}")]
    Timestamp(String),

    #[error("invalid price {price} for item {item_id}: prices must be positive")]
    InvalidPrice { item_id: String, price: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record error: {0}")]
    Record(String),
}

pub type Result<T> = std::result::Result<T, Error>;
