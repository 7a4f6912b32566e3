//! Market Core Library
//!
//! Shared domain types and the data-loading boundary for the item
//! marketplace backtesting toolkit. Raw provider records are validated
//! and canonicalized here; the engine crates downstream assume clean,
//! well-formed inputs.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{RawPriceRecord, RawTimestamp};
