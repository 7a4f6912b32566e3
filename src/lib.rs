//! FlipBot: marketplace item-flipping backtester
//!
//! This is the root crate that provides benchmark and integration-test
//! access to the internal modules. For actual functionality, use the
//! individual crates directly:
//!
//! - `market-core`: Provider record types, timestamp canonicalization,
//!   validation errors
//! - `backtester`: Price store, trade ledger, strategies, simulation
//!   engine, metrics, reports

// Re-export for benchmarks
pub use backtester;
pub use market_core as core;
