//! Deterministic backtesting engine for marketplace flipping
//! strategies.
//!
//! Feed the [`HistoricalDataStore`] with provider records or synthetic
//! series, hand a [`Strategy`] to the [`BacktestEngine`], and get an
//! immutable [`BacktestResults`] back. Identical inputs always produce
//! identical results.
//!
//! ```no_run
//! use backtester::{
//!     BacktestEngine, HistoricalDataStore, SimulatorConfig, SyntheticConfig,
//!     ThresholdReversionStrategy,
//! };
//! use rust_decimal::Decimal;
//!
//! let mut store = HistoricalDataStore::new();
//! store.generate_synthetic(
//!     "abyssal_whip",
//!     "Abyssal whip",
//!     &SyntheticConfig::new(Decimal::new(1_500_000, 0)),
//! );
//!
//! let engine = BacktestEngine::new(store, SimulatorConfig::default());
//! let results = engine
//!     .run(&ThresholdReversionStrategy::default(), None, 5)
//!     .unwrap();
//! println!("ROI: {:.2}%", results.roi_pct);
//! ```

pub mod data_store;
pub mod ledger;
pub mod metrics;
pub mod report;
pub mod simulator;
pub mod strategy;

pub use data_store::{HistoricalDataSet, HistoricalDataStore, PricePoint, SyntheticConfig};
pub use ledger::{SimulatedTrade, TradeDirection, TradeStatus};
pub use report::summary_table;
pub use simulator::{
    BacktestEngine, BacktestError, BacktestResults, SimulatorConfig,
};
pub use strategy::{
    CloseDecision, Evaluation, MeanReversionStrategy, MomentumStrategy, Strategy, StrategyAction,
    ThresholdReversionStrategy,
};
