//! In-memory price series storage for backtest runs.
//!
//! The store is populated once before a run and is never mutated while
//! a run reads it, so any number of independent backtests may share it
//! concurrently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use market_core::{RawPriceRecord, Result};

/// A single immutable price observation for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Item identifier.
    pub item_id: String,
    /// Human-readable item name.
    pub item_name: String,
    /// Observation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Observed price (always positive past the loading boundary).
    pub price: Decimal,
    /// Units traded during the period.
    pub volume: u64,
    /// Period low, if known.
    pub min_price: Option<Decimal>,
    /// Period high, if known.
    pub max_price: Option<Decimal>,
    /// Period average, if known.
    pub avg_price: Option<Decimal>,
}

impl PricePoint {
    /// Create a point with no volume or period stats.
    pub fn new(
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
            timestamp,
            price,
            volume: 0,
            min_price: None,
            max_price: None,
            avg_price: None,
        }
    }

    /// Set the traded volume.
    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    /// Set period low/high/average stats.
    pub fn with_period_stats(mut self, min: Decimal, max: Decimal, avg: Decimal) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self.avg_price = Some(avg);
        self
    }
}

/// Ordered price history for a single item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalDataSet {
    /// Item identifier.
    pub item_id: String,
    /// Human-readable item name.
    pub item_name: String,
    points: Vec<PricePoint>,
    first_timestamp: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl HistoricalDataSet {
    pub fn new(item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
            points: Vec::new(),
            first_timestamp: None,
            last_timestamp: None,
        }
    }

    /// Append an observation and widen the tracked window.
    ///
    /// Duplicate timestamps are legal and preserved; call [`sort`]
    /// after out-of-order bulk loads.
    ///
    /// [`sort`]: HistoricalDataSet::sort
    pub fn add(&mut self, point: PricePoint) {
        match self.first_timestamp {
            Some(first) if first <= point.timestamp => {}
            _ => self.first_timestamp = Some(point.timestamp),
        }
        match self.last_timestamp {
            Some(last) if last >= point.timestamp => {}
            _ => self.last_timestamp = Some(point.timestamp),
        }
        self.points.push(point);
    }

    /// Restore ascending timestamp order. Stable, so duplicates keep
    /// their insertion order.
    pub fn sort(&mut self) {
        self.points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.first_timestamp
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }
}

/// Parameters for the synthetic price generator: a bounded random walk
/// with mean reversion toward `base_price` and Poisson-like volumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Price the walk reverts toward.
    pub base_price: Decimal,
    /// Number of points to generate.
    pub points: usize,
    /// Epoch seconds of the first observation.
    pub start_epoch: i64,
    /// Seconds between observations.
    pub interval_secs: i64,
    /// Proportional per-step noise bound (e.g. 0.02 for +/-2%).
    pub volatility: f64,
    /// Fraction of the gap to base price recovered each step.
    pub reversion: f64,
    /// Mean of the Poisson-like volume distribution.
    pub mean_volume: f64,
    /// RNG seed; identical seeds reproduce identical series.
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn new(base_price: Decimal) -> Self {
        Self {
            base_price,
            points: 500,
            start_epoch: 1_700_000_000,
            interval_secs: 3600,
            volatility: 0.02,
            reversion: 0.05,
            mean_volume: 8.0,
            seed: 42,
        }
    }
}

/// Price histories for every tracked item.
///
/// Keyed by a `BTreeMap` so item iteration order is fixed: within a
/// timestamp, ties across items always resolve in item-id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalDataStore {
    items: BTreeMap<String, HistoricalDataSet>,
}

impl HistoricalDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single observation to its item's series.
    pub fn add_point(&mut self, point: PricePoint) {
        self.items
            .entry(point.item_id.clone())
            .or_insert_with(|| HistoricalDataSet::new(&point.item_id, &point.item_name))
            .add(point);
    }

    /// Load validated provider records for one item, converting
    /// timestamps to canonical form and sorting the series.
    pub fn load_records(
        &mut self,
        item_id: &str,
        item_name: &str,
        records: &[RawPriceRecord],
    ) -> Result<usize> {
        for record in records {
            let timestamp = record.validate(item_id)?;
            let mut point = PricePoint::new(item_id, item_name, timestamp, record.price)
                .with_volume(record.volume.unwrap_or(0));
            point.min_price = record.min;
            point.max_price = record.max;
            point.avg_price = record.avg;
            self.add_point(point);
        }
        if let Some(set) = self.items.get_mut(item_id) {
            set.sort();
        }
        debug!(item = item_id, count = records.len(), "loaded price records");
        Ok(records.len())
    }

    /// Generate a synthetic series for one item. Returns the number of
    /// points produced.
    pub fn generate_synthetic(
        &mut self,
        item_id: &str,
        item_name: &str,
        config: &SyntheticConfig,
    ) -> usize {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let base = decimal_to_f64(config.base_price);
        let floor = base * 0.01;
        let mut price = base;

        for i in 0..config.points {
            let shock: f64 = rng.gen_range(-config.volatility..=config.volatility);
            price += price * shock;
            price += (base - price) * config.reversion;
            if price < floor {
                price = floor;
            }

            let epoch = config.start_epoch + i as i64 * config.interval_secs;
            let timestamp = DateTime::from_timestamp(epoch, 0).unwrap_or_default();
            let quote = Decimal::from_f64(price).unwrap_or(config.base_price).round_dp(2);
            let spread = (quote * Decimal::new(1, 2)).round_dp(2);

            let point = PricePoint::new(item_id, item_name, timestamp, quote)
                .with_volume(poisson(&mut rng, config.mean_volume))
                .with_period_stats(quote - spread, quote + spread, quote);
            self.add_point(point);
        }

        if let Some(set) = self.items.get_mut(item_id) {
            set.sort();
        }
        debug!(item = item_id, count = config.points, "generated synthetic series");
        config.points
    }

    pub fn get(&self, item_id: &str) -> Option<&HistoricalDataSet> {
        self.items.get(item_id)
    }

    /// Item series in fixed (item-id) order.
    pub fn items(&self) -> impl Iterator<Item = &HistoricalDataSet> {
        self.items.values()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total observations across all items.
    pub fn total_points(&self) -> usize {
        self.items.values().map(HistoricalDataSet::len).sum()
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

/// Knuth's Poisson sampler; adequate for the small lambdas used for
/// per-period volume counts.
fn poisson(rng: &mut StdRng, lambda: f64) -> u64 {
    if lambda <= 0.0 {
        return 0;
    }
    let limit = (-lambda).exp();
    let mut k = 0u64;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= limit {
            return k - 1;
        }
    }
}
