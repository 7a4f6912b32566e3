//! Raw price records as delivered by historical-data providers.
//!
//! Providers are inconsistent about timestamps: some emit ISO-8601
//! strings, others Unix epoch numbers (integer or fractional seconds).
//! Everything is canonicalized to `DateTime<Utc>` at this boundary so
//! the engine never sees a malformed record.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A provider timestamp in either of its wire encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Unix epoch seconds, possibly fractional.
    Epoch(f64),
    /// ISO-8601 / RFC 3339 string.
    Iso(String),
}

impl RawTimestamp {
    /// Convert to the canonical UTC timestamp.
    ///
    /// Accepts RFC 3339 (`2024-01-01T12:00:00Z`), offset-less ISO
    /// strings (`2024-01-01T12:00:00`, `2024-01-01 12:00:00`, treated
    /// as UTC), and epoch seconds.
    pub fn canonicalize(&self) -> Result<DateTime<Utc>> {
        match self {
            RawTimestamp::Epoch(secs) => {
                if !secs.is_finite() {
                    return Err(Error::Timestamp(secs.to_string()));
                }
                let whole = secs.trunc() as i64;
                let nanos = ((secs - secs.trunc()) * 1_000_000_000.0).round() as u32;
                DateTime::from_timestamp(whole, nanos)
                    .ok_or_else(|| Error::Timestamp(secs.to_string()))
            }
            RawTimestamp::Iso(s) => parse_iso(s),
        }
    }
}

fn parse_iso(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(Error::Timestamp(s.to_string()))
}

/// A single raw price observation from a provider feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceRecord {
    /// Observation timestamp (ISO string or epoch number).
    pub timestamp: RawTimestamp,
    /// Traded price.
    pub price: Decimal,
    /// Units traded during the period.
    #[serde(default)]
    pub volume: Option<u64>,
    /// Period low, if the provider reports it.
    #[serde(default)]
    pub min: Option<Decimal>,
    /// Period high, if the provider reports it.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// Period average, if the provider reports it.
    #[serde(default)]
    pub avg: Option<Decimal>,
}

impl RawPriceRecord {
    /// Create a record with an epoch timestamp and no period stats.
    pub fn new(timestamp: RawTimestamp, price: Decimal) -> Self {
        Self {
            timestamp,
            price,
            volume: None,
            min: None,
            max: None,
            avg: None,
        }
    }

    /// Validate the record against loading-boundary rules and return
    /// the canonical timestamp.
    ///
    /// `item_id` is only used to produce a useful error message.
    pub fn validate(&self, item_id: &str) -> Result<DateTime<Utc>> {
        if self.price <= Decimal::ZERO {
            return Err(Error::InvalidPrice {
                item_id: item_id.to_string(),
                price: self.price.to_string(),
            });
        }
        self.timestamp.canonicalize()
    }
}
