//! Simulated trade ledger with fee-aware profit accounting.
//!
//! Entry and exit fees are computed from each leg's own notional and
//! are never netted against each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Opens a long position.
    Buy,
    /// Opens a short position.
    Sell,
}

/// Lifecycle state of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    Closed,
    Cancelled,
}

/// A simulated position, open or closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    /// Unique, monotonically increasing id within one run.
    pub id: u64,
    /// Item identifier.
    pub item_id: String,
    /// Human-readable item name.
    pub item_name: String,
    /// Buy opens long, Sell opens short.
    pub direction: TradeDirection,
    /// Price the position was opened at.
    pub entry_price: Decimal,
    /// Units held (the engine fixes this at 1).
    pub quantity: u32,
    /// When the position was opened.
    pub entry_time: DateTime<Utc>,
    pub status: TradeStatus,
    /// Fee charged on the entry leg.
    pub entry_fee: Decimal,
    /// Price the position was closed at, once closed.
    pub close_price: Option<Decimal>,
    /// When the position was closed, once closed.
    pub close_time: Option<DateTime<Utc>>,
    /// Realized profit net of both fees. `None` while open.
    pub profit: Option<Decimal>,
    /// Why the position was closed.
    pub close_reason: Option<String>,
}

impl SimulatedTrade {
    /// Open a new position.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: u64,
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        direction: TradeDirection,
        entry_price: Decimal,
        quantity: u32,
        entry_time: DateTime<Utc>,
        entry_fee: Decimal,
    ) -> Self {
        Self {
            id,
            item_id: item_id.into(),
            item_name: item_name.into(),
            direction,
            entry_price,
            quantity,
            entry_time,
            status: TradeStatus::Open,
            entry_fee,
            close_price: None,
            close_time: None,
            profit: None,
            close_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    fn quantity_dec(&self) -> Decimal {
        Decimal::from(self.quantity)
    }

    /// Total cash required to open: entry notional plus entry fee.
    pub fn entry_cost(&self) -> Decimal {
        self.entry_price * self.quantity_dec() + self.entry_fee
    }

    /// Unrealized return in percent at the given price, signed by
    /// direction (a falling price is a gain for a short).
    pub fn unrealized_profit_pct(&self, current_price: Decimal) -> Decimal {
        if self.entry_price == Decimal::ZERO {
            return Decimal::ZERO;
        }
        let change = (current_price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED;
        match self.direction {
            TradeDirection::Buy => change,
            TradeDirection::Sell => -change,
        }
    }

    /// Value this position contributes to equity at the given price.
    /// Longs add the notional; shorts subtract the liability.
    pub fn mark_to_market(&self, current_price: Decimal) -> Decimal {
        let notional = current_price * self.quantity_dec();
        match self.direction {
            TradeDirection::Buy => notional,
            TradeDirection::Sell => -notional,
        }
    }

    /// Close the position, realizing profit net of both fee legs.
    pub fn close(
        &mut self,
        price: Decimal,
        time: DateTime<Utc>,
        exit_fee: Decimal,
        reason: impl Into<String>,
    ) {
        let exit_notional = price * self.quantity_dec();
        let entry_notional = self.entry_price * self.quantity_dec();
        let profit = match self.direction {
            TradeDirection::Buy => exit_notional - (entry_notional + self.entry_fee) - exit_fee,
            TradeDirection::Sell => (entry_notional - self.entry_fee) - exit_notional - exit_fee,
        };

        self.status = TradeStatus::Closed;
        self.close_price = Some(price);
        self.close_time = Some(time);
        self.profit = Some(profit);
        self.close_reason = Some(reason.into());
    }
}
