//! Pluggable trading strategies for the backtest engine.
//!
//! Strategies are pure decision functions: they never touch the
//! engine's balance or ledger directly, only return an [`Evaluation`]
//! or [`CloseDecision`] for the engine to act on.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data_store::PricePoint;
use crate::ledger::{SimulatedTrade, TradeDirection};

/// What a strategy wants the engine to do at the current observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyAction {
    /// Open a long position.
    Buy,
    /// Open a short position.
    Sell,
    /// Do nothing.
    Hold,
}

/// An entry decision together with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub action: StrategyAction,
    /// Price to open at; `None` for holds.
    pub price: Option<Decimal>,
    /// Human-readable rationale, surfaced in logs.
    pub reason: String,
}

impl Evaluation {
    pub fn buy(price: Decimal, reason: impl Into<String>) -> Self {
        Self {
            action: StrategyAction::Buy,
            price: Some(price),
            reason: reason.into(),
        }
    }

    pub fn sell(price: Decimal, reason: impl Into<String>) -> Self {
        Self {
            action: StrategyAction::Sell,
            price: Some(price),
            reason: reason.into(),
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: StrategyAction::Hold,
            price: None,
            reason: reason.into(),
        }
    }
}

/// An exit decision for one open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseDecision {
    pub close: bool,
    pub reason: String,
}

impl CloseDecision {
    pub fn keep() -> Self {
        Self {
            close: false,
            reason: String::new(),
        }
    }

    pub fn close(reason: impl Into<String>) -> Self {
        Self {
            close: true,
            reason: reason.into(),
        }
    }
}

/// A pluggable trading strategy.
///
/// `history` passed to [`evaluate`] contains every observation for the
/// same item strictly before `current`, in timestamp order. Strategies
/// may hold private configuration but must be stateless with respect
/// to the engine.
///
/// [`evaluate`]: Strategy::evaluate
pub trait Strategy: Send + Sync {
    /// Display name used in results and logs.
    fn name(&self) -> &str;

    /// Numeric parameters for reporting.
    fn parameters(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Decide whether to enter a position at `current`.
    fn evaluate(
        &self,
        current: &PricePoint,
        history: &[PricePoint],
        open_positions: &[SimulatedTrade],
        balance: Decimal,
    ) -> Evaluation;

    /// Decide whether an open position should be closed at `current`.
    ///
    /// The default never closes. Implementations must ignore positions
    /// of a direction they do not trade.
    fn should_close_position(
        &self,
        _position: &SimulatedTrade,
        _current: &PricePoint,
    ) -> CloseDecision {
        CloseDecision::keep()
    }
}

/// Whether `balance` covers one unit at `price` plus the entry fee.
fn affordable(balance: Decimal, price: Decimal, fee_rate: Decimal) -> bool {
    balance >= price * (Decimal::ONE + fee_rate)
}

/// Shared profit-target / stop-loss exit for the long-only reference
/// strategies. The profit target is checked first.
fn profit_stop_close(
    position: &SimulatedTrade,
    current: &PricePoint,
    min_profit_pct: Decimal,
    max_loss_pct: Decimal,
) -> CloseDecision {
    if position.direction != TradeDirection::Buy {
        return CloseDecision::keep();
    }
    let pct = position.unrealized_profit_pct(current.price);
    if pct >= min_profit_pct {
        return CloseDecision::close(format!(
            "profit target reached: {:.2}% >= {}%",
            pct, min_profit_pct
        ));
    }
    if pct <= -max_loss_pct {
        return CloseDecision::close(format!(
            "stop-loss triggered: {:.2}% <= -{}%",
            pct, max_loss_pct
        ));
    }
    CloseDecision::keep()
}

fn mean_price(window: &[PricePoint]) -> Decimal {
    if window.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = window.iter().map(|p| p.price).sum();
    sum / Decimal::from(window.len() as u64)
}

// ---------------------------------------------------------------------------
// Threshold reversion
// ---------------------------------------------------------------------------

/// Parameters for [`ThresholdReversionStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdReversionConfig {
    /// Observations to average over.
    pub lookback_periods: usize,
    /// Minimum discount below the average, in percent, to buy.
    pub buy_threshold_pct: Decimal,
    /// Unrealized profit percent that triggers an exit.
    pub min_profit_pct: Decimal,
    /// Unrealized loss percent that triggers a stop.
    pub max_loss_pct: Decimal,
    /// Fee rate used for the affordability check; keep in sync with
    /// the engine configuration.
    pub fee_rate: Decimal,
}

impl Default for ThresholdReversionConfig {
    fn default() -> Self {
        Self {
            lookback_periods: 10,
            buy_threshold_pct: Decimal::new(5, 0),
            min_profit_pct: Decimal::new(5, 0),
            max_loss_pct: Decimal::new(10, 0),
            fee_rate: Decimal::new(5, 2),
        }
    }
}

/// Buys when the price dips a configured percentage below its recent
/// average; exits on a profit target or stop-loss. Long-only.
#[derive(Debug, Clone, Default)]
pub struct ThresholdReversionStrategy {
    config: ThresholdReversionConfig,
}

impl ThresholdReversionStrategy {
    pub fn new(config: ThresholdReversionConfig) -> Self {
        Self { config }
    }
}

impl Strategy for ThresholdReversionStrategy {
    fn name(&self) -> &str {
        "Threshold Reversion"
    }

    fn parameters(&self) -> HashMap<String, String> {
        HashMap::from([
            ("lookback_periods".to_string(), self.config.lookback_periods.to_string()),
            ("buy_threshold_pct".to_string(), self.config.buy_threshold_pct.to_string()),
            ("min_profit_pct".to_string(), self.config.min_profit_pct.to_string()),
            ("max_loss_pct".to_string(), self.config.max_loss_pct.to_string()),
        ])
    }

    fn evaluate(
        &self,
        current: &PricePoint,
        history: &[PricePoint],
        _open_positions: &[SimulatedTrade],
        balance: Decimal,
    ) -> Evaluation {
        if history.len() < self.config.lookback_periods {
            return Evaluation::hold("insufficient history");
        }
        let window = &history[history.len() - self.config.lookback_periods..];
        let avg = mean_price(window);
        if avg <= Decimal::ZERO {
            return Evaluation::hold("no usable average");
        }

        let discount_pct = (avg - current.price) / avg * Decimal::ONE_HUNDRED;
        if discount_pct < self.config.buy_threshold_pct {
            return Evaluation::hold("no entry signal");
        }
        if !affordable(balance, current.price, self.config.fee_rate) {
            return Evaluation::hold("insufficient balance");
        }

        Evaluation::buy(
            current.price,
            format!(
                "price {} is {:.2}% below average {:.2}",
                current.price, discount_pct, avg
            ),
        )
    }

    fn should_close_position(
        &self,
        position: &SimulatedTrade,
        current: &PricePoint,
    ) -> CloseDecision {
        profit_stop_close(
            position,
            current,
            self.config.min_profit_pct,
            self.config.max_loss_pct,
        )
    }
}

// ---------------------------------------------------------------------------
// Momentum
// ---------------------------------------------------------------------------

/// Parameters for [`MomentumStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// How far back to measure the price change.
    pub momentum_periods: usize,
    /// Minimum percent change over the window to buy.
    pub momentum_threshold_pct: Decimal,
    pub min_profit_pct: Decimal,
    pub max_loss_pct: Decimal,
    pub fee_rate: Decimal,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            momentum_periods: 5,
            momentum_threshold_pct: Decimal::new(3, 0),
            min_profit_pct: Decimal::new(5, 0),
            max_loss_pct: Decimal::new(8, 0),
            fee_rate: Decimal::new(5, 2),
        }
    }
}

/// Buys into sustained upward moves; exits on a profit target or
/// stop-loss. Long-only.
#[derive(Debug, Clone, Default)]
pub struct MomentumStrategy {
    config: MomentumConfig,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "Momentum"
    }

    fn parameters(&self) -> HashMap<String, String> {
        HashMap::from([
            ("momentum_periods".to_string(), self.config.momentum_periods.to_string()),
            (
                "momentum_threshold_pct".to_string(),
                self.config.momentum_threshold_pct.to_string(),
            ),
            ("min_profit_pct".to_string(), self.config.min_profit_pct.to_string()),
            ("max_loss_pct".to_string(), self.config.max_loss_pct.to_string()),
        ])
    }

    fn evaluate(
        &self,
        current: &PricePoint,
        history: &[PricePoint],
        _open_positions: &[SimulatedTrade],
        balance: Decimal,
    ) -> Evaluation {
        if history.len() < self.config.momentum_periods {
            return Evaluation::hold("insufficient history");
        }
        let reference = &history[history.len() - self.config.momentum_periods];
        if reference.price <= Decimal::ZERO {
            return Evaluation::hold("no usable reference price");
        }

        let change_pct =
            (current.price - reference.price) / reference.price * Decimal::ONE_HUNDRED;
        if change_pct < self.config.momentum_threshold_pct {
            return Evaluation::hold("no entry signal");
        }
        if !affordable(balance, current.price, self.config.fee_rate) {
            return Evaluation::hold("insufficient balance");
        }

        Evaluation::buy(
            current.price,
            format!(
                "momentum {:.2}% over {} periods",
                change_pct, self.config.momentum_periods
            ),
        )
    }

    fn should_close_position(
        &self,
        position: &SimulatedTrade,
        current: &PricePoint,
    ) -> CloseDecision {
        profit_stop_close(
            position,
            current,
            self.config.min_profit_pct,
            self.config.max_loss_pct,
        )
    }
}

// ---------------------------------------------------------------------------
// Mean reversion (z-score)
// ---------------------------------------------------------------------------

/// Parameters for [`MeanReversionStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    /// Observations to compute the mean and deviation over.
    pub lookback_periods: usize,
    /// Buy when the z-score is at or below the negated threshold.
    pub std_threshold: f64,
    pub min_profit_pct: Decimal,
    pub max_loss_pct: Decimal,
    pub fee_rate: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            lookback_periods: 20,
            std_threshold: 2.0,
            min_profit_pct: Decimal::new(5, 0),
            max_loss_pct: Decimal::new(10, 0),
            fee_rate: Decimal::new(5, 2),
        }
    }
}

/// Buys statistically cheap prices measured by z-score against the
/// lookback window; exits on a profit target or stop-loss. Long-only.
#[derive(Debug, Clone, Default)]
pub struct MeanReversionStrategy {
    config: MeanReversionConfig,
}

impl MeanReversionStrategy {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "Mean Reversion"
    }

    fn parameters(&self) -> HashMap<String, String> {
        HashMap::from([
            ("lookback_periods".to_string(), self.config.lookback_periods.to_string()),
            ("std_threshold".to_string(), self.config.std_threshold.to_string()),
            ("min_profit_pct".to_string(), self.config.min_profit_pct.to_string()),
            ("max_loss_pct".to_string(), self.config.max_loss_pct.to_string()),
        ])
    }

    fn evaluate(
        &self,
        current: &PricePoint,
        history: &[PricePoint],
        _open_positions: &[SimulatedTrade],
        balance: Decimal,
    ) -> Evaluation {
        if history.len() < self.config.lookback_periods {
            return Evaluation::hold("insufficient history");
        }
        let window = &history[history.len() - self.config.lookback_periods..];
        let prices: Vec<f64> = window
            .iter()
            .map(|p| p.price.to_f64().unwrap_or(0.0))
            .collect();

        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        // Population standard deviation over the window.
        let variance =
            prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / prices.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 {
            return Evaluation::hold("no price variation");
        }

        let z = (current.price.to_f64().unwrap_or(0.0) - mean) / std_dev;
        if z > -self.config.std_threshold {
            return Evaluation::hold("no entry signal");
        }
        if !affordable(balance, current.price, self.config.fee_rate) {
            return Evaluation::hold("insufficient balance");
        }

        Evaluation::buy(
            current.price,
            format!("z-score {:.2} at or below -{}", z, self.config.std_threshold),
        )
    }

    fn should_close_position(
        &self,
        position: &SimulatedTrade,
        current: &PricePoint,
    ) -> CloseDecision {
        profit_stop_close(
            position,
            current,
            self.config.min_profit_pct,
            self.config.max_loss_pct,
        )
    }
}
