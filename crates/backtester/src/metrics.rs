//! Performance metrics over trade ledgers and equity curves.
//!
//! Every function here is a pure computation with documented fallback
//! values for quiet markets: zero variance, zero history, zero closed
//! trades and all-winner runs are legitimate outcomes, not faults.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::ledger::{SimulatedTrade, TradeStatus};

/// One equity sample: timestamp and marked-to-market account value.
pub type EquityPoint = (DateTime<Utc>, Decimal);

/// Annualization constant for the Sharpe ratio, assuming hourly equity
/// samples (24 * 365). This is a documented approximation of the
/// sampling cadence, not a measurement of it; it is applied to both
/// the mean and the standard deviation of period returns.
pub const PERIODS_PER_YEAR: f64 = 8760.0;

/// Sentinel profit factor for runs with winners and no losers.
pub const INFINITE_PROFIT_FACTOR: f64 = f64::INFINITY;

/// Total return in percent of the initial balance.
pub fn roi_pct(initial: Decimal, final_balance: Decimal) -> f64 {
    if initial <= Decimal::ZERO {
        return 0.0;
    }
    ((final_balance - initial) / initial)
        .to_f64()
        .unwrap_or(0.0)
        * 100.0
}

/// Largest percentage decline from the running peak, in percent.
/// 0 for empty or non-decreasing curves.
pub fn max_drawdown_pct(curve: &[EquityPoint]) -> f64 {
    let mut peak = match curve.first() {
        Some((_, equity)) => *equity,
        None => return 0.0,
    };
    let mut max_drawdown: f64 = 0.0;

    for (_, equity) in curve {
        if *equity > peak {
            peak = *equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = ((peak - *equity) / peak).to_f64().unwrap_or(0.0) * 100.0;
            max_drawdown = max_drawdown.max(drawdown);
        }
    }

    max_drawdown
}

/// Period-over-period returns of the equity curve. Steps whose prior
/// equity is non-positive are skipped.
pub fn period_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].1;
            if prev <= Decimal::ZERO {
                return None;
            }
            ((w[1].1 - prev) / prev).to_f64()
        })
        .collect()
}

/// Annualized Sharpe ratio at a 0% risk-free rate.
///
/// 0 when fewer than two equity samples exist or the sample standard
/// deviation of returns is exactly 0; never NaN or infinite.
pub fn sharpe_ratio(curve: &[EquityPoint]) -> f64 {
    let returns = period_returns(curve);
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    // Sample variance (n - 1 denominator).
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return 0.0;
    }

    (mean * PERIODS_PER_YEAR) / (std_dev * PERIODS_PER_YEAR.sqrt())
}

fn closed(trades: &[SimulatedTrade]) -> impl Iterator<Item = (&SimulatedTrade, Decimal)> {
    trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed)
        .filter_map(|t| t.profit.map(|p| (t, p)))
}

/// Gross winning profit divided by absolute gross losing profit over
/// closed trades. [`INFINITE_PROFIT_FACTOR`] when there are winners
/// but no losers; 0 with no closed trades.
pub fn profit_factor(trades: &[SimulatedTrade]) -> f64 {
    let mut gross_wins = Decimal::ZERO;
    let mut gross_losses = Decimal::ZERO;
    for (_, profit) in closed(trades) {
        if profit > Decimal::ZERO {
            gross_wins += profit;
        } else {
            gross_losses += profit.abs();
        }
    }

    if gross_losses > Decimal::ZERO {
        (gross_wins / gross_losses).to_f64().unwrap_or(0.0)
    } else if gross_wins > Decimal::ZERO {
        INFINITE_PROFIT_FACTOR
    } else {
        0.0
    }
}

/// Winning share of closed trades, in percent. 0 when none are closed.
pub fn win_rate_pct(trades: &[SimulatedTrade]) -> f64 {
    let mut total = 0usize;
    let mut winners = 0usize;
    for (_, profit) in closed(trades) {
        total += 1;
        if profit > Decimal::ZERO {
            winners += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    winners as f64 / total as f64 * 100.0
}

/// Mean profit of winning closed trades. 0 when there are none.
pub fn avg_profit(trades: &[SimulatedTrade]) -> Decimal {
    let wins: Vec<Decimal> = closed(trades)
        .map(|(_, p)| p)
        .filter(|p| *p > Decimal::ZERO)
        .collect();
    if wins.is_empty() {
        return Decimal::ZERO;
    }
    wins.iter().sum::<Decimal>() / Decimal::from(wins.len() as u64)
}

/// Mean profit of losing closed trades, as a non-positive value.
/// 0 when there are none.
pub fn avg_loss(trades: &[SimulatedTrade]) -> Decimal {
    let losses: Vec<Decimal> = closed(trades)
        .map(|(_, p)| p)
        .filter(|p| *p <= Decimal::ZERO)
        .collect();
    if losses.is_empty() {
        return Decimal::ZERO;
    }
    losses.iter().sum::<Decimal>() / Decimal::from(losses.len() as u64)
}

/// Mean per-trade return in percent of entry cost, over closed trades.
/// 0 when none are closed.
pub fn avg_trade_roi_pct(trades: &[SimulatedTrade]) -> f64 {
    let rois: Vec<f64> = closed(trades)
        .filter_map(|(t, p)| {
            let cost = t.entry_cost();
            if cost <= Decimal::ZERO {
                return None;
            }
            (p / cost).to_f64()
        })
        .collect();
    if rois.is_empty() {
        return 0.0;
    }
    rois.iter().sum::<f64>() / rois.len() as f64 * 100.0
}
