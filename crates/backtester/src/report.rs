//! Tabular rendering of backtest results.

use rust_decimal::Decimal;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::metrics::INFINITE_PROFIT_FACTOR;
use crate::simulator::BacktestResults;

/// One strategy row in the comparison summary.
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "ROI %")]
    roi: String,
    #[tabled(rename = "Win %")]
    win_rate: String,
    #[tabled(rename = "Sharpe")]
    sharpe: String,
    #[tabled(rename = "Max DD %")]
    max_drawdown: String,
    #[tabled(rename = "Profit Factor")]
    profit_factor: String,
    #[tabled(rename = "Trades")]
    trades: usize,
    #[tabled(rename = "Final Balance")]
    final_balance: Decimal,
}

impl From<&BacktestResults> for SummaryRow {
    fn from(results: &BacktestResults) -> Self {
        let profit_factor = if results.profit_factor == INFINITE_PROFIT_FACTOR {
            "inf".to_string()
        } else {
            format!("{:.2}", results.profit_factor)
        };
        Self {
            strategy: results.strategy_name.clone(),
            roi: format!("{:.2}", results.roi_pct),
            win_rate: format!("{:.1}", results.win_rate_pct),
            sharpe: format!("{:.2}", results.sharpe_ratio),
            max_drawdown: format!("{:.2}", results.max_drawdown_pct),
            profit_factor,
            trades: results.total_trades,
            final_balance: results.final_balance.round_dp(2),
        }
    }
}

/// Render a comparison table, one row per result, in the given order.
pub fn summary_table(results: &[BacktestResults]) -> String {
    let rows: Vec<SummaryRow> = results.iter().map(SummaryRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
