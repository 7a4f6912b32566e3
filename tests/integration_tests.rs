//! Cross-crate integration tests: provider records through market-core
//! into the backtest engine and out as reports.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use flipbot::backtester::strategy::ThresholdReversionConfig;
use flipbot::backtester::{
    summary_table, BacktestEngine, BacktestError, HistoricalDataStore, MeanReversionStrategy,
    MomentumStrategy, PricePoint, SimulatorConfig, Strategy, SyntheticConfig,
    ThresholdReversionStrategy, TradeStatus,
};
use flipbot::core::RawPriceRecord;

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Provider payloads arrive with mixed timestamp formats and out of
/// order; the loading boundary must canonicalize and sort them.
#[test]
fn test_json_records_flow_into_engine() {
    let payload = r#"[
        {"timestamp": 1700007200, "price": "105.0", "volume": 3},
        {"timestamp": "2023-11-14T22:13:20Z", "price": "100.0", "volume": 5},
        {"timestamp": 1700010800.5, "price": "102.5"}
    ]"#;
    let records: Vec<RawPriceRecord> = serde_json::from_str(payload).unwrap();

    let mut store = HistoricalDataStore::new();
    let loaded = store
        .load_records("abyssal_whip", "Abyssal whip", &records)
        .unwrap();
    assert_eq!(loaded, 3);

    let set = store.get("abyssal_whip").unwrap();
    let prices: Vec<Decimal> = set.points().iter().map(|p| p.price).collect();
    assert_eq!(
        prices,
        vec![
            Decimal::new(1000, 1),
            Decimal::new(1050, 1),
            Decimal::new(1025, 1)
        ]
    );
    assert_eq!(set.first_timestamp(), Some(ts(1_700_000_000)));

    let engine = BacktestEngine::new(store, SimulatorConfig::default());
    let results = engine
        .run(&ThresholdReversionStrategy::default(), None, 5)
        .unwrap();
    assert_eq!(results.equity_curve.len(), 3);
}

#[test]
fn test_invalid_record_rejected_at_loading_boundary() {
    let payload = r#"[{"timestamp": 1700000000, "price": "-5.0"}]"#;
    let records: Vec<RawPriceRecord> = serde_json::from_str(payload).unwrap();

    let mut store = HistoricalDataStore::new();
    let err = store
        .load_records("abyssal_whip", "Abyssal whip", &records)
        .unwrap_err();
    assert!(err.to_string().contains("abyssal_whip"));
}

#[test]
fn test_full_run_is_deterministic_across_engines() {
    let build = || {
        let mut store = HistoricalDataStore::new();
        store.generate_synthetic(
            "abyssal_whip",
            "Abyssal whip",
            &SyntheticConfig::new(Decimal::new(1_500_000, 0)),
        );
        store.generate_synthetic(
            "dragon_bones",
            "Dragon bones",
            &SyntheticConfig {
                seed: 7,
                ..SyntheticConfig::new(Decimal::new(2_800, 0))
            },
        );
        BacktestEngine::new(store, SimulatorConfig::default())
    };

    let first = build().run(&MomentumStrategy::default(), None, 5).unwrap();
    let second = build().run(&MomentumStrategy::default(), None, 5).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_every_position_is_closed_and_accounted() {
    let mut store = HistoricalDataStore::new();
    store.generate_synthetic(
        "zulrah_scale",
        "Zulrah's scale",
        &SyntheticConfig {
            volatility: 0.08,
            ..SyntheticConfig::new(Decimal::new(150, 0))
        },
    );
    let engine = BacktestEngine::new(store, SimulatorConfig::default());

    let results = engine
        .run(&ThresholdReversionStrategy::default(), None, 5)
        .unwrap();

    let mut realized = Decimal::ZERO;
    for (i, trade) in results.trades.iter().enumerate() {
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.id, i as u64 + 1);
        realized += trade.profit.unwrap();
    }
    // Balance moves only through trades, so realized profit explains
    // the whole balance change.
    assert_eq!(results.final_balance - results.initial_balance, realized);
    assert_eq!(
        results.total_trades,
        results.winning_trades + results.losing_trades
    );
}

#[test]
fn test_seven_percent_fee_round_trip() {
    // One scripted dip and recovery under a 7% fee on each leg.
    let mut store = HistoricalDataStore::new();
    for (secs, price) in [(0, 100), (3600, 100), (7200, 100), (10_800, 90), (14_400, 99)] {
        store.add_point(PricePoint::new(
            "abyssal_whip",
            "Abyssal whip",
            ts(secs),
            Decimal::new(price, 0),
        ));
    }
    let fee = Decimal::new(7, 2);
    let engine = BacktestEngine::new(
        store,
        SimulatorConfig {
            initial_balance: Decimal::new(1000, 0),
            fee_rate: fee,
        },
    );
    let strategy = ThresholdReversionStrategy::new(ThresholdReversionConfig {
        lookback_periods: 3,
        buy_threshold_pct: Decimal::new(5, 0),
        min_profit_pct: Decimal::new(5, 0),
        max_loss_pct: Decimal::new(50, 0),
        fee_rate: fee,
    });

    let results = engine.run(&strategy, Some("abyssal_whip"), 5).unwrap();

    assert_eq!(results.total_trades, 1);
    let trade = &results.trades[0];
    // 99 - (90 + 6.3) - 6.93 = -4.23: a 10% price gain still loses
    // money under two 7% fee legs.
    assert_eq!(trade.profit, Some(Decimal::new(-423, 2)));
    assert!(!results.is_profitable());
}

#[test]
fn test_compare_produces_report_for_all_strategies() {
    let mut store = HistoricalDataStore::new();
    store.generate_synthetic(
        "abyssal_whip",
        "Abyssal whip",
        &SyntheticConfig::new(Decimal::new(1_500_000, 0)),
    );
    let engine = BacktestEngine::new(store, SimulatorConfig::default());

    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(ThresholdReversionStrategy::default()),
        Box::new(MomentumStrategy::default()),
        Box::new(MeanReversionStrategy::default()),
    ];
    let results = engine.compare(&strategies, None, 5);
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].sharpe_ratio >= pair[1].sharpe_ratio);
    }

    let table = summary_table(&results);
    assert!(table.contains("Threshold Reversion"));
    assert!(table.contains("Momentum"));
    assert!(table.contains("Mean Reversion"));
}

#[test]
fn test_unknown_item_error_propagates() {
    let mut store = HistoricalDataStore::new();
    store.generate_synthetic(
        "abyssal_whip",
        "Abyssal whip",
        &SyntheticConfig::new(Decimal::new(1_500_000, 0)),
    );
    let engine = BacktestEngine::new(store, SimulatorConfig::default());

    let err = engine
        .run(&ThresholdReversionStrategy::default(), Some("party_hat"), 5)
        .unwrap_err();
    assert!(matches!(err, BacktestError::UnknownItem(item) if item == "party_hat"));
}
