use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;

use tickwise::{
    config::{AppConfig, StrategyKind},
    execution::venue::{AccountInfo, Venue},
    session::{TickOutcome, TradingSession, runner::SkipReason},
};
use tickwise_engine::{
    EngineError,
    market::quote::RawTick,
    planner::types::{OrderRequest, OrderResult, Side},
    signal::{Decision, state_key::MarketState},
};

// -----------------------
// Scripted venue
// -----------------------

#[derive(Default)]
struct Script {
    ticks: VecDeque<Result<Option<RawTick>, EngineError>>,
    /// Returned once `ticks` is exhausted.
    fallback: Option<RawTick>,
    closes: Vec<Decimal>,
    results: VecDeque<OrderResult>,
    fail_initialize: bool,

    calls: Vec<&'static str>,
    orders: Vec<OrderRequest>,
}

#[derive(Default)]
struct ScriptedVenue {
    script: Mutex<Script>,
}

impl ScriptedVenue {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
        })
    }

    fn orders(&self) -> Vec<OrderRequest> {
        self.script.lock().orders.clone()
    }

    fn calls(&self) -> Vec<&'static str> {
        self.script.lock().calls.clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }
}

#[async_trait]
impl Venue for ScriptedVenue {
    async fn initialize(&self) -> Result<AccountInfo, EngineError> {
        let mut s = self.script.lock();
        s.calls.push("initialize");
        if s.fail_initialize {
            return Err(EngineError::VenueUnavailable("terminal not running".into()));
        }
        Ok(AccountInfo {
            login: 42,
            server: "scripted".into(),
            currency: "USD".into(),
        })
    }

    async fn select_symbol(&self, _symbol: &str) -> Result<(), EngineError> {
        self.script.lock().calls.push("select_symbol");
        Ok(())
    }

    async fn latest_tick(&self, _symbol: &str) -> Result<Option<RawTick>, EngineError> {
        let mut s = self.script.lock();
        s.calls.push("latest_tick");
        match s.ticks.pop_front() {
            Some(next) => next,
            None => Ok(s.fallback),
        }
    }

    async fn recent_closes(&self, _symbol: &str, count: usize) -> Result<Vec<Decimal>, EngineError> {
        let mut s = self.script.lock();
        s.calls.push("recent_closes");
        let skip = s.closes.len().saturating_sub(count);
        Ok(s.closes[skip..].to_vec())
    }

    async fn submit_order(&self, request: OrderRequest) -> OrderResult {
        let mut s = self.script.lock();
        s.calls.push("submit_order");
        s.orders.push(request);
        s.results
            .pop_front()
            .unwrap_or_else(|| OrderResult::done("done"))
    }

    async fn shutdown(&self) {
        self.script.lock().calls.push("shutdown");
    }
}

// -----------------------
// Helpers
// -----------------------

fn tick(bid: f64, ask: f64) -> Result<Option<RawTick>, EngineError> {
    Ok(Some(raw(bid, ask)))
}

fn raw(bid: f64, ask: f64) -> RawTick {
    RawTick {
        bid,
        ask,
        time_msc: 1_700_000_000_000,
    }
}

fn threshold_cfg() -> AppConfig {
    AppConfig::default()
}

fn learned_cfg(epsilon: f64, episodes: u64) -> AppConfig {
    AppConfig {
        strategy: StrategyKind::Learned,
        epsilon,
        episodes,
        rng_seed: Some(17),
        ..AppConfig::default()
    }
}

fn decision_for(side: Side) -> Decision {
    match side {
        Side::Buy => Decision::Buy,
        Side::Sell => Decision::Sell,
    }
}

/// Steps an exploring learned session until it submits its first order.
async fn first_trade(session: &mut TradingSession<ScriptedVenue>) -> (Side, bool) {
    for _ in 0..100 {
        if let TickOutcome::Submitted { side, accepted, .. } = session.step().await.unwrap() {
            return (side, accepted);
        }
    }
    panic!("full exploration never traded");
}

async fn started(venue: &Arc<ScriptedVenue>, cfg: &AppConfig) -> TradingSession<ScriptedVenue> {
    let session = TradingSession::from_config(venue.clone(), cfg).unwrap();
    session.start().await.unwrap();
    session
}

// -----------------------
// Threshold strategy
// -----------------------

#[tokio::test]
async fn threshold_buys_on_upward_move_with_protective_levels() {
    let venue = ScriptedVenue::new(Script {
        ticks: [tick(1.09990, 1.10000), tick(1.10005, 1.10025)].into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Seeded(dec!(1.10000))
    );
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Submitted {
            side: Side::Buy,
            accepted: true,
            venue_code: 10009
        }
    );

    let orders = venue.orders();
    assert_eq!(orders.len(), 1);
    let o = &orders[0];
    assert_eq!(o.symbol, "EURUSD");
    assert_eq!(o.side, Side::Buy);
    assert_eq!(o.entry_price, dec!(1.10025));
    assert_eq!(o.stop_loss, dec!(1.09975));
    assert_eq!(o.take_profit, dec!(1.10125));
    assert_eq!(o.volume, dec!(0.01));
    assert_eq!(o.tag.magic, 123_456);

    assert_eq!(session.summary().reference_price, Some(dec!(1.10025)));
}

#[tokio::test]
async fn threshold_sells_at_bid_on_downward_move() {
    let venue = ScriptedVenue::new(Script {
        ticks: [tick(1.09990, 1.10000), tick(1.09960, 1.09970)].into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    session.step().await.unwrap();
    session.step().await.unwrap();

    let o = &venue.orders()[0];
    assert_eq!(o.side, Side::Sell);
    assert_eq!(o.entry_price, dec!(1.09960));
    assert_eq!(o.stop_loss, dec!(1.10010));
    assert_eq!(o.take_profit, dec!(1.09860));
}

#[tokio::test]
async fn small_moves_hold_without_moving_the_reference() {
    let venue = ScriptedVenue::new(Script {
        ticks: [
            tick(1.09990, 1.10000),
            tick(1.09998, 1.10010),
            tick(1.09995, 1.10015),
        ]
        .into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    session.step().await.unwrap();
    assert_eq!(session.step().await.unwrap(), TickOutcome::Hold);
    assert_eq!(session.step().await.unwrap(), TickOutcome::Hold);

    assert!(venue.orders().is_empty());
    assert_eq!(session.summary().reference_price, Some(dec!(1.10000)));
    assert_eq!(session.counters().snapshot().holds, 2);
}

#[tokio::test]
async fn reference_advances_even_when_the_order_is_rejected() {
    let venue = ScriptedVenue::new(Script {
        ticks: [
            tick(1.09990, 1.10000),
            tick(1.10005, 1.10025),
            tick(1.10010, 1.10030),
        ]
        .into(),
        results: [OrderResult::rejected(10006, "request rejected")].into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    session.step().await.unwrap();
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Submitted {
            side: Side::Buy,
            accepted: false,
            venue_code: 10006
        }
    );

    // 0.5 pip above the advanced reference, 3 pips above the seed.
    assert_eq!(session.step().await.unwrap(), TickOutcome::Hold);

    let snap = session.counters().snapshot();
    assert_eq!(snap.orders_submitted, 1);
    assert_eq!(snap.orders_rejected, 1);
    assert_eq!(snap.orders_accepted, 0);
}

#[tokio::test]
async fn wide_spread_is_skipped_without_touching_the_reference() {
    let venue = ScriptedVenue::new(Script {
        ticks: [
            tick(1.09990, 1.10000),
            // 25 pip spread, 5 pips above the reference.
            tick(1.09800, 1.10050),
            tick(1.10005, 1.10025),
        ]
        .into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    session.step().await.unwrap();
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Skipped(SkipReason::SpreadTooWide)
    );
    assert!(venue.orders().is_empty());

    assert!(matches!(
        session.step().await.unwrap(),
        TickOutcome::Submitted { side: Side::Buy, .. }
    ));
}

#[tokio::test]
async fn missing_and_malformed_ticks_are_skipped() {
    let venue = ScriptedVenue::new(Script {
        ticks: [
            Ok(None),
            tick(1.10010, 1.10000),
            tick(f64::NAN, 1.1),
            tick(1.09990, 1.10000),
        ]
        .into(),
        ..Script::default()
    });
    let mut session = started(&venue, &threshold_cfg()).await;

    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Skipped(SkipReason::NoData)
    );
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Skipped(SkipReason::InvalidQuote)
    );
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Skipped(SkipReason::InvalidQuote)
    );
    // First well-formed tick seeds.
    assert_eq!(
        session.step().await.unwrap(),
        TickOutcome::Seeded(dec!(1.10000))
    );

    let snap = session.counters().snapshot();
    assert_eq!(snap.skip_no_data, 1);
    assert_eq!(snap.skip_invalid_quote, 2);
}

// -----------------------
// Learned strategy
// -----------------------

#[tokio::test(start_paused = true)]
async fn learned_without_history_never_trades_or_learns() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        closes: vec![dec!(1.1); 4],
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &learned_cfg(1.0, 5)).unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = session.run(rx).await.unwrap();

    assert_eq!(summary.iterations, 5);
    assert_eq!(summary.counters.skip_no_data, 5);
    assert_eq!(summary.counters.orders_submitted, 0);
    assert_eq!(summary.known_states, Some(0));
    assert_eq!(venue.count("submit_order"), 0);
}

#[tokio::test]
async fn accepted_order_rewards_the_traded_action() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        closes: vec![dec!(1.10000); 10],
        ..Script::default()
    });
    let cfg = AppConfig {
        learning_rate: 1.0,
        ..learned_cfg(1.0, 100)
    };
    let mut session = started(&venue, &cfg).await;

    let (side, accepted) = first_trade(&mut session).await;
    assert!(accepted);

    // Flat closes: every tick maps to the zero-delta state.
    let state = MarketState::from_delta(Decimal::ZERO, 5);
    let table = session.strategy().value_table().unwrap();
    let estimates = table.get(&state).unwrap();

    let traded = decision_for(side);
    for d in Decision::ALL {
        let expected = if d == traded { 1.0 } else { 0.0 };
        assert_eq!(estimates[d.index()], expected, "{d}");
    }
    assert_eq!(table.clone().greedy(state), traded);
    assert_eq!(venue.orders().len(), 1);
}

#[tokio::test]
async fn rejected_order_punishes_the_traded_action() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        closes: vec![dec!(1.10000); 10],
        results: [OrderResult::rejected(10006, "request rejected")].into(),
        ..Script::default()
    });
    let cfg = AppConfig {
        learning_rate: 1.0,
        ..learned_cfg(1.0, 100)
    };
    let mut session = started(&venue, &cfg).await;

    let (side, accepted) = first_trade(&mut session).await;
    assert!(!accepted);

    let state = MarketState::from_delta(Decimal::ZERO, 5);
    let estimates = *session
        .strategy()
        .value_table()
        .unwrap()
        .get(&state)
        .unwrap();

    assert_eq!(estimates[decision_for(side).index()], -1.0);
    assert_eq!(estimates[Decision::Hold.index()], 0.0);
    assert_eq!(session.counters().snapshot().orders_rejected, 1);
}

#[tokio::test(start_paused = true)]
async fn learned_wide_spread_skips_before_history_and_table() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09700, 1.10000)),
        closes: vec![dec!(1.10000); 10],
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &learned_cfg(1.0, 6)).unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = session.run(rx).await.unwrap();

    assert_eq!(summary.counters.skip_spread, 6);
    assert_eq!(summary.known_states, Some(0));
    assert_eq!(venue.count("recent_closes"), 0);
    assert_eq!(venue.count("submit_order"), 0);
}

#[tokio::test(start_paused = true)]
async fn learned_session_stops_at_the_episode_cap() {
    let closes: Vec<Decimal> = (0..10).map(|i| dec!(1.10000) + Decimal::new(i, 5)).collect();
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        closes,
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &learned_cfg(1.0, 30)).unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = session.run(rx).await.unwrap();

    assert_eq!(summary.iterations, 30);
    assert_eq!(venue.count("latest_tick"), 30);
    assert_eq!(
        summary.counters.holds + summary.counters.orders_submitted,
        30
    );
    assert_eq!(
        summary.counters.orders_submitted as usize,
        venue.orders().len()
    );
    assert_eq!(summary.known_states, Some(1));
    assert_eq!(venue.calls().last(), Some(&"shutdown"));
}

#[tokio::test(start_paused = true)]
async fn threshold_session_never_fetches_close_history() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &threshold_cfg()).unwrap();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(session.run(rx));
    tokio::time::sleep(Duration::from_millis(5_500)).await;
    tx.send(true).unwrap();

    let summary = handle.await.unwrap().unwrap();
    assert!(summary.iterations >= 1);
    assert_eq!(venue.count("recent_closes"), 0);
}

// -----------------------
// Lifecycle
// -----------------------

#[tokio::test(start_paused = true)]
async fn stop_signal_ends_the_session_and_releases_the_venue() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &threshold_cfg()).unwrap();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(session.run(rx));
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    tx.send(true).unwrap();

    let summary = handle.await.unwrap().unwrap();
    assert!(summary.iterations >= 1);

    let calls = venue.calls();
    assert_eq!(calls.first(), Some(&"initialize"));
    assert_eq!(calls.last(), Some(&"shutdown"));
    assert_eq!(venue.count("shutdown"), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_stop_sender_ends_the_session() {
    let venue = ScriptedVenue::new(Script {
        fallback: Some(raw(1.09990, 1.10000)),
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &threshold_cfg()).unwrap();
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let summary = session.run(rx).await.unwrap();

    assert_eq!(summary.iterations, 0);
    assert_eq!(venue.count("shutdown"), 1);
}

#[tokio::test(start_paused = true)]
async fn venue_failure_aborts_and_still_shuts_down() {
    let venue = ScriptedVenue::new(Script {
        ticks: [
            tick(1.09990, 1.10000),
            Err(EngineError::VenueUnavailable("connection lost".into())),
        ]
        .into(),
        fallback: Some(raw(1.09990, 1.10000)),
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &threshold_cfg()).unwrap();
    let (_tx, rx) = watch::channel(false);

    let err = session.run(rx).await.unwrap_err();

    assert!(matches!(err, EngineError::VenueUnavailable(_)));
    assert_eq!(venue.count("latest_tick"), 2);
    assert_eq!(venue.calls().last(), Some(&"shutdown"));
}

#[tokio::test]
async fn failed_initialization_still_shuts_down() {
    let venue = ScriptedVenue::new(Script {
        fail_initialize: true,
        ..Script::default()
    });
    let session = TradingSession::from_config(venue.clone(), &threshold_cfg()).unwrap();
    let (_tx, rx) = watch::channel(false);

    assert!(session.run(rx).await.is_err());
    assert_eq!(venue.calls(), vec!["initialize", "shutdown"]);
}
