//! Trading session loop.
//!
//! One session trades one symbol. Each iteration runs to completion:
//!
//! ```text
//! tick → normalize → admission → signal → order → venue → feedback
//! ```
//!
//! The stop signal is only looked at between iterations, so an order that has
//! been built is always submitted and its result always applied.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Span, debug, error, info, instrument, warn};

use tickwise_engine::EngineError;
use tickwise_engine::market::admission::{Admission, AdmissionControl, RejectReason};
use tickwise_engine::market::quote::{Quote, TickNormalizer};
use tickwise_engine::planner::levels::OrderBuilder;
use tickwise_engine::planner::types::Side;

use super::strategy::{Intent, Strategy};
use crate::config::AppConfig;
use crate::execution::venue::{AccountInfo, Venue};
use crate::logger::{TraceId, annotate_strategy, session_span, warn_if_slow};
use crate::metrics::counters::{CounterSnapshot, Counters};

/// Static loop settings, fixed at session start.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub symbol: String,
    pub poll_interval: Duration,
    pub slow_call: Duration,
    pub max_iterations: Option<u64>,
}

impl From<&AppConfig> for SessionSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            symbol: cfg.symbol.clone(),
            poll_interval: cfg.poll_interval,
            slow_call: cfg.slow_call,
            max_iterations: cfg.max_iterations(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    SpreadTooWide,
    InvalidQuote,
}

/// Result of a single iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// First quote of a threshold session; used as the reference, not traded.
    Seeded(Decimal),
    Skipped(SkipReason),
    Hold,
    Submitted {
        side: Side,
        accepted: bool,
        venue_code: u32,
    },
}

/// Reported when a session ends.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub trace_id: String,
    pub symbol: String,
    pub strategy: &'static str,
    pub iterations: u64,
    pub counters: CounterSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_states: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<Decimal>,
}

pub struct TradingSession<V: Venue> {
    venue: Arc<V>,
    normalizer: TickNormalizer,
    admission: AdmissionControl,
    builder: OrderBuilder,
    strategy: Strategy,
    counters: Counters,
    settings: SessionSettings,
    trace_id: TraceId,
    iterations: u64,
}

impl<V: Venue> TradingSession<V> {
    pub fn from_config(venue: Arc<V>, cfg: &AppConfig) -> Result<Self, EngineError> {
        Ok(Self {
            venue,
            normalizer: TickNormalizer::new(cfg.price_digits),
            admission: AdmissionControl::new(cfg.pip_size, cfg.spread_limit_pips)?,
            builder: OrderBuilder::new(cfg.symbol.clone(), cfg.risk_params(), cfg.order_tag())?,
            strategy: Strategy::from_config(cfg)?,
            counters: Counters::default(),
            settings: SessionSettings::from(cfg),
            trace_id: TraceId::default(),
            iterations: 0,
        })
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Root span for everything this session logs.
    pub fn span(&self) -> Span {
        session_span(&self.trace_id, &self.settings.symbol)
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            trace_id: self.trace_id.as_str().to_string(),
            symbol: self.settings.symbol.clone(),
            strategy: self.strategy.name(),
            iterations: self.iterations,
            counters: self.counters.snapshot(),
            known_states: self.strategy.known_states(),
            reference_price: self.strategy.reference_price(),
        }
    }

    /// Open the venue session and select the traded symbol.
    pub async fn start(&self) -> Result<AccountInfo, EngineError> {
        let slow = self.settings.slow_call;

        let account = warn_if_slow("initialize", slow, self.venue.initialize()).await?;
        info!(
            login = account.login,
            server = %account.server,
            currency = %account.currency,
            "venue session opened"
        );

        warn_if_slow(
            "select_symbol",
            slow,
            self.venue.select_symbol(&self.settings.symbol),
        )
        .await?;
        info!(symbol = %self.settings.symbol, "symbol selected");

        Ok(account)
    }

    /// Run until stopped, the iteration cap is reached or the venue fails.
    ///
    /// The venue session is shut down on every exit path.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<SessionSummary, EngineError> {
        annotate_strategy(self.strategy.name());
        info!(
            strategy = self.strategy.name(),
            every_ms = self.settings.poll_interval.as_millis() as u64,
            max_iterations = ?self.settings.max_iterations,
            "trading session started"
        );

        let result = match self.start().await {
            Ok(_) => self.drive(&mut stop).await,
            Err(err) => Err(err),
        };

        self.venue.shutdown().await;

        let summary = self.summary();
        match result {
            Ok(()) => {
                info!(
                    iterations = summary.iterations,
                    orders_submitted = summary.counters.orders_submitted,
                    orders_accepted = summary.counters.orders_accepted,
                    "trading session finished"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(error = %err, iterations = summary.iterations, "trading session aborted");
                Err(err)
            }
        }
    }

    async fn drive(&mut self, stop: &mut watch::Receiver<bool>) -> Result<(), EngineError> {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *stop.borrow() {
                info!("stop requested");
                return Ok(());
            }
            if self
                .settings
                .max_iterations
                .is_some_and(|cap| self.iterations >= cap)
            {
                info!(iterations = self.iterations, "iteration cap reached");
                return Ok(());
            }

            tokio::select! {
                biased;

                changed = stop.changed() => {
                    // A dropped sender can never resume the session.
                    if changed.is_err() {
                        info!("stop channel closed");
                        return Ok(());
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            self.iterations += 1;
            match self.step().await {
                Ok(outcome) => debug!(iteration = self.iterations, ?outcome, "tick processed"),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => warn!(error = %err, "tick failed"),
            }
        }
    }

    /// Process one tick end to end.
    #[instrument(
        level = "debug",
        skip(self),
        target = "session",
        fields(iteration = self.iterations)
    )]
    pub async fn step(&mut self) -> Result<TickOutcome, EngineError> {
        Counters::incr(&self.counters.ticks);
        let slow = self.settings.slow_call;

        let raw = warn_if_slow(
            "latest_tick",
            slow,
            self.venue.latest_tick(&self.settings.symbol),
        )
        .await?;

        let quote = match raw.map(|raw| self.normalizer.normalize(&raw)).transpose() {
            Ok(quote) => quote,
            Err(err) => {
                Counters::incr(&self.counters.skip_invalid_quote);
                warn!(error = %err, "invalid quote, tick skipped");
                return Ok(TickOutcome::Skipped(SkipReason::InvalidQuote));
            }
        };

        if let Some(reference) = quote.as_ref().and_then(|q| self.strategy.seed(q)) {
            info!(%reference, "reference price seeded");
            return Ok(TickOutcome::Seeded(reference));
        }

        let quote: &Quote = match self.admission.evaluate(quote.as_ref()) {
            Admission::Proceed { quote, spread_pips } => {
                debug!(ask = %quote.ask, bid = %quote.bid, %spread_pips, "tick admitted");
                quote
            }
            Admission::Reject(reason) => return Ok(self.skip(reason)),
        };

        let closes = match self.strategy.history_len() {
            Some(count) => {
                warn_if_slow(
                    "recent_closes",
                    slow,
                    self.venue.recent_closes(&self.settings.symbol, count),
                )
                .await?
            }
            None => Vec::new(),
        };

        let (decision, side, feedback) = match self.strategy.decide(quote, &closes) {
            Intent::NoData => {
                Counters::incr(&self.counters.skip_no_data);
                return Ok(TickOutcome::Skipped(SkipReason::NoData));
            }
            Intent::Hold => {
                Counters::incr(&self.counters.holds);
                return Ok(TickOutcome::Hold);
            }
            Intent::Trade {
                decision,
                side,
                feedback,
            } => (decision, side, feedback),
        };

        let order = match self.builder.build(side, quote) {
            Ok(order) => order,
            Err(err) => {
                Counters::incr(&self.counters.skip_invalid_quote);
                warn!(error = %err, "cannot derive order levels, tick skipped");
                return Ok(TickOutcome::Skipped(SkipReason::InvalidQuote));
            }
        };

        info!(
            %decision,
            side = %order.side,
            price = %order.entry_price,
            sl = %order.stop_loss,
            tp = %order.take_profit,
            volume = %order.volume,
            "order sent"
        );
        Counters::incr(&self.counters.orders_submitted);

        let result = warn_if_slow("submit_order", slow, self.venue.submit_order(order)).await;

        match result.rejection() {
            None => {
                Counters::incr(&self.counters.orders_accepted);
                info!(code = result.venue_code, message = %result.message, "order accepted");
            }
            Some(err) => {
                Counters::incr(&self.counters.orders_rejected);
                warn!(error = %err, "order rejected");
            }
        }

        self.strategy.feedback(feedback, &result);

        Ok(TickOutcome::Submitted {
            side,
            accepted: result.accepted,
            venue_code: result.venue_code,
        })
    }

    fn skip(&self, reason: RejectReason) -> TickOutcome {
        match reason {
            RejectReason::NoData => {
                Counters::incr(&self.counters.skip_no_data);
                debug!("no tick available, skipped");
                TickOutcome::Skipped(SkipReason::NoData)
            }
            RejectReason::SpreadTooWide {
                spread_pips,
                limit_pips,
            } => {
                Counters::incr(&self.counters.skip_spread);
                info!(%spread_pips, %limit_pips, "spread too wide, tick skipped");
                TickOutcome::Skipped(SkipReason::SpreadTooWide)
            }
        }
    }
}
