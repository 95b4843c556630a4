use rust_decimal::Decimal;
use tracing::{debug, info};

use tickwise_engine::EngineError;
use tickwise_engine::feedback::{FeedbackApplied, PendingFeedback};
use tickwise_engine::market::quote::Quote;
use tickwise_engine::planner::types::{OrderResult, Side};
use tickwise_engine::signal::Decision;
use tickwise_engine::signal::learned::{LearnedSignal, Selection};
use tickwise_engine::signal::state_key::StateEncoder;
use tickwise_engine::signal::threshold::ThresholdSignal;
use tickwise_engine::signal::value_table::ValueTable;

use crate::config::{AppConfig, StrategyKind};

/// What the session should do with an admitted tick.
#[derive(Debug)]
pub enum Intent {
    /// Not enough history to form a state.
    NoData,
    Hold,
    Trade {
        decision: Decision,
        side: Side,
        feedback: Option<PendingFeedback>,
    },
}

/// The session's signal and its state.
///
/// Exactly one of these exists per session; it is owned by the session loop
/// and never shared.
pub enum Strategy {
    Threshold(ThresholdSignal),
    Learned {
        signal: LearnedSignal,
        encoder: StateEncoder,
    },
}

impl Strategy {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, EngineError> {
        match cfg.strategy {
            StrategyKind::Threshold => Ok(Strategy::Threshold(ThresholdSignal::new(
                cfg.threshold_price(),
            )?)),
            StrategyKind::Learned => Ok(Strategy::Learned {
                signal: LearnedSignal::from_seed(cfg.learned_params(), cfg.rng_seed)?,
                encoder: StateEncoder::new(cfg.price_digits),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Threshold(_) => "threshold",
            Strategy::Learned { .. } => "learned",
        }
    }

    /// Close history the strategy needs per tick, if any.
    pub fn history_len(&self) -> Option<usize> {
        match self {
            Strategy::Threshold(_) => None,
            Strategy::Learned { encoder, .. } => Some(encoder.history_len()),
        }
    }

    /// Seeds the reference price from the first available ask.
    ///
    /// Returns the seeded price when this call performed the seeding.
    pub fn seed(&mut self, quote: &Quote) -> Option<Decimal> {
        match self {
            Strategy::Threshold(signal) if !signal.is_seeded() => {
                signal.seed(quote.ask);
                signal.reference()
            }
            _ => None,
        }
    }

    /// Decide on an admitted quote.
    ///
    /// The threshold reference price advances here, before the order is
    /// submitted, so it moves whether or not the venue accepts the order.
    pub fn decide(&mut self, quote: &Quote, closes: &[Decimal]) -> Intent {
        match self {
            Strategy::Threshold(signal) => {
                let reference = signal.reference();
                let out = signal.on_ask(quote.ask);

                let Some(side) = out.decision.side() else {
                    debug!(ask = %quote.ask, diff = %out.diff, "no trade, waiting for next tick");
                    return Intent::Hold;
                };

                info!(
                    decision = %out.decision,
                    ask = %quote.ask,
                    diff = %out.diff,
                    reference = ?reference,
                    "threshold signal"
                );

                Intent::Trade {
                    decision: out.decision,
                    side,
                    feedback: None,
                }
            }
            Strategy::Learned { signal, encoder } => {
                let key = encoder.derive(closes);

                match signal.select(key) {
                    Selection::NoData => {
                        info!(observations = closes.len(), "waiting for data");
                        Intent::NoData
                    }
                    Selection::Chosen {
                        state,
                        decision,
                        explored,
                    } => {
                        let Some(side) = decision.side() else {
                            debug!(%state, explored, "hold: no action taken");
                            return Intent::Hold;
                        };

                        info!(%state, %decision, explored, "learned signal");

                        Intent::Trade {
                            decision,
                            side,
                            feedback: PendingFeedback::new(state, decision),
                        }
                    }
                }
            }
        }
    }

    /// Apply the venue result of a submitted order. No-op for the threshold
    /// strategy.
    pub fn feedback(
        &mut self,
        pending: Option<PendingFeedback>,
        result: &OrderResult,
    ) -> Option<FeedbackApplied> {
        match (self, pending) {
            (Strategy::Learned { signal, .. }, Some(pending)) => {
                let state = pending.state();
                let decision = pending.decision();
                let applied = pending.resolve(signal, result);

                debug!(
                    %state,
                    %decision,
                    reward = applied.reward,
                    estimate = applied.estimate,
                    "value estimate updated"
                );
                Some(applied)
            }
            _ => None,
        }
    }

    pub fn value_table(&self) -> Option<&ValueTable> {
        match self {
            Strategy::Threshold(_) => None,
            Strategy::Learned { signal, .. } => Some(signal.table()),
        }
    }

    /// Distinct market states learned so far (learned strategy only).
    pub fn known_states(&self) -> Option<usize> {
        self.value_table().map(ValueTable::len)
    }

    pub fn reference_price(&self) -> Option<Decimal> {
        match self {
            Strategy::Threshold(signal) => signal.reference(),
            Strategy::Learned { .. } => None,
        }
    }
}
