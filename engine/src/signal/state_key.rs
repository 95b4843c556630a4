//! Market state discretization for the learned policy.
//!
//! The state is the difference between a short and a long moving average of
//! recent closes, rounded to a fixed number of decimal places and stored as a
//! scaled integer. Two deltas that round to the same value always produce the
//! same key, independent of formatting or locale.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

/// Observations required before a state can be derived.
pub const MIN_OBSERVATIONS: usize = 5;
pub const SHORT_WINDOW: usize = 3;
pub const LONG_WINDOW: usize = 10;
pub const DEFAULT_PRECISION: u32 = 5;

/// Discretized moving-average delta, `delta * 10^scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MarketState {
    scaled: i128,
    scale: u32,
}

impl MarketState {
    /// `scale` above [`Decimal::MAX_SCALE`] is capped.
    pub fn from_delta(delta: Decimal, scale: u32) -> Self {
        let mut rounded = delta.round_dp(scale);
        rounded.rescale(scale);

        Self {
            scaled: rounded.mantissa(),
            scale: rounded.scale(),
        }
    }

    pub fn delta(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.scaled, self.scale)
    }

    pub fn scaled(&self) -> i128 {
        self.scaled
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.delta())
    }
}

/// Lookup key into the value table, or the insufficient-data sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StateKey {
    NoData,
    Market(MarketState),
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::NoData => f.write_str("NO_DATA"),
            StateKey::Market(s) => s.fmt(f),
        }
    }
}

/// Derives [`StateKey`]s from close-price history (most recent last).
#[derive(Clone, Copy, Debug)]
pub struct StateEncoder {
    precision: u32,
}

impl Default for StateEncoder {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl StateEncoder {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Number of closes worth requesting from the venue.
    pub fn history_len(&self) -> usize {
        LONG_WINDOW
    }

    pub fn derive(&self, closes: &[Decimal]) -> StateKey {
        if closes.len() < MIN_OBSERVATIONS {
            return StateKey::NoData;
        }

        let short = tail_mean(closes, SHORT_WINDOW);
        let long = tail_mean(closes, LONG_WINDOW);

        StateKey::Market(MarketState::from_delta(short - long, self.precision))
    }
}

/// Mean of the last `n` values (or all of them when fewer are available).
/// Callers guarantee `values` is non-empty.
fn tail_mean(values: &[Decimal], n: usize) -> Decimal {
    let tail = &values[values.len().saturating_sub(n)..];
    let sum: Decimal = tail.iter().copied().sum();
    sum / Decimal::from(tail.len())
}
