use std::collections::HashMap;

use super::state_key::MarketState;
use super::{ACTION_COUNT, Decision};

/// Per-action value estimates for one state, indexed by [`Decision::index`].
pub type Estimates = [f64; ACTION_COUNT];

/// In-memory value table of the learned policy.
///
/// Grows monotonically: a state is inserted with zeroed estimates the first
/// time it is seen and is never removed for the lifetime of the table.
#[derive(Clone, Debug, Default)]
pub struct ValueTable {
    entries: HashMap<MarketState, Estimates>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, state: &MarketState) -> Option<&Estimates> {
        self.entries.get(state)
    }

    /// Estimates for `state`, inserting a zero vector on first sight.
    pub fn estimates(&mut self, state: MarketState) -> &Estimates {
        self.entries.entry(state).or_insert([0.0; ACTION_COUNT])
    }

    /// Highest-valued action for `state`. Ties resolve to the lowest index.
    pub fn greedy(&mut self, state: MarketState) -> Decision {
        let estimates = self.estimates(state);

        let mut best = 0;
        for (i, v) in estimates.iter().enumerate().skip(1) {
            if *v > estimates[best] {
                best = i;
            }
        }

        Decision::from_index(best).unwrap_or(Decision::Hold)
    }

    /// Single-step moving-average update toward `reward`.
    ///
    /// `estimate ← estimate + α · (reward − estimate)`. Returns the new estimate.
    pub fn update(&mut self, state: MarketState, action: Decision, reward: f64, alpha: f64) -> f64 {
        let estimates = self.entries.entry(state).or_insert([0.0; ACTION_COUNT]);
        let slot = &mut estimates[action.index()];
        *slot += alpha * (reward - *slot);
        *slot
    }
}
