use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::state_key::{MarketState, StateKey};
use super::value_table::ValueTable;
use super::{ACTION_COUNT, Decision};
use crate::error::EngineError;

pub const DEFAULT_EPSILON: f64 = 0.1;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Exploration and learning parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LearnedParams {
    /// Probability of choosing a uniformly random action, in `[0, 1]`.
    pub epsilon: f64,

    /// Step size of the estimate update, in `(0, 1]`.
    pub learning_rate: f64,
}

impl Default for LearnedParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl LearnedParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(EngineError::Misconfigured(format!(
                "epsilon must be within [0, 1], got {}",
                self.epsilon
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(EngineError::Misconfigured(format!(
                "learning rate must be within (0, 1], got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Action chosen for a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Not enough history; the tick is a HOLD and the table is untouched.
    NoData,

    Chosen {
        state: MarketState,
        decision: Decision,
        explored: bool,
    },
}

/// ε-greedy policy over a [`ValueTable`].
///
/// Owns the only value table of a session. The random source is a type
/// parameter so tests can run with a seeded generator.
#[derive(Debug)]
pub struct LearnedSignal<R = StdRng> {
    table: ValueTable,
    params: LearnedParams,
    rng: R,
}

impl LearnedSignal<StdRng> {
    /// Seeded generator when `seed` is given, OS entropy otherwise.
    pub fn from_seed(params: LearnedParams, seed: Option<u64>) -> Result<Self, EngineError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(params, rng)
    }
}

impl<R: Rng> LearnedSignal<R> {
    pub fn new(params: LearnedParams, rng: R) -> Result<Self, EngineError> {
        params.validate()?;

        Ok(Self {
            table: ValueTable::new(),
            params,
            rng,
        })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    /// Choose an action for `key`.
    ///
    /// With probability `1 − ε` the greedy action, otherwise a uniformly random
    /// one. `NoData` short-circuits before any table access.
    pub fn select(&mut self, key: StateKey) -> Selection {
        let StateKey::Market(state) = key else {
            return Selection::NoData;
        };

        let known = self.table.get(&state).is_some();
        let explored = self.rng.random::<f64>() < self.params.epsilon;

        let decision = if explored {
            // Still register the state so it is created exactly once.
            self.table.estimates(state);
            let idx = self.rng.random_range(0..ACTION_COUNT);
            Decision::from_index(idx).unwrap_or(Decision::Hold)
        } else {
            self.table.greedy(state)
        };

        if !known {
            debug!(%state, states = self.table.len(), "new market state");
        }

        Selection::Chosen {
            state,
            decision,
            explored,
        }
    }

    /// Move the estimate for `(state, decision)` toward `reward`.
    pub fn learn(&mut self, state: MarketState, decision: Decision, reward: f64) -> f64 {
        self.table
            .update(state, decision, reward, self.params.learning_rate)
    }
}
