//! Trade signals.
//!
//! Two interchangeable policies produce a [`Decision`] per admitted tick:
//! - [`threshold::ThresholdSignal`]: price movement against a reference price.
//! - [`learned::LearnedSignal`]: ε-greedy lookup in a per-state value table.

pub mod learned;
pub mod state_key;
pub mod threshold;
pub mod value_table;

use std::fmt;

use serde::Serialize;

use crate::planner::types::Side;

/// Number of actions available to a policy.
pub const ACTION_COUNT: usize = 3;

/// Outcome of a signal evaluation.
///
/// Variant order is the action index order and is relied on for tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Decision {
    Hold,
    Buy,
    Sell,
}

impl Decision {
    pub const ALL: [Decision; ACTION_COUNT] = [Decision::Hold, Decision::Buy, Decision::Sell];

    pub fn index(self) -> usize {
        match self {
            Decision::Hold => 0,
            Decision::Buy => 1,
            Decision::Sell => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Order side for actionable decisions, `None` for HOLD.
    pub fn side(self) -> Option<Side> {
        match self {
            Decision::Hold => None,
            Decision::Buy => Some(Side::Buy),
            Decision::Sell => Some(Side::Sell),
        }
    }

    pub fn is_actionable(self) -> bool {
        self != Decision::Hold
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Hold => "HOLD",
            Decision::Buy => "BUY",
            Decision::Sell => "SELL",
        };
        f.write_str(s)
    }
}
