//! Reward assignment and value updates for the learned policy.

use rand::Rng;

use crate::planner::types::OrderResult;
use crate::signal::Decision;
use crate::signal::learned::LearnedSignal;
use crate::signal::state_key::MarketState;

pub const REWARD_FILLED: f64 = 1.0;
pub const REWARD_FAILED: f64 = -1.0;

/// `+1` for an accepted order, `-1` for any failure.
pub fn reward_for(result: &OrderResult) -> f64 {
    if result.accepted {
        REWARD_FILLED
    } else {
        REWARD_FAILED
    }
}

/// Outcome of applying one venue result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedbackApplied {
    pub reward: f64,
    pub estimate: f64,
}

/// The state/action pair awaiting its venue result.
///
/// Created only for actionable decisions and consumed by [`PendingFeedback::resolve`],
/// so every submitted order updates the table exactly once and HOLD never does.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending feedback must be resolved with the order result"]
pub struct PendingFeedback {
    state: MarketState,
    decision: Decision,
}

impl PendingFeedback {
    /// `None` for HOLD.
    pub fn new(state: MarketState, decision: Decision) -> Option<Self> {
        decision
            .is_actionable()
            .then_some(Self { state, decision })
    }

    pub fn state(&self) -> MarketState {
        self.state
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn resolve<R: Rng>(self, signal: &mut LearnedSignal<R>, result: &OrderResult) -> FeedbackApplied {
        let reward = reward_for(result);
        let estimate = signal.learn(self.state, self.decision, reward);
        FeedbackApplied { reward, estimate }
    }
}
