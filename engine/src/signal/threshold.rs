use rust_decimal::Decimal;

use super::Decision;
use crate::error::EngineError;

/// Result of comparing the current ask against the reference price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdOutcome {
    pub decision: Decision,

    /// `current_ask - reference`.
    pub diff: Decimal,

    /// Reference price to adopt, present only for BUY/SELL.
    pub advance_to: Option<Decimal>,
}

/// Price-movement signal.
///
/// Holds the single reference price of a session. The reference is seeded from
/// the first available ask and afterwards only moves on actionable decisions,
/// whether or not the resulting order is accepted by the venue.
#[derive(Clone, Debug)]
pub struct ThresholdSignal {
    reference: Option<Decimal>,
    threshold: Decimal,
}

impl ThresholdSignal {
    /// `threshold` is an absolute price distance and must be positive.
    pub fn new(threshold: Decimal) -> Result<Self, EngineError> {
        if threshold <= Decimal::ZERO {
            return Err(EngineError::Misconfigured(format!(
                "threshold must be positive, got {threshold}"
            )));
        }

        Ok(Self {
            reference: None,
            threshold,
        })
    }

    pub fn with_reference(threshold: Decimal, reference: Decimal) -> Result<Self, EngineError> {
        let mut s = Self::new(threshold)?;
        s.seed(reference);
        Ok(s)
    }

    pub fn is_seeded(&self) -> bool {
        self.reference.is_some()
    }

    /// Sets the initial reference price. No-op once seeded.
    pub fn seed(&mut self, ask: Decimal) {
        if self.reference.is_none() {
            self.reference = Some(ask);
        }
    }

    pub fn reference(&self) -> Option<Decimal> {
        self.reference
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Pure comparison; does not touch the reference price.
    ///
    /// An unseeded signal always holds.
    pub fn evaluate(&self, current_ask: Decimal) -> ThresholdOutcome {
        let Some(reference) = self.reference else {
            return ThresholdOutcome {
                decision: Decision::Hold,
                diff: Decimal::ZERO,
                advance_to: None,
            };
        };

        let diff = current_ask - reference;
        if diff.abs() < self.threshold {
            return ThresholdOutcome {
                decision: Decision::Hold,
                diff,
                advance_to: None,
            };
        }

        let decision = if diff > Decimal::ZERO {
            Decision::Buy
        } else {
            Decision::Sell
        };

        ThresholdOutcome {
            decision,
            diff,
            advance_to: Some(current_ask),
        }
    }

    /// Adopt a new reference price after an actionable decision.
    pub fn advance(&mut self, to: Decimal) {
        self.reference = Some(to);
    }

    /// Evaluate and apply the reference update in one step.
    pub fn on_ask(&mut self, current_ask: Decimal) -> ThresholdOutcome {
        let outcome = self.evaluate(current_ask);
        if let Some(to) = outcome.advance_to {
            self.advance(to);
        }
        outcome
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]
        #[test]
        fn decision_matches_sign_and_reference_moves_only_on_trades(
            reference_points in 50_000i64..=200_000,
            move_points in -500i64..=500,
            threshold_points in 1i64..=100,
        ) {
            let reference = Decimal::new(reference_points, 5);
            let ask = Decimal::new(reference_points + move_points, 5);
            let threshold = Decimal::new(threshold_points, 5);

            let mut s = ThresholdSignal::with_reference(threshold, reference).unwrap();
            let out = s.on_ask(ask);

            if move_points.abs() < threshold_points {
                prop_assert_eq!(out.decision, Decision::Hold);
                prop_assert_eq!(s.reference(), Some(reference));
            } else {
                let expected = if move_points > 0 { Decision::Buy } else { Decision::Sell };
                prop_assert_eq!(out.decision, expected);
                prop_assert_eq!(s.reference(), Some(ask));
            }
        }
    }
}
