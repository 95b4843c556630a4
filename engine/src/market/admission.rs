//! Admission control.
//!
//! Runs before every signal evaluation. A rejected tick is skipped entirely:
//! no signal state changes and no order is built.

use rust_decimal::Decimal;

use super::quote::Quote;
use crate::error::EngineError;

/// Why a tick was not admitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    NoData,
    SpreadTooWide {
        spread_pips: Decimal,
        limit_pips: Decimal,
    },
}

impl From<RejectReason> for EngineError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::NoData => EngineError::NoData,
            RejectReason::SpreadTooWide {
                spread_pips,
                limit_pips,
            } => EngineError::SpreadTooWide {
                spread_pips,
                limit_pips,
            },
        }
    }
}

/// Admission verdict.
///
/// `Proceed` borrows the admitted quote, so downstream stages can only obtain a
/// quote through a positive verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission<'q> {
    Proceed { quote: &'q Quote, spread_pips: Decimal },
    Reject(RejectReason),
}

/// Spread gate in pip units.
#[derive(Clone, Copy, Debug)]
pub struct AdmissionControl {
    pip_size: Decimal,
    spread_limit_pips: Decimal,
}

impl AdmissionControl {
    pub fn new(pip_size: Decimal, spread_limit_pips: Decimal) -> Result<Self, EngineError> {
        if pip_size <= Decimal::ZERO {
            return Err(EngineError::Misconfigured(format!(
                "pip size must be positive, got {pip_size}"
            )));
        }
        if spread_limit_pips < Decimal::ZERO {
            return Err(EngineError::Misconfigured(format!(
                "spread limit must not be negative, got {spread_limit_pips}"
            )));
        }

        Ok(Self {
            pip_size,
            spread_limit_pips,
        })
    }

    /// Evaluate the latest quote (or its absence).
    ///
    /// A spread exactly at the limit is admitted.
    pub fn evaluate<'q>(&self, quote: Option<&'q Quote>) -> Admission<'q> {
        let Some(quote) = quote else {
            return Admission::Reject(RejectReason::NoData);
        };

        let spread_pips = quote.spread_pips(self.pip_size);
        if spread_pips > self.spread_limit_pips {
            return Admission::Reject(RejectReason::SpreadTooWide {
                spread_pips,
                limit_pips: self.spread_limit_pips,
            });
        }

        Admission::Proceed { quote, spread_pips }
    }
}
