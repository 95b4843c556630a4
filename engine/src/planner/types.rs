use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::EngineError;

/// Venue return code for a completed deal.
pub const RETCODE_DONE: u32 = 10009;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    GoodTillCancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Filling {
    ImmediateOrCancel,
}

/// Identifies orders sent by this bot on the venue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTag {
    pub magic: u64,
    pub comment: String,
}

/// Market order with protective levels.
///
/// Built fresh per actionable decision and handed to the venue by value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,

    /// Maximum accepted slippage, in points.
    pub deviation: u32,

    pub tag: OrderTag,
    pub time_in_force: TimeInForce,
    pub filling: Filling,
}

/// Venue acknowledgement of an [`OrderRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    pub accepted: bool,
    pub venue_code: u32,
    pub message: String,
}

impl OrderResult {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            venue_code: RETCODE_DONE,
            message: message.into(),
        }
    }

    pub fn rejected(venue_code: u32, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            venue_code,
            message: message.into(),
        }
    }

    /// The rejection as an error, `None` when accepted.
    pub fn rejection(&self) -> Option<EngineError> {
        (!self.accepted).then(|| EngineError::OrderRejected {
            code: self.venue_code,
            message: self.message.clone(),
        })
    }
}
