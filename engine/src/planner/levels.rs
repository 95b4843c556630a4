//! Order parameter builder.
//!
//! Entry is the ask for BUY and the bid for SELL. Protective levels are placed
//! a fixed number of pips away from the entry:
//!
//! ```text
//! BUY : stop_loss = entry − SL·pip   take_profit = entry + TP·pip
//! SELL: stop_loss = entry + SL·pip   take_profit = entry − TP·pip
//! ```
//!
//! All prices are rounded to the quote precision before leaving this module.

use rust_decimal::Decimal;

use super::types::{Filling, OrderRequest, OrderTag, Side, TimeInForce};
use crate::error::EngineError;
use crate::market::quote::Quote;

pub const DEFAULT_PRICE_DIGITS: u32 = 5;

/// Static risk settings of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskParams {
    pub stop_loss_pips: Decimal,
    pub take_profit_pips: Decimal,
    pub volume: Decimal,
    pub deviation: u32,
    pub pip_size: Decimal,
    pub price_digits: u32,
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("stop loss pips", self.stop_loss_pips),
            ("take profit pips", self.take_profit_pips),
            ("volume", self.volume),
            ("pip size", self.pip_size),
        ];

        for (name, v) in positive {
            if v <= Decimal::ZERO {
                return Err(EngineError::Misconfigured(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }

        // A pip must survive rounding or protective levels collapse onto the entry.
        if self.pip_size.round_dp(self.price_digits).is_zero() {
            return Err(EngineError::Misconfigured(format!(
                "pip size {} is below the quote precision of {} digits",
                self.pip_size, self.price_digits
            )));
        }

        Ok(())
    }
}

/// Builds [`OrderRequest`]s for one symbol.
#[derive(Clone, Debug)]
pub struct OrderBuilder {
    symbol: String,
    risk: RiskParams,
    tag: OrderTag,
}

impl OrderBuilder {
    pub fn new(symbol: impl Into<String>, risk: RiskParams, tag: OrderTag) -> Result<Self, EngineError> {
        risk.validate()?;

        Ok(Self {
            symbol: symbol.into(),
            risk,
            tag,
        })
    }

    /// Derive entry and protective levels for `side` from `quote`.
    ///
    /// Fails with [`EngineError::InvalidQuote`] on non-positive prices or a
    /// crossed book.
    pub fn build(&self, side: Side, quote: &Quote) -> Result<OrderRequest, EngineError> {
        if quote.ask <= Decimal::ZERO || quote.bid <= Decimal::ZERO {
            return Err(EngineError::InvalidQuote(format!(
                "non-positive prices: ask {} bid {}",
                quote.ask, quote.bid
            )));
        }
        if quote.ask < quote.bid {
            return Err(EngineError::InvalidQuote(format!(
                "crossed book: ask {} < bid {}",
                quote.ask, quote.bid
            )));
        }

        let r = &self.risk;
        let sl_distance = r.stop_loss_pips * r.pip_size;
        let tp_distance = r.take_profit_pips * r.pip_size;

        let (entry, stop_loss, take_profit) = match side {
            Side::Buy => {
                let entry = quote.ask;
                (entry, entry - sl_distance, entry + tp_distance)
            }
            Side::Sell => {
                let entry = quote.bid;
                (entry, entry + sl_distance, entry - tp_distance)
            }
        };

        Ok(OrderRequest {
            symbol: self.symbol.clone(),
            side,
            volume: r.volume,
            entry_price: entry.round_dp(r.price_digits),
            stop_loss: stop_loss.round_dp(r.price_digits),
            take_profit: take_profit.round_dp(r.price_digits),
            deviation: r.deviation,
            tag: self.tag.clone(),
            time_in_force: TimeInForce::GoodTillCancelled,
            filling: Filling::ImmediateOrCancel,
        })
    }
}
