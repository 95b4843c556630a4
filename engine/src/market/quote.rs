use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::EngineError;

/// Tick as reported by the venue, before any validation.
///
/// Venues quote in binary floating point with a millisecond timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawTick {
    pub bid: f64,
    pub ask: f64,
    pub time_msc: i64,
}

/// Canonical top-of-book snapshot.
///
/// Produced once per venue poll and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub ask: Decimal,
    pub bid: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Spread `(ask - bid)` expressed in pips.
    pub fn spread_pips(&self, pip_size: Decimal) -> Decimal {
        (self.ask - self.bid) / pip_size
    }
}

/// Converts venue ticks into [`Quote`]s.
///
/// Prices are rounded to the symbol's quote precision so that downstream
/// comparisons never see binary floating point noise.
#[derive(Clone, Copy, Debug)]
pub struct TickNormalizer {
    price_digits: u32,
}

impl TickNormalizer {
    pub fn new(price_digits: u32) -> Self {
        Self { price_digits }
    }

    /// Normalize a raw tick.
    ///
    /// Fails with [`EngineError::InvalidQuote`] on non-finite or non-positive
    /// prices, a crossed book (`ask < bid`) or an unrepresentable timestamp.
    pub fn normalize(&self, raw: &RawTick) -> Result<Quote, EngineError> {
        let ask = self.price(raw.ask, "ask")?;
        let bid = self.price(raw.bid, "bid")?;

        if ask < bid {
            return Err(EngineError::InvalidQuote(format!(
                "crossed book: ask {ask} < bid {bid}"
            )));
        }

        let observed_at = Utc
            .timestamp_millis_opt(raw.time_msc)
            .single()
            .ok_or_else(|| {
                EngineError::InvalidQuote(format!("bad tick timestamp {}", raw.time_msc))
            })?;

        Ok(Quote {
            ask,
            bid,
            observed_at,
        })
    }

    fn price(&self, value: f64, field: &str) -> Result<Decimal, EngineError> {
        let price = Decimal::from_f64(value)
            .ok_or_else(|| EngineError::InvalidQuote(format!("{field} is not finite: {value}")))?
            .round_dp(self.price_digits);

        if price <= Decimal::ZERO {
            return Err(EngineError::InvalidQuote(format!(
                "{field} must be positive, got {price}"
            )));
        }

        Ok(price)
    }
}
