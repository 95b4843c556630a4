use rust_decimal::Decimal;
use thiserror::Error;

/// Failure taxonomy of the trading core.
///
/// Only [`EngineError::VenueUnavailable`] and [`EngineError::Misconfigured`] end a
/// session. Everything else is recovered by skipping the current tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no market data available")]
    NoData,

    #[error("spread too wide: {spread_pips} pips > limit {limit_pips}")]
    SpreadTooWide {
        spread_pips: Decimal,
        limit_pips: Decimal,
    },

    #[error("invalid quote: {0}")]
    InvalidQuote(String),

    #[error("order rejected by venue (code {code}): {message}")]
    OrderRejected { code: u32, message: String },

    #[error("venue unavailable: {0}")]
    VenueUnavailable(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),
}

impl EngineError {
    /// Whether the surrounding session must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::VenueUnavailable(_) | EngineError::Misconfigured(_)
        )
    }
}
