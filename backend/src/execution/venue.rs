//! Boundary to the execution venue.
//!
//! The trading core never talks to a broker directly. Everything it needs is
//! expressed by [`Venue`]; retries, reconnection and timeouts belong to the
//! implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;

use tickwise_engine::EngineError;
use tickwise_engine::market::quote::RawTick;
use tickwise_engine::planner::types::{OrderRequest, OrderResult};

/// Account the venue session is logged into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub login: u64,
    pub server: String,
    pub currency: String,
}

/// Abstraction over the broker connection.
///
/// Errors are reserved for loss of connectivity and must be reported as
/// [`EngineError::VenueUnavailable`]. Transient absence of data is not an error.
#[async_trait]
pub trait Venue: Send + Sync + 'static {
    /// Open the venue session.
    async fn initialize(&self) -> Result<AccountInfo, EngineError>;

    /// Make `symbol` available for quoting and trading.
    async fn select_symbol(&self, symbol: &str) -> Result<(), EngineError>;

    /// Latest tick, `None` when no tick is currently available.
    async fn latest_tick(&self, symbol: &str) -> Result<Option<RawTick>, EngineError>;

    /// Up to `count` recent close prices, most recent last. May return fewer.
    async fn recent_closes(&self, symbol: &str, count: usize) -> Result<Vec<Decimal>, EngineError>;

    /// Submit an order and wait for the acknowledgement.
    ///
    /// Every failure (rejection, disconnect, invalid parameters) is reported
    /// through [`OrderResult::accepted`].
    async fn submit_order(&self, request: OrderRequest) -> OrderResult;

    /// Release the venue session. Called exactly once when a session ends.
    async fn shutdown(&self);
}
