//! Simulated venue for dry runs.
//!
//! Quotes follow a bounded random walk around a configured start price with a
//! fixed spread. Every tick also closes a bar, so close history grows with the
//! number of polls. Orders are acknowledged immediately and rejected at a
//! configured rate.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use tickwise_engine::EngineError;
use tickwise_engine::market::quote::RawTick;
use tickwise_engine::planner::types::{OrderRequest, OrderResult, Side};

use super::venue::{AccountInfo, Venue};
use crate::config::PaperConfig;
use crate::time::now_ms;

pub const RETCODE_REJECT: u32 = 10006;
pub const RETCODE_INVALID_VOLUME: u32 = 10014;
pub const RETCODE_INVALID_STOPS: u32 = 10016;
pub const RETCODE_CONNECTION: u32 = 10031;

const MAX_HISTORY: usize = 1_024;

struct PaperState {
    rng: StdRng,
    connected: bool,
    symbol: Option<String>,
    mid: Decimal,
    closes: VecDeque<Decimal>,
    next_ticket: u64,
    orders: VecDeque<OrderRequest>,
}

pub struct PaperVenue {
    cfg: PaperConfig,
    pip_size: Decimal,
    price_digits: u32,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    pub fn new(cfg: PaperConfig, pip_size: Decimal, price_digits: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let state = PaperState {
            rng,
            connected: false,
            symbol: None,
            mid: cfg.start_price,
            closes: VecDeque::with_capacity(MAX_HISTORY),
            next_ticket: 1,
            orders: VecDeque::with_capacity(MAX_HISTORY),
        };

        Self {
            cfg,
            pip_size,
            price_digits,
            state: Mutex::new(state),
        }
    }

    /// Most recent orders accepted for processing, oldest first.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.state.lock().orders.iter().cloned().collect()
    }

    fn point(&self) -> Decimal {
        self.pip_size / Decimal::TEN
    }

    fn stops_are_consistent(req: &OrderRequest) -> bool {
        match req.side {
            Side::Buy => req.stop_loss < req.entry_price && req.entry_price < req.take_profit,
            Side::Sell => req.take_profit < req.entry_price && req.entry_price < req.stop_loss,
        }
    }
}

#[async_trait]
impl Venue for PaperVenue {
    async fn initialize(&self) -> Result<AccountInfo, EngineError> {
        self.state.lock().connected = true;
        info!(venue = "paper", "paper venue session opened");

        Ok(AccountInfo {
            login: 0,
            server: "paper".to_string(),
            currency: "USD".to_string(),
        })
    }

    async fn select_symbol(&self, symbol: &str) -> Result<(), EngineError> {
        let mut s = self.state.lock();
        if !s.connected {
            return Err(EngineError::VenueUnavailable(
                "paper venue not initialized".into(),
            ));
        }
        s.symbol = Some(symbol.to_string());
        Ok(())
    }

    async fn latest_tick(&self, symbol: &str) -> Result<Option<RawTick>, EngineError> {
        let point = self.point();
        let max_step = (self.cfg.step_pips * Decimal::TEN).to_i64().unwrap_or(0).max(0);
        let spread = (self.cfg.spread_pips * self.pip_size).round_dp(self.price_digits);
        let half_spread = spread / Decimal::TWO;

        let mut s = self.state.lock();
        if !s.connected {
            return Err(EngineError::VenueUnavailable(
                "paper venue not initialized".into(),
            ));
        }
        if s.symbol.as_deref() != Some(symbol) {
            return Ok(None);
        }
        if s.rng.random::<f64>() < self.cfg.gap_rate {
            return Ok(None);
        }

        let step = s.rng.random_range(-max_step..=max_step);
        let mid = (s.mid + Decimal::from(step) * point).max(point + half_spread);
        s.mid = mid;

        if s.closes.len() == MAX_HISTORY {
            s.closes.pop_front();
        }
        s.closes.push_back(mid.round_dp(self.price_digits));

        let bid = (mid - half_spread).round_dp(self.price_digits);
        let ask = bid + spread;

        Ok(Some(RawTick {
            bid: bid.to_f64().unwrap_or(0.0),
            ask: ask.to_f64().unwrap_or(0.0),
            time_msc: now_ms(),
        }))
    }

    async fn recent_closes(&self, symbol: &str, count: usize) -> Result<Vec<Decimal>, EngineError> {
        let s = self.state.lock();
        if !s.connected {
            return Err(EngineError::VenueUnavailable(
                "paper venue not initialized".into(),
            ));
        }
        if s.symbol.as_deref() != Some(symbol) {
            return Ok(Vec::new());
        }

        let skip = s.closes.len().saturating_sub(count);
        Ok(s.closes.iter().skip(skip).copied().collect())
    }

    async fn submit_order(&self, request: OrderRequest) -> OrderResult {
        let mut s = self.state.lock();

        if !s.connected {
            return OrderResult::rejected(RETCODE_CONNECTION, "no connection");
        }
        if request.volume <= Decimal::ZERO {
            return OrderResult::rejected(RETCODE_INVALID_VOLUME, "invalid volume");
        }
        if !Self::stops_are_consistent(&request) {
            return OrderResult::rejected(RETCODE_INVALID_STOPS, "invalid stops");
        }

        let ticket = s.next_ticket;
        s.next_ticket += 1;

        let message = format!(
            "deal #{ticket} {} {} {} @ {}",
            request.side, request.volume, request.symbol, request.entry_price
        );
        if s.orders.len() == MAX_HISTORY {
            s.orders.pop_front();
        }
        s.orders.push_back(request);

        if s.rng.random::<f64>() < self.cfg.reject_rate {
            debug!(ticket, "paper venue rejecting order");
            return OrderResult::rejected(RETCODE_REJECT, "request rejected");
        }

        OrderResult::done(message)
    }

    async fn shutdown(&self) {
        let mut s = self.state.lock();
        s.connected = false;
        s.symbol = None;
        info!(venue = "paper", "paper venue session closed");
    }
}
