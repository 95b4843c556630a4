use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,
    pub holds: Arc<AtomicU64>,

    // skip reasons
    pub skip_no_data: Arc<AtomicU64>,
    pub skip_spread: Arc<AtomicU64>,
    pub skip_invalid_quote: Arc<AtomicU64>,

    pub orders_submitted: Arc<AtomicU64>,
    pub orders_accepted: Arc<AtomicU64>,
    pub orders_rejected: Arc<AtomicU64>,
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub ticks: u64,
    pub holds: u64,
    pub skip_no_data: u64,
    pub skip_spread: u64,
    pub skip_invalid_quote: u64,
    pub orders_submitted: u64,
    pub orders_accepted: u64,
    pub orders_rejected: u64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);

        CounterSnapshot {
            ticks: load(&self.ticks),
            holds: load(&self.holds),
            skip_no_data: load(&self.skip_no_data),
            skip_spread: load(&self.skip_spread),
            skip_invalid_quote: load(&self.skip_invalid_quote),
            orders_submitted: load(&self.orders_submitted),
            orders_accepted: load(&self.orders_accepted),
            orders_rejected: load(&self.orders_rejected),
        }
    }
}
