pub mod runner;
pub mod strategy;

pub use runner::{SessionSummary, TickOutcome, TradingSession};
