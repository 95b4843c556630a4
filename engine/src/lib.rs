//! Venue-independent decision and risk core.
//!
//! Data flow for a single tick:
//! venue tick → [`market::quote`] → [`market::admission`] → [`signal`]
//! → [`planner`] → venue → [`feedback`] (learned policy only).
//!
//! Nothing in this crate performs I/O. The surrounding process owns the venue,
//! the polling cadence and logging configuration.

pub mod error;
pub mod feedback;
pub mod market;
pub mod planner;
pub mod signal;

pub use error::EngineError;
