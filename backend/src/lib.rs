pub mod config;
pub mod execution;
pub mod metrics;
pub mod session;

pub mod logger;
pub mod time;
