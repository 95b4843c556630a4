use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use tickwise_engine::planner::levels::RiskParams;
use tickwise_engine::planner::types::OrderTag;
use tickwise_engine::signal::learned::LearnedParams;

const ENV_PREFIX: &str = "TICKWISE_";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Parse { key: String, value: String },

    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which signal drives the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Threshold,
    Learned,
}

impl FromStr for StrategyKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(StrategyKind::Threshold),
            "learned" | "rl" | "q" => Ok(StrategyKind::Learned),
            _ => Err(()),
        }
    }
}

/// Parameters of the simulated venue used for dry runs.
#[derive(Clone, Debug, PartialEq)]
pub struct PaperConfig {
    /// Initial mid price.
    pub start_price: Decimal,

    /// Quoted spread, in pips.
    pub spread_pips: Decimal,

    /// Largest mid move per tick, in pips.
    pub step_pips: Decimal,

    /// Probability that an order is rejected.
    pub reject_rate: f64,

    /// Probability that a poll returns no tick.
    pub gap_rate: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            start_price: Decimal::new(110_000, 5),
            spread_pips: Decimal::new(15, 1),
            step_pips: Decimal::from(3),
            reject_rate: 0.05,
            gap_rate: 0.02,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    // =========================
    // Instrument
    // =========================
    /// Venue symbol traded by this session. One session per symbol.
    pub symbol: String,

    /// Price distance of one pip (0.0001 for most FX majors).
    pub pip_size: Decimal,

    /// Fractional digits of the venue's price convention.
    pub price_digits: u32,

    // =========================
    // Strategy
    // =========================
    pub strategy: StrategyKind,

    /// Threshold strategy: minimum move against the reference price, in pips.
    pub threshold_pips: Decimal,

    /// Learned strategy: exploration rate.
    pub epsilon: f64,

    /// Learned strategy: estimate update step size.
    pub learning_rate: f64,

    /// Learned strategy: iteration cap. The threshold strategy runs until stopped.
    pub episodes: u64,

    /// Optional seed for the exploration RNG (reproducible runs).
    pub rng_seed: Option<u64>,

    // =========================
    // Risk / orders
    // =========================
    /// Ticks with a wider spread than this (in pips) are skipped.
    pub spread_limit_pips: Decimal,

    pub stop_loss_pips: Decimal,
    pub take_profit_pips: Decimal,

    /// Lot size per order.
    pub volume: Decimal,

    /// Maximum accepted slippage, in points.
    pub deviation: u32,

    pub magic: u64,
    pub comment: String,

    // =========================
    // Loop
    // =========================
    /// Delay between two polls of the venue.
    pub poll_interval: Duration,

    /// Venue calls slower than this are logged as a performance warning.
    pub slow_call: Duration,

    pub paper: PaperConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            pip_size: Decimal::new(1, 4),
            price_digits: 5,

            strategy: StrategyKind::Threshold,
            threshold_pips: Decimal::from(2),
            epsilon: 0.1,
            learning_rate: 0.1,
            episodes: 1_000,
            rng_seed: None,

            spread_limit_pips: Decimal::from(20),
            stop_loss_pips: Decimal::from(5),
            take_profit_pips: Decimal::from(10),
            volume: Decimal::new(1, 2),
            deviation: 10,
            magic: 123_456,
            comment: "tickwise".to_string(),

            poll_interval: Duration::from_millis(1_000),
            slow_call: Duration::from_millis(500),

            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `TICKWISE_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a validated config from an arbitrary key lookup.
    ///
    /// Keys are passed fully prefixed (`TICKWISE_SYMBOL`, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let d = Self::default();

        let cfg = Self {
            symbol: env.string("SYMBOL", d.symbol),
            pip_size: env.parse("PIP_SIZE", d.pip_size)?,
            price_digits: env.parse("PRICE_DIGITS", d.price_digits)?,

            strategy: env.parse("STRATEGY", d.strategy)?,
            threshold_pips: env.parse("THRESHOLD_PIPS", d.threshold_pips)?,
            epsilon: env.parse("EPSILON", d.epsilon)?,
            learning_rate: env.parse("LEARNING_RATE", d.learning_rate)?,
            episodes: env.parse("EPISODES", d.episodes)?,
            rng_seed: env.optional("RNG_SEED")?,

            spread_limit_pips: env.parse("SPREAD_LIMIT_PIPS", d.spread_limit_pips)?,
            stop_loss_pips: env.parse("STOP_LOSS_PIPS", d.stop_loss_pips)?,
            take_profit_pips: env.parse("TAKE_PROFIT_PIPS", d.take_profit_pips)?,
            volume: env.parse("LOT", d.volume)?,
            deviation: env.parse("DEVIATION", d.deviation)?,
            magic: env.parse("MAGIC", d.magic)?,
            comment: env.string("COMMENT", d.comment),

            poll_interval: Duration::from_millis(
                env.parse("POLL_INTERVAL_MS", d.poll_interval.as_millis() as u64)?,
            ),
            slow_call: Duration::from_millis(
                env.parse("SLOW_CALL_MS", d.slow_call.as_millis() as u64)?,
            ),

            paper: PaperConfig {
                start_price: env.parse("PAPER_START_PRICE", d.paper.start_price)?,
                spread_pips: env.parse("PAPER_SPREAD_PIPS", d.paper.spread_pips)?,
                step_pips: env.parse("PAPER_STEP_PIPS", d.paper.step_pips)?,
                reject_rate: env.parse("PAPER_REJECT_RATE", d.paper.reject_rate)?,
                gap_rate: env.parse("PAPER_GAP_RATE", d.paper.gap_rate)?,
            },
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                key,
                reason: reason.into(),
            }
        }

        if self.symbol.trim().is_empty() {
            return Err(invalid("SYMBOL", "must not be empty"));
        }
        if self.pip_size <= Decimal::ZERO {
            return Err(invalid("PIP_SIZE", "must be positive"));
        }
        if self.price_digits > Decimal::MAX_SCALE {
            return Err(invalid(
                "PRICE_DIGITS",
                format!("must be at most {}", Decimal::MAX_SCALE),
            ));
        }
        if self.threshold_pips <= Decimal::ZERO {
            return Err(invalid("THRESHOLD_PIPS", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(invalid("EPSILON", "must be within [0, 1]"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(invalid("LEARNING_RATE", "must be within (0, 1]"));
        }
        if self.episodes == 0 {
            return Err(invalid("EPISODES", "must be at least 1"));
        }
        if self.spread_limit_pips < Decimal::ZERO {
            return Err(invalid("SPREAD_LIMIT_PIPS", "must not be negative"));
        }
        if self.stop_loss_pips <= Decimal::ZERO {
            return Err(invalid("STOP_LOSS_PIPS", "must be positive"));
        }
        if self.take_profit_pips <= Decimal::ZERO {
            return Err(invalid("TAKE_PROFIT_PIPS", "must be positive"));
        }
        if self.volume <= Decimal::ZERO {
            return Err(invalid("LOT", "must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("POLL_INTERVAL_MS", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.paper.reject_rate) {
            return Err(invalid("PAPER_REJECT_RATE", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.paper.gap_rate) {
            return Err(invalid("PAPER_GAP_RATE", "must be within [0, 1]"));
        }
        if self.paper.start_price <= Decimal::ZERO {
            return Err(invalid("PAPER_START_PRICE", "must be positive"));
        }
        Ok(())
    }

    /// Threshold as an absolute price distance.
    pub fn threshold_price(&self) -> Decimal {
        self.threshold_pips * self.pip_size
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            stop_loss_pips: self.stop_loss_pips,
            take_profit_pips: self.take_profit_pips,
            volume: self.volume,
            deviation: self.deviation,
            pip_size: self.pip_size,
            price_digits: self.price_digits,
        }
    }

    pub fn learned_params(&self) -> LearnedParams {
        LearnedParams {
            epsilon: self.epsilon,
            learning_rate: self.learning_rate,
        }
    }

    pub fn order_tag(&self) -> OrderTag {
        OrderTag {
            magic: self.magic,
            comment: self.comment.clone(),
        }
    }

    /// Iteration cap of the session, if any.
    pub fn max_iterations(&self) -> Option<u64> {
        match self.strategy {
            StrategyKind::Threshold => None,
            StrategyKind::Learned => Some(self.episodes),
        }
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<(String, String)> {
        let full = format!("{ENV_PREFIX}{key}");
        (self.lookup)(&full).map(|v| (full, v))
    }

    fn string(&self, key: &str, default: String) -> String {
        self.raw(key).map(|(_, v)| v).unwrap_or(default)
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.optional(key)?.unwrap_or(default))
    }

    fn optional<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.raw(key) {
            None => Ok(None),
            Some((full, value)) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::Parse { key: full, value }),
        }
    }
}
