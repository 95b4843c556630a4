use std::time::Duration;
use tracing::{Span, field};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Correlation id of one trading session.
#[derive(Clone, Debug)]
pub struct TraceId(String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Installs the global subscriber.
///
/// JSON output flattens the session span (`trace_id`, `symbol`, `strategy`)
/// into every event so each line can be attributed without the span list.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        // Session summary timing comes from the close event.
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(base.json().with_current_span(true).with_span_list(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(base.pretty())
            .init();
    }
}

pub fn session_span(trace_id: &TraceId, symbol: &str) -> Span {
    tracing::info_span!(
        "session",
        trace_id = %trace_id.as_str(),
        symbol = %symbol,
        strategy = field::Empty
    )
}

pub fn annotate_strategy(strategy: &str) {
    Span::current().record("strategy", field::display(strategy));
}

/// Awaits a venue call and warns when it takes longer than `budget`.
///
/// The call still completes; timeouts are the venue's business.
pub async fn warn_if_slow<F, T>(call: &'static str, budget: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = tokio::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > budget {
        tracing::warn!(
            target: "performance",
            call,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "slow venue call"
        );
    }
    out
}
