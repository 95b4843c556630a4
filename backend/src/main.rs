use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::Instrument;

use tickwise::{
    config::AppConfig,
    execution::paper::PaperVenue,
    logger::{TraceId, init_tracing},
    session::TradingSession,
};

/// Flips the stop flag on Ctrl-C. The session notices it between ticks.
fn spawn_stop_on_ctrl_c(stop_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = stop_tx.send(true);
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting tickwise...");

    let cfg = AppConfig::from_env().context("invalid TICKWISE_* configuration")?;

    let venue = Arc::new(PaperVenue::new(
        cfg.paper.clone(),
        cfg.pip_size,
        cfg.price_digits,
        cfg.rng_seed,
    ));

    let session = TradingSession::from_config(venue, &cfg)
        .context("failed to build trading session")?
        .with_trace_id(TraceId::default());
    let span = session.span();

    let (stop_tx, stop_rx) = watch::channel(false);
    spawn_stop_on_ctrl_c(stop_tx);

    let summary = session
        .run(stop_rx)
        .instrument(span)
        .await
        .context("trading session failed")?;

    tracing::info!(
        summary = %serde_json::to_string(&summary)?,
        "session summary"
    );

    Ok(())
}
