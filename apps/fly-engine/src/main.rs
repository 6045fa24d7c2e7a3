//! Fly Engine Binary
//!
//! Runs one iron-fly trading session: rehydrates the last snapshot, then
//! cycles marks → PnL → exits → persistence until the feed ends or a
//! shutdown signal arrives, with one final best-effort save on the way out.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin fly-engine
//! ```
//!
//! # Environment Variables
//!
//! - `FLY_CONFIG`: Path to the YAML config (default: config.yaml; missing
//!   file falls back to built-in defaults)
//! - `FLY_MARKS`: Path to a JSON-lines mark replay file, one batch per
//!   cycle. Without it the engine runs in monitor mode on an empty feed.
//! - `RUST_LOG`: Log level (default: info)

use anyhow::Result;
use chrono::Utc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use fly_engine::config::{load_config, Config};
use fly_engine::feed::{IdleMarkFeed, JsonlMarkFeed, MarkFeed};
use fly_engine::session::ladder::StaticChain;
use fly_engine::{SessionEngine, SnapshotStore};

#[tokio::main]
async fn main() -> Result<()> {
    fly_engine::telemetry::init();

    info!("Starting fly engine");

    let config = resolve_config();
    log_config(&config);

    let store = SnapshotStore::new(&config.persistence.state_path);
    let mut engine = SessionEngine::rehydrate(config.clone(), store);

    let mut feed = open_feed();
    let mut ticker = interval(Duration::from_secs(config.session.cycle_interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(updates) = feed.poll_marks() else {
                    info!("Mark feed exhausted; ending session");
                    break;
                };

                let now = Utc::now();

                // Entry window: derive the 0DTE chain from every contract
                // the book has seen, and let the median strike stand in
                // when no spot is available.
                if engine.entry_window_open(now) {
                    let chain = StaticChain::new(
                        now.date_naive(),
                        engine.marks().references().cloned().collect::<Vec<_>>(),
                    );
                    if chain.is_empty() {
                        warn!("No 0DTE contracts observed yet; entry deferred");
                    } else {
                        engine.try_enter(&chain, None, now);
                    }
                }

                let report = engine.run_cycle(&updates, now);
                info!(
                    net = %report.breakdown.net,
                    realized = %report.breakdown.realized,
                    unrealized = %report.breakdown.unrealized,
                    active = engine.state().active_flies().len(),
                    closed = report.closed_bodies.len(),
                    stale = report.breakdown.stale_bodies.len(),
                    "Cycle complete"
                );
                if report.portfolio_stop_hit {
                    info!("Portfolio stop hit; all positions closed");
                }
            }
            () = shutdown_signal() => {
                break;
            }
        }
    }

    engine.shutdown(Utc::now());
    info!("Fly engine stopped");
    Ok(())
}

/// Load the YAML config, falling back to defaults when no file exists.
fn resolve_config() -> Config {
    let path = std::env::var("FLY_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    if !std::path::Path::new(&path).exists() {
        info!(%path, "No config file; using built-in defaults");
        return Config::default();
    }
    match load_config(Some(&path)) {
        Ok(config) => config,
        Err(e) => {
            warn!(%path, error = %e, "Config load failed; using built-in defaults");
            Config::default()
        }
    }
}

/// Log the effective configuration.
fn log_config(config: &Config) {
    info!(
        underlying = %config.session.underlying,
        entry = %format!("{:02}:{:02}", config.session.entry_hour, config.session.entry_minute),
        ladder = %format!(
            "{}+1+{} x step {} width {}",
            config.ladder.n_below, config.ladder.n_above, config.ladder.step, config.ladder.width
        ),
        per_fly_stop = %config.stops.per_fly_stop,
        portfolio_stop = %config.stops.portfolio_stop,
        state_path = %config.persistence.state_path,
        "Configuration loaded"
    );
}

/// Open the replay feed named by `FLY_MARKS`, or an empty feed in monitor
/// mode.
fn open_feed() -> Box<dyn MarkFeed + Send> {
    match std::env::var("FLY_MARKS") {
        Ok(path) => match JsonlMarkFeed::open(&path) {
            Ok(feed) => {
                info!(%path, "Replaying marks");
                Box::new(feed)
            }
            Err(e) => {
                warn!(%path, error = %e, "Cannot open mark file; running on an empty feed");
                Box::new(IdleMarkFeed)
            }
        },
        Err(_) => {
            info!("No mark transport configured (FLY_MARKS unset); monitor mode");
            Box::new(IdleMarkFeed)
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// respond to termination signals should fail fast at startup.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
