//! qra-daemon entry point.
//!
//! Thin by intent: parse args, set up tracing, load config, build the shared
//! state, start the rotator and heartbeat, wire middleware, serve. Route
//! handlers live in `routes.rs`; shared state types in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use qra_config::{load_layered_yaml, report_unused_keys, GateConfig, LoadedConfig, UnusedKeyPolicy};
use qra_daemon::{rotator, routes, state};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "qra-daemon")]
#[command(about = "Rotating-QR attendance gate", long_about = None)]
struct Args {
    /// Layered YAML config paths in merge order (later overrides earlier)
    #[arg(long = "config")]
    config_paths: Vec<String>,

    /// Refuse to start when the config contains keys nothing reads
    #[arg(long, default_value_t = false)]
    strict_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let args = Args::parse();
    init_tracing();
    state::uptime_secs();

    let loaded = if args.config_paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let paths: Vec<&str> = args.config_paths.iter().map(String::as_str).collect();
        load_layered_yaml(&paths)?
    };

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for key in &report.unused_keys {
        warn!(key = %key, "config key is not read by qra-daemon");
    }

    let mut cfg = GateConfig::from_config_json(&loaded.config_json).context("invalid config")?;
    if let Some(addr) = bind_addr_from_env() {
        cfg.bind_addr = addr;
    }
    info!(config_hash = %loaded.config_hash, "config loaded");

    let shared = Arc::new(state::AppState::from_config(&cfg)?);

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    rotator::spawn_rotator(Arc::clone(&shared), cfg.rotation_period);

    let app = routes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    info!("qra-daemon listening on http://{}", cfg.bind_addr);
    info!("qr codes point at {}", cfg.scan_url("<token>"));

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("qra-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("QRA_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl_c handler failed; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
