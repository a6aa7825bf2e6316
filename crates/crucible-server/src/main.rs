//! Crucible - sandboxed code execution service.
//!
//! Accepts source snippets over HTTP, runs each one in a short-lived
//! container with strict resource caps, and returns stdout/stderr plus a
//! structured error classification.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crucible_core::Config;
use crucible_engine::{AdmissionGate, DockerBackend, Engine, ExecutionBackend, FallbackBackend};
use crucible_server::{create_router, AppState};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Interval between idle rate-bucket sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting Crucible v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    let admission = Arc::new(AdmissionGate::new(
        config.rate_limit_per_minute,
        config.rate_limit_burst,
        config.concurrent_limit,
    ));
    let _sweeper = admission.clone().spawn_sweeper(SWEEP_INTERVAL);

    // Backend selection is a construction-time decision: container-backed
    // when the daemon answers, synthetic fallback only when explicitly
    // permitted.
    let backend: Arc<dyn ExecutionBackend> =
        match DockerBackend::connect(&config, admission.clone()).await {
            Ok(backend) => Arc::new(backend),
            Err(e) if config.allow_fallback => {
                warn!(error = %e, "container runtime unreachable, running in FALLBACK mode; all output is synthesized");
                Arc::new(FallbackBackend::new())
            }
            Err(e) => {
                anyhow::bail!("container runtime unreachable and fallback is disabled: {e}")
            }
        };

    let engine = Arc::new(Engine::new(&config, admission.clone(), backend));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(engine, admission);

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
