use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use collab_relay::{config::Settings, create_router, lifecycle, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long the shutdown sequence may take before the process force-exits.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let settings = Settings::parse();
    if let Err(e) = settings.validate() {
        eprintln!("invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Initialize tracing; RUST_LOG takes precedence over LOG_LEVEL.
    let default_filter = format!("collab_relay={},server={}", settings.log_level, settings.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = %settings.environment,
        code_editor_features = settings.enable_code_editor_features,
        "starting collab-relay"
    );
    tracing::info!(
        cleanup_interval_ms = settings.cleanup_interval_ms,
        "cleanup interval (informational; reap runs every {:?})",
        lifecycle::REAP_INTERVAL
    );

    let state = AppState::new(settings.clone());

    let heartbeat = lifecycle::spawn_heartbeat(state.registry.clone(), settings.ping_interval());
    let reaper = lifecycle::spawn_reaper(
        state.registry.clone(),
        state.quota.clone(),
        lifecycle::REAP_INTERVAL,
        settings.anomaly_threshold,
    );

    let app = create_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // On INT/TERM: drain the registry (closing every socket with 1001), then
    // let the server's graceful shutdown finish. A watchdog force-exits if
    // the sequence overruns its deadline.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown_state = state.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received");
        tokio::spawn(async {
            tokio::time::sleep(SHUTDOWN_DEADLINE).await;
            tracing::error!("shutdown did not complete in time, forcing exit");
            std::process::exit(1);
        });
        // Stop accepting first, then drain every room.
        let _ = shutdown_tx.send(());
        shutdown_state.registry.shutdown().await;
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    })
    .await
    .unwrap();

    heartbeat.abort();
    reaper.abort();
    tracing::info!("shutdown complete");
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
