//! `sensorwatch-worker` -- sensor telemetry batch processor.
//!
//! Receives batches of readings from the pub/sub transport over HTTP,
//! classifies them against cached per-sensor bounds, accumulates window
//! averages, and publishes derived events. See
//! [`WorkerConfig::from_env`](sensorwatch_worker::config::WorkerConfig::from_env)
//! for the environment variables.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sensorwatch_core::bounds::BoundsProvider;
use sensorwatch_core::clock::SystemClock;
use sensorwatch_events::{BusPublisher, EventBus, EventPublisher, HttpPublisher, LocalSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensorwatch_worker::config::{LogFormat, PublishMode, WorkerConfig};
use sensorwatch_worker::provider::HttpBoundsProvider;
use sensorwatch_worker::router::build_app_router;
use sensorwatch_worker::state::{AppState, Collaborators};

const DEFAULT_LOG_FILTER: &str =
    "sensorwatch_worker=info,sensorwatch_core=info,sensorwatch_events=info,tower_http=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration (read before tracing so LOG_FORMAT applies) ---
    let config = WorkerConfig::from_env();
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());

    let config = config.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        pipelines = ?config.pipelines,
        publish_mode = ?config.publish_mode,
        "Loaded worker configuration"
    );

    // --- Publisher ---
    let mut local_bus: Option<(Arc<EventBus>, tokio::task::JoinHandle<u64>)> = None;
    let publisher: Arc<dyn EventPublisher> = match config.publish_mode {
        PublishMode::Http => match HttpPublisher::new(config.publish_timeout) {
            Ok(publisher) => Arc::new(publisher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build HTTP publisher");
                std::process::exit(1);
            }
        },
        PublishMode::Local => {
            let bus = Arc::new(EventBus::default());
            let sink_handle = tokio::spawn(LocalSink::run(bus.subscribe()));
            local_bus = Some((Arc::clone(&bus), sink_handle));
            tracing::info!("Publishing to the local event bus");
            Arc::new(BusPublisher::new(bus))
        }
    };

    // --- Bounds provider ---
    let bounds_provider: Option<Arc<dyn BoundsProvider>> = match &config.abnormal {
        Some(abnormal) => {
            match HttpBoundsProvider::new(abnormal.provider_url.clone(), abnormal.refresh_timeout)
            {
                Ok(provider) => Some(Arc::new(provider)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build bounds provider client");
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    // --- App state ---
    let addr_host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(
        config,
        Collaborators {
            publisher,
            bounds_provider,
            clock: Arc::new(SystemClock),
        },
    )
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let app = build_app_router(state);

    // --- Start server ---
    let ip = addr_host.parse::<std::net::IpAddr>().unwrap_or_else(|e| {
        tracing::error!(host = %addr_host, error = %e, "Invalid HOST address");
        std::process::exit(1);
    });
    let addr = SocketAddr::new(ip, port);
    tracing::info!(%addr, "Starting worker");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Worker stopped accepting batches, cleaning up");

    if let Some((bus, sink_handle)) = local_bus {
        // Dropping the last sender closes the channel and stops the sink.
        drop(bus);
        match tokio::time::timeout(Duration::from_secs(5), sink_handle).await {
            Ok(Ok(logged)) => tracing::info!(logged, "Local sink stopped"),
            _ => tracing::warn!("Local sink did not stop cleanly"),
        }
    }

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
