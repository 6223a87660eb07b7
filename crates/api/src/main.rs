use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itemkit_api::config::{DatabaseConfig, LogFormat, ServerConfig};
use itemkit_api::router::build_app_router;
use itemkit_api::state::AppState;
use itemkit_db::repositories::PgItemStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let db_config = DatabaseConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "itemkit_api=debug,itemkit_db=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_format = ?config.log_format,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = itemkit_db::create_pool(
        &db_config.url,
        db_config.max_connections,
        Duration::from_secs(5),
    )
    .await
    .expect("Failed to connect to database");
    tracing::info!(
        max_connections = db_config.max_connections,
        "Database connection pool created"
    );

    itemkit_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    if db_config.auto_migrate {
        itemkit_db::run_migrations(&pool)
            .await
            .expect("Failed to run database migrations");
        tracing::info!("Database migrations applied");
    } else {
        tracing::info!("Skipping migrations (DB_AUTO_MIGRATE=false)");
    }

    // --- App state ---
    let store = Arc::new(PgItemStore::new(pool.clone(), db_config.tx_timeout()));
    let state = AppState::new(store, config.clone(), db_config.tx_timeout());

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let draining = Arc::new(Notify::new());
    let drain_started = Arc::clone(&draining);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                drain_started.notify_one();
            })
            .await
    });

    // The drain only starts once a signal arrives; bound it from there.
    let finished_early = tokio::select! {
        joined = &mut server => Some(joined),
        () = draining.notified() => None,
    };
    match finished_early {
        Some(joined) => joined.expect("Server task panicked").expect("Server error"),
        None => {
            let drain_timeout = config.shutdown_timeout();
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(joined) => joined.expect("Server task panicked").expect("Server error"),
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = drain_timeout.as_secs(),
                        "In-flight requests did not finish in time, dropping them"
                    );
                    server.abort();
                }
            }
        }
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    pool.close().await;
    tracing::info!("Database pool closed");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
