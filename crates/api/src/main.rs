use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use asyncops_db::store::{
    MemoryTaskStore, MemoryUserStore, PgTaskStore, PgUserStore, TaskStore, UserStore,
};
use asyncops_queue::{MemoryQueue, PgQueue, QueueBackend};
use asyncops_worker::runner::spawn_workers;
use asyncops_worker::{TaskExecutor, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asyncops_api::config::{ServerConfig, TaskBackend};
use asyncops_api::router::build_app_router;
use asyncops_api::state::AppState;

struct Backends {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    queue: Arc<dyn QueueBackend>,
}

async fn connect_backends(backend: TaskBackend) -> anyhow::Result<Backends> {
    match backend {
        TaskBackend::Memory => {
            tracing::warn!("Using in-memory task backend; state is lost on restart");
            Ok(Backends {
                tasks: Arc::new(MemoryTaskStore::new()),
                users: Arc::new(MemoryUserStore::new()),
                queue: Arc::new(MemoryQueue::new()),
            })
        }
        TaskBackend::Postgres => {
            let database_url =
                std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
            let pool = asyncops_db::create_pool(&database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            asyncops_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            asyncops_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Ok(Backends {
                tasks: Arc::new(PgTaskStore::new(pool.clone())),
                users: Arc::new(PgUserStore::new(pool.clone())),
                queue: Arc::new(PgQueue::new(pool)),
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asyncops_api=debug,asyncops_worker=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.backend,
        embedded_workers = config.embedded_workers,
        "Loaded server configuration",
    );

    let Backends {
        tasks,
        users,
        queue,
    } = connect_backends(config.backend).await?;

    // --- Embedded workers ---
    let worker_cancel = CancellationToken::new();
    let worker_handles = if config.embedded_workers {
        let worker_config = WorkerConfig::from_env();
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&tasks),
            users,
            Arc::clone(&queue),
            worker_config.pacing,
        ));
        let handles = spawn_workers(
            "embedded",
            executor,
            Arc::clone(&queue),
            &worker_config,
            &worker_cancel,
        );
        tracing::info!(concurrency = worker_config.concurrency, "Embedded workers started");
        handles
    } else {
        Vec::new()
    };

    // --- Router ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    let app = build_app_router(AppState::new(tasks, queue, config));

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    worker_cancel.cancel();
    for handle in worker_handles {
        if tokio::time::timeout(shutdown_timeout, handle).await.is_err() {
            tracing::warn!("Embedded worker did not stop within shutdown timeout");
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
