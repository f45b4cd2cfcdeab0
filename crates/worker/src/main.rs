use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use asyncops_db::store::{PgTaskStore, PgUserStore, TaskStore, UserStore};
use asyncops_queue::{PgQueue, QueueBackend};
use asyncops_worker::runner::spawn_workers;
use asyncops_worker::{TaskExecutor, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for in-flight tasks on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asyncops_worker=debug,asyncops_queue=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        concurrency = config.concurrency,
        visibility_timeout_secs = config.visibility_timeout.as_secs(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = asyncops_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    asyncops_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Executors ---
    let tasks: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let queue: Arc<dyn QueueBackend> = Arc::new(PgQueue::new(pool));
    let executor = Arc::new(TaskExecutor::new(
        tasks,
        users,
        Arc::clone(&queue),
        config.pacing,
    ));

    let cancel = CancellationToken::new();
    let name = format!("worker-{}", std::process::id());
    let handles = spawn_workers(&name, executor, queue, &config, &cancel);

    shutdown_signal().await;
    cancel.cancel();

    for handle in handles {
        if tokio::time::timeout(DRAIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("Worker did not stop within drain timeout");
        }
    }
    tracing::info!("Worker shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
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
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
