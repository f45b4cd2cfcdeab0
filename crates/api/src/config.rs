use std::str::FromStr;

/// Where task records, users and the queue live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBackend {
    /// PostgreSQL stores and the `task_queue` table.
    Postgres,
    /// In-process stores and queue. Single process only.
    Memory,
}

impl FromStr for TaskBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(TaskBackend::Postgres),
            "memory" => Ok(TaskBackend::Memory),
            other => Err(format!("unknown task backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for embedded workers (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Storage and queue backend (default: `postgres`).
    pub backend: TaskBackend,
    /// Run worker loops inside the API process. Defaults to on for the
    /// `memory` backend, where no separate worker could reach the queue.
    pub embedded_workers: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                        |
    /// | `PORT`                 | `3000`                           |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                             |
    /// | `TASK_BACKEND`         | `postgres`                       |
    /// | `EMBEDDED_WORKERS`     | `true` for `memory`, else `false`|
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let backend: TaskBackend = std::env::var("TASK_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()
            .expect("TASK_BACKEND must be 'postgres' or 'memory'");

        let embedded_workers = match std::env::var("EMBEDDED_WORKERS") {
            Ok(v) => v
                .parse()
                .expect("EMBEDDED_WORKERS must be 'true' or 'false'"),
            Err(_) => backend == TaskBackend::Memory,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            backend,
            embedded_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<TaskBackend>(), Ok(TaskBackend::Memory));
        assert_eq!("postgres".parse::<TaskBackend>(), Ok(TaskBackend::Postgres));
        assert!("redis".parse::<TaskBackend>().is_err());
    }
}
