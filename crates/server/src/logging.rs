//! Logging to stderr and a per-session log file.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the life of the process.
pub fn setup_logging(log_dir: Option<&Path>, session_id: Option<&str>) -> Result<WorkerGuard> {
    let session_id = session_id
        .map(str::to_owned)
        .unwrap_or_else(|| format!("session_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

    let session_log_dir = log_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_dir)
        .join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!("Failed to create log directory: {}", session_log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "server.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(session = %session_id, "Logging initialized");
    tracing::info!("Log file: {}/server.log", session_log_dir.display());

    Ok(guard)
}

/// Platform cache directory for logs.
///
/// - macOS: `~/Library/Caches/sim-server/logs`
/// - Linux: `~/.cache/sim-server/logs` (or `$XDG_CACHE_HOME/sim-server/logs`)
/// - Windows: `%LOCALAPPDATA%\sim-server\cache\logs`
/// - Fallback: `/tmp/sim-server/logs`
fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "sim-server")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/sim-server"))
        .join("logs")
}
