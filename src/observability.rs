//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "pocket-federation.log";
const LOG_RETENTION_DAYS: u64 = 14;
const DEFAULT_FILTER: &str = "pocket_federation=info";

/// Installs the global JSON tracing subscriber.
///
/// With a `log_dir`, logs go to a daily rolling file there (old files are
/// pruned first); otherwise to stderr. Filtering follows `RUST_LOG`. Calling
/// this twice is harmless: the second subscriber is simply not installed.
pub fn init_tracing(log_dir: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    match log_dir {
        Some(dir) => {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            }
            if let Err(e) = cleanup_old_logs(dir, LOG_RETENTION_DAYS) {
                eprintln!("Failed to clean up old logs: {}", e);
            }
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let _ = builder.with_writer(appender).try_init();
            tracing::info!(log_dir = %dir.display(), "Tracing initialized");
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

/// Removes rolled log files older than `retention_days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let is_ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_ours {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > retention) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn prunes_only_expired_federation_logs() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(format!("{LOG_FILE_PREFIX}.2020-01-01"));
        let fresh = dir.path().join(format!("{LOG_FILE_PREFIX}.2099-01-01"));
        let foreign = dir.path().join("other.log");

        let month_ago = SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60);
        for path in [&stale, &foreign] {
            File::create(path).unwrap().set_modified(month_ago).unwrap();
        }
        File::create(&fresh).unwrap();

        let removed = cleanup_old_logs(dir.path(), LOG_RETENTION_DAYS).unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        init_tracing(Some(dir.path()));
        init_tracing(None);
    }
}
