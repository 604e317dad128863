use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::modules::paths::get_log_dir;

/// Where a binary sends its logs.
pub struct LogTarget<'a> {
    /// Prefix of the daily rolling file in the log directory
    pub file_name: &'a str,
    /// Most verbose level shown on stderr; the file always follows `RUST_LOG`
    pub console_level: LevelFilter,
}

impl LogTarget<'_> {
    /// Long-running gateway: everything on the console.
    pub fn gateway() -> Self {
        LogTarget {
            file_name: "gateway.log",
            console_level: LevelFilter::TRACE,
        }
    }

    /// Terminal client: stdout carries the profile, so only warnings reach stderr.
    pub fn session() -> Self {
        LogTarget {
            file_name: "session.log",
            console_level: LevelFilter::WARN,
        }
    }
}

struct LocalTimer;

impl fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().to_rfc3339())
    }
}

/// Install the global subscriber for `target`.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. `None` means logging goes to stderr only.
#[must_use]
pub fn init_logger(target: LogTarget<'_>) -> Option<WorkerGuard> {
    let _ = tracing_log::LogTracer::init();

    let file = match get_log_dir() {
        Ok(dir) => open_log_file(&dir, target.file_name),
        Err(e) => {
            eprintln!("Failed to initialize log directory: {}", e);
            None
        }
    };

    let (file_layer, guard) = match file {
        Some((writer, guard)) => {
            let layer = fmt::Layer::new()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(LocalTimer)
        .with_filter(target.console_level);

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!(
        file = target.file_name,
        persisted = guard.is_some(),
        "Logging initialized"
    );
    guard
}

fn open_log_file(
    dir: &Path,
    file_name: &str,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !is_log_dir_writable(dir) {
        eprintln!("Log directory {} is not writable, logging to stderr only", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}

fn is_log_dir_writable(dir: &Path) -> bool {
    let probe = dir.join(".write_test");
    let result = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&probe)
        .and_then(|mut f| f.write_all(b"ok"));

    if result.is_ok() {
        let _ = fs::remove_file(probe);
        true
    } else {
        false
    }
}
