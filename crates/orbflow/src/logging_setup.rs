use anyhow::{Context, Result};
use orbflow_core::LogConfig;
use std::fs::File;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Keeps the file writer thread alive; drop it last
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Install the global subscriber described by `config`.
///
/// Console output goes to stderr so stdout stays free for parameter records.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .with_context(|| format!("Failed to create log directory {:?}", config.log_directory))?;

    if config.file_output {
        if let Err(e) = config.cleanup_old_logs() {
            eprintln!("Warning: could not remove old log files: {}", e);
        }
    }

    let filter = || {
        EnvFilter::builder()
            .with_default_directive(config.parse_level().into())
            .from_env_lossy()
    };

    let console = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
    });

    let mut guard = None;
    let file = if config.file_output {
        let path = config.current_log_path();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;
        let (writer, worker) = tracing_appender::non_blocking(file);
        guard = Some(LogGuard { _worker: worker });
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!("Logging initialized (level: {})", config.level);
    Ok(guard)
}
