//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this module only holds
//! the settings and the log file housekeeping.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Prefix of every log file name
const LOG_FILE_PREFIX: &str = "orbflow_";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: `trace`, `debug`, `info`, `warn`, `error` or `off`
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a timestamped file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Number of log files kept; older ones are deleted (0 keeps all)
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_log_files: 10,
        }
    }
}

impl LogConfig {
    /// Level filter for `level`; unknown names fall back to `INFO`
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        }
    }

    /// Create the log directory when file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of the log file for a run started now
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.log_directory.join(format!("{LOG_FILE_PREFIX}{stamp}.log"))
    }

    /// Delete the oldest log files so that at most `max_log_files - 1` remain,
    /// leaving room for the file about to be created.
    pub fn cleanup_old_logs(&self) -> io::Result<()> {
        if self.max_log_files == 0 || !self.log_directory.is_dir() {
            return Ok(());
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "log")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
            })
            .collect();

        let keep = self.max_log_files - 1;
        if logs.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort chronologically
        logs.sort();
        for path in &logs[..logs.len() - keep] {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
