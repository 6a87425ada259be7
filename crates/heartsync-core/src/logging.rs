//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this module only
//! describes where logs go and keeps the log directory tidy.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::Level;

const LOG_PREFIX: &str = "heartsync";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a timestamped file in `log_dir`
    pub file_output: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Number of log files to keep
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: default_log_dir(),
            max_files: 10,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("HeartSync").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl LogConfig {
    /// Parsed level, INFO if unrecognized.
    pub fn parse_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }

    pub fn ensure_log_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.log_dir)
    }

    /// Path of the log file for this run.
    ///
    /// Timestamped per second so `cleanup_old_logs` can sort by name.
    pub fn current_log_path(&self) -> PathBuf {
        // Computed once per process so every call names the same file
        static STAMP: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        let stamp =
            STAMP.get_or_init(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
        self.log_dir.join(format!("{}_{}.log", LOG_PREFIX, stamp))
    }

    /// Delete the oldest log files beyond `max_files`. Returns how many were removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_PREFIX) && n.ends_with(".log"))
            })
            .collect();

        if logs.len() <= self.max_files {
            return Ok(0);
        }

        // Names embed the timestamp, so lexical order is chronological
        logs.sort();
        let excess = logs.len() - self.max_files;
        let mut removed = 0;
        for path in logs.into_iter().take(excess) {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }
}
