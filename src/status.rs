/// Status file: writes `watcher.status` as JSON whenever the watcher's
/// visible state changes.
///
/// Uses atomic write pattern: write to temp file then rename.
use crate::config::MonitorConfig;
use crate::cycle::{MonitorEvent, MonitorResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Watcher states written to the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    Starting,
    Idle,
    Watching,
    ErrorDetected,
    CycleFailed,
    ShuttingDown,
}

impl WatcherState {
    /// State the watcher is in right after `event`.
    pub fn after(event: &MonitorEvent) -> Self {
        match event {
            MonitorEvent::CycleStarted => WatcherState::Watching,
            MonitorEvent::ErrorDetected { .. } => WatcherState::ErrorDetected,
            MonitorEvent::CycleFailed { .. } => WatcherState::CycleFailed,
        }
    }
}

/// The JSON payload written to `watcher.status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub pid: u32,
    pub state: WatcherState,
    pub enabled: bool,
    pub interval_secs: u64,
    pub cycles: u64,
    pub last_console_text: Option<String>,
    pub last_error_time: Option<String>,
    pub last_update: DateTime<Utc>,
}

impl StatusData {
    pub fn new(
        state: WatcherState,
        config: MonitorConfig,
        cycles: u64,
        results: MonitorResult,
    ) -> Self {
        Self {
            pid: std::process::id(),
            state,
            enabled: config.enabled,
            interval_secs: config.interval_secs,
            cycles,
            last_console_text: results.last_console_text,
            last_error_time: results.last_error_time,
            last_update: Utc::now(),
        }
    }
}

/// Manages the status file lifecycle.
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    /// Create a new StatusFile writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Atomically write status data to the status file.
    ///
    /// Writes to a temporary file in the same directory, then renames
    /// to ensure readers never see a partial write.
    pub fn write(&self, data: &StatusData) -> Result<(), StatusError> {
        let json =
            serde_json::to_string_pretty(data).map_err(|e| StatusError::Serialize { source: e })?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = dir.join(format!(".watcher.status.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| StatusError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&tmp_path, &self.path).map_err(|e| StatusError::Rename {
            from: tmp_path,
            to: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    /// Write, logging instead of failing. The status file is advisory.
    pub fn update(&self, data: &StatusData) {
        if let Err(e) = self.write(data) {
            tracing::warn!(error = %e, "failed to write status file");
        }
    }

    /// Remove the status file (on clean shutdown).
    pub fn remove(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    /// Path to the status file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Errors from status file operations.
#[derive(Debug)]
pub enum StatusError {
    Serialize {
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusError::Serialize { source } => write!(f, "failed to serialize status: {source}"),
            StatusError::Write { path, source } => {
                write!(
                    f,
                    "failed to write temp status file {}: {source}",
                    path.display()
                )
            }
            StatusError::Rename { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} -> {}: {source}",
                    from.display(),
                    to.display()
                )
            }
        }
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatusError::Serialize { source } => Some(source),
            StatusError::Write { source, .. } => Some(source),
            StatusError::Rename { source, .. } => Some(source),
        }
    }
}
