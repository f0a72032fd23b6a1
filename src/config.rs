use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from watcher.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct WatcherConfig {
    pub monitor: MonitorConfig,
    pub console: ConsoleConfig,
    pub host: HostConfig,
}

/// Scheduler settings. Changing either field at runtime disarms the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Highest codepoint still counted as a single display column.
    pub narrow_max: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tick_millis: u64,
    pub status_file: PathBuf,
}

// --- Default implementations ---

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { narrow_max: 0x7E }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_millis: 100,
            status_file: PathBuf::from("watcher.status"),
        }
    }
}

impl WatcherConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::from_toml(&contents)
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: WatcherConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler and host loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.monitor.interval_secs)?;
        if self.host.tick_millis == 0 {
            return Err(ConfigError::InvalidTickRate);
        }
        Ok(())
    }
}

/// Longest accepted monitoring interval: one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// The monitoring interval must be between 1 second and [`MAX_INTERVAL_SECS`].
pub fn validate_interval(interval_secs: u64) -> Result<(), ConfigError> {
    if interval_secs == 0 || interval_secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::InvalidInterval { value: interval_secs });
    }
    Ok(())
}

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        source: toml::de::Error,
    },
    InvalidInterval {
        value: u64,
    },
    InvalidTickRate,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { source } => write!(f, "failed to parse config: {source}"),
            ConfigError::InvalidInterval { value } => {
                write!(
                    f,
                    "interval_secs must be between 1 and {MAX_INTERVAL_SECS} (got {value})"
                )
            }
            ConfigError::InvalidTickRate => write!(f, "tick_millis must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source } => Some(source),
            ConfigError::InvalidInterval { .. } | ConfigError::InvalidTickRate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = WatcherConfig::default();
        assert!(!config.monitor.enabled);
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.console.narrow_max, 0x7E);
        assert_eq!(config.host.tick_millis, 100);
        assert_eq!(config.host.status_file, PathBuf::from("watcher.status"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = WatcherConfig::from_toml("[monitor]\nenabled = true\n").unwrap();
        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.host.tick_millis, 100);
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
[monitor]
enabled = true
interval_secs = 3

[console]
narrow_max = 255

[host]
tick_millis = 50
status_file = "/tmp/w.status"
"#;
        let config = WatcherConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.monitor,
            MonitorConfig {
                enabled: true,
                interval_secs: 3
            }
        );
        assert_eq!(config.console.narrow_max, 255);
        assert_eq!(config.host.tick_millis, 50);
        assert_eq!(config.host.status_file, PathBuf::from("/tmp/w.status"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = WatcherConfig::from_toml("[monitor]\ninterval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { value: 0 }));
        assert!(err.to_string().contains("between 1 and 86400"));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let err = WatcherConfig::from_toml(
            "[monitor]\nenabled = true\ninterval_secs = 9223372036854775807\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { value: 9223372036854775807 }));

        let err = validate_interval(MAX_INTERVAL_SECS + 1).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { .. }));
        assert!(validate_interval(MAX_INTERVAL_SECS).is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let err = WatcherConfig::from_toml("[host]\ntick_millis = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTickRate));
    }

    #[test]
    fn test_negative_interval_is_parse_error() {
        let err = WatcherConfig::from_toml("[monitor]\ninterval_secs = -5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = WatcherConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.monitor, MonitorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("watcher.toml");
        std::fs::write(&path, "[monitor]\nenabled = true\ninterval_secs = 7\n").unwrap();
        let config = WatcherConfig::load(&path).unwrap();
        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.interval_secs, 7);
    }
}
