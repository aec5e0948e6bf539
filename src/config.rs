//! Configuration loading and defaults for autosleepd.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Which facility to ask for the time since last user input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdleBackend {
    /// Pick the first backend that works on this host.
    #[default]
    Auto,
    /// systemd-logind `IdleHint` / `IdleSinceHint` over the system bus.
    Logind,
    /// X11 MIT-SCREEN-SAVER extension.
    X11,
    /// Win32 `GetLastInputInfo`.
    Windows,
}

/// How the suspend request is delivered to the OS.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SuspendMethod {
    /// logind where available, otherwise the platform suspend command.
    #[default]
    Auto,
    /// systemd-logind `Manager.Suspend`.
    Logind,
    /// Run `suspend_command` (or the platform default command).
    Command,
}

/// Configuration rejected by [`Config::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("idle_threshold_seconds must be greater than zero")]
    ZeroThreshold,

    #[error("poll_interval_seconds must be greater than zero")]
    ZeroInterval,

    #[error("suspend_command must name a program")]
    EmptySuspendCommand,
}

/// Main configuration for autosleepd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds without input before the system is suspended (default: 1800).
    pub idle_threshold_seconds: u64,

    /// Seconds between idle checks (default: 60).
    pub poll_interval_seconds: u64,

    /// Idle detection backend.
    pub idle_backend: IdleBackend,

    /// Suspend delivery method.
    pub suspend_method: SuspendMethod,

    /// Program and arguments used by the `command` suspend method.
    /// If unset, a platform default is used.
    pub suspend_command: Option<Vec<String>>,

    /// Dry run mode: log the suspend request instead of performing it.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_threshold_seconds: 1800,
            poll_interval_seconds: 60,
            idle_backend: IdleBackend::default(),
            suspend_method: SuspendMethod::default(),
            suspend_command: None,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the given path, the default path, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(default_path) = default_path()
            && default_path.exists()
        {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }

    /// Check invariants the monitor relies on.
    ///
    /// A poll interval longer than the threshold is allowed but delays
    /// detection, so it only produces a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_threshold_seconds == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if let Some(ref command) = self.suspend_command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::EmptySuspendCommand);
        }

        if self.poll_interval_seconds > self.idle_threshold_seconds {
            warn!(
                "poll_interval_seconds ({}) exceeds idle_threshold_seconds ({}); suspend may be late by up to one interval",
                self.poll_interval_seconds, self.idle_threshold_seconds
            );
        }

        Ok(())
    }

    /// Idle threshold as a `Duration`.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_seconds)
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// `$XDG_CONFIG_HOME/autosleepd/config.toml` (or the platform equivalent).
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autosleepd").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.idle_threshold_seconds, 1800);
        assert_eq!(config.poll_interval_seconds, 60);
        assert_eq!(config.idle_backend, IdleBackend::Auto);
        assert_eq!(config.suspend_method, SuspendMethod::Auto);
        assert!(config.suspend_command.is_none());
        assert!(!config.dry_run);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.idle_threshold(), Duration::from_secs(1800));
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut config = Config {
            idle_threshold_seconds: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroThreshold));

        config.idle_threshold_seconds = 10;
        config.poll_interval_seconds = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_validate_interval_longer_than_threshold_is_allowed() {
        let config = Config {
            idle_threshold_seconds: 30,
            poll_interval_seconds: 60,
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_suspend_command() {
        let mut config = Config {
            suspend_command: Some(vec![]),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptySuspendCommand));

        config.suspend_command = Some(vec!["  ".to_string()]);
        assert_eq!(config.validate(), Err(ConfigError::EmptySuspendCommand));

        config.suspend_command = Some(vec!["systemctl".to_string(), "suspend".to_string()]);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            idle_threshold_seconds = 900
            poll_interval_seconds = 30
            idle_backend = "x11"
            suspend_method = "command"
            suspend_command = ["loginctl", "suspend"]
            dry_run = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.idle_threshold_seconds, 900);
        assert_eq!(config.poll_interval_seconds, 30);
        assert_eq!(config.idle_backend, IdleBackend::X11);
        assert_eq!(config.suspend_method, SuspendMethod::Command);
        assert_eq!(
            config.suspend_command,
            Some(vec!["loginctl".to_string(), "suspend".to_string()])
        );
        assert!(config.dry_run);
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("poll_interval_seconds = 5").unwrap();
        assert_eq!(config.poll_interval_seconds, 5);
        assert_eq!(config.idle_threshold_seconds, 1800);
        assert_eq!(config.idle_backend, IdleBackend::Auto);
    }

    #[test]
    fn test_parse_unknown_backend_fails() {
        let result: Result<Config, _> = toml::from_str(r#"idle_backend = "wayland""#);
        assert!(result.is_err());
    }
}
