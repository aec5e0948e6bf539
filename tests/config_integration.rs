//! Integration tests for configuration loading and validation.
//!
//! These tests write real files to exercise the loading flow end to end.

use std::io::Write;

use autosleepd::config::Config;
use autosleepd::config::ConfigError;
use autosleepd::config::IdleBackend;
use autosleepd::config::SuspendMethod;
use serial_test::serial;
use tempfile::NamedTempFile;
use tempfile::TempDir;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
fn test_complete_config_loads() {
    let file = write_config(
        r#"
        idle_threshold_seconds = 1200
        poll_interval_seconds = 20
        idle_backend = "logind"
        suspend_method = "logind"
        dry_run = true
        "#,
    );

    let config = Config::load(file.path()).expect("Failed to load config");
    assert_eq!(config.idle_threshold_seconds, 1200);
    assert_eq!(config.poll_interval_seconds, 20);
    assert_eq!(config.idle_backend, IdleBackend::Logind);
    assert_eq!(config.suspend_method, SuspendMethod::Logind);
    assert!(config.dry_run);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_explicit_path_wins() {
    let file = write_config("idle_threshold_seconds = 300");

    let config = Config::load_or_default(Some(file.path())).expect("Failed to load config");
    assert_eq!(config.idle_threshold_seconds, 300);
    assert_eq!(config.poll_interval_seconds, 60);
}

#[test]
fn test_missing_explicit_path_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = Config::load_or_default(Some(missing.as_path())).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}

#[test]
fn test_invalid_toml_is_error() {
    let file = write_config("idle_threshold_seconds = \"soon\"");

    let err = Config::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}

#[test]
fn test_zero_threshold_loads_but_fails_validation() {
    let file = write_config("idle_threshold_seconds = 0");

    let config = Config::load(file.path()).expect("Failed to load config");
    assert_eq!(config.validate(), Err(ConfigError::ZeroThreshold));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_path_is_used_when_present() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("autosleepd");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(app_dir.join("config.toml"), "poll_interval_seconds = 7\n").unwrap();

    // SAFETY: serialized with the other tests touching the environment.
    unsafe { std::env::set_var("XDG_CONFIG_HOME", dir.path()) };
    let result = Config::load_or_default(None);
    unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

    assert_eq!(result.expect("Failed to load config").poll_interval_seconds, 7);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_defaults_when_no_file() {
    let dir = TempDir::new().unwrap();

    // SAFETY: serialized with the other tests touching the environment.
    unsafe { std::env::set_var("XDG_CONFIG_HOME", dir.path()) };
    let result = Config::load_or_default(None);
    unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

    let config = result.expect("Failed to load config");
    assert_eq!(config.idle_threshold_seconds, 1800);
    assert_eq!(config.poll_interval_seconds, 60);
}
