//! Unit tests for configuration loading and root folder resolution
//!
//! Note: Uses the serial_test crate to prevent ENV variable race
//! conditions. Tests that manipulate AURA_ROOT are marked with #[serial]
//! so they run sequentially, not in parallel.

use aura_common::config::{
    ensure_root_folder, resolve_root_folder, TomlConfig, ROOT_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_env_var_overrides_config_file() {
    env::set_var(ROOT_ENV_VAR, "/from/env");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/config")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    assert_eq!(resolved, PathBuf::from("/from/env"));

    env::remove_var(ROOT_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_overrides_env_var() {
    env::set_var(ROOT_ENV_VAR, "/from/env");

    let config = TomlConfig::default();
    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &config);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_ENV_VAR);
}

#[test]
#[serial]
fn test_default_used_when_nothing_set() {
    env::remove_var(ROOT_ENV_VAR);

    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_parse_full_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
root_folder = "/data/aura"
log_level = "debug"
youtube_access_token = "ya29.test-token"

[playlist]
title = "My History"

[throttle]
base_delay_ms = 250
large_batch_threshold = 10
"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = TomlConfig::load_from(file.path()).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/data/aura")));
    assert_eq!(config.log_level.as_deref(), Some("debug"));
    assert_eq!(config.youtube_access_token.as_deref(), Some("ya29.test-token"));
    assert_eq!(config.playlist.unwrap().title.as_deref(), Some("My History"));

    let throttle = config.throttle.unwrap();
    assert_eq!(throttle.base_delay_ms, Some(250));
    assert_eq!(throttle.large_batch_delay_ms, None);
    assert_eq!(throttle.large_batch_threshold, Some(10));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "root_folder = [not valid toml").unwrap();
    file.flush().unwrap();

    assert!(TomlConfig::load_from(file.path()).is_err());
}

#[test]
fn test_ensure_root_folder_creates_and_returns_db_path() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("aura");

    let db_path = ensure_root_folder(&root).unwrap();
    assert!(root.exists());
    assert_eq!(db_path, root.join("aura.db"));
}
