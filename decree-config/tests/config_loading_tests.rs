//! End-to-end configuration loading through discovery, files and environment

use decree_config::{ColorMode, ConfigProvider, FileDiscovery};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_project_file_overrides_global_file() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();
    fs::write(
        global.path().join("decree.toml"),
        "negate_flags = false\nshow_help_defaults = false\n",
    )
    .unwrap();
    fs::write(project.path().join("decree.yml"), "show_help_defaults: true\n").unwrap();

    let config = ConfigProvider::new()
        .with_discovery(FileDiscovery::with_directories(
            Some(project.path().to_path_buf()),
            Some(global.path().to_path_buf()),
        ))
        .with_env_prefix("DECREE_LOADING_TEST_")
        .load()
        .unwrap();

    assert!(!config.negate_flags());
    assert!(config.show_help_defaults());
}

#[test]
#[serial]
fn test_explicit_file_overrides_discovered_files() {
    let project = TempDir::new().unwrap();
    let global = TempDir::new().unwrap();
    let explicit = TempDir::new().unwrap();
    fs::write(project.path().join("decree.json"), r#"{"styling": {"color": "always"}}"#).unwrap();
    let explicit_path = explicit.path().join("cli.yaml");
    fs::write(&explicit_path, "styling:\n  color: never\n  max_width: 80\n").unwrap();

    let config = ConfigProvider::new()
        .with_discovery(FileDiscovery::with_directories(
            Some(project.path().to_path_buf()),
            Some(global.path().to_path_buf()),
        ))
        .with_file(&explicit_path)
        .with_env_prefix("DECREE_LOADING_TEST_")
        .load()
        .unwrap();

    assert_eq!(config.styling().color, ColorMode::Never);
    assert_eq!(config.styling().max_width, Some(80));
}

#[test]
#[serial]
fn test_loaded_overrides_serialize_only_set_fields() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("decree.toml");
    fs::write(&path, "show_help_datetime_formats = true\n").unwrap();

    let overrides = ConfigProvider::new()
        .without_discovery()
        .with_file(&path)
        .with_env_prefix("DECREE_LOADING_TEST_")
        .load_overrides()
        .unwrap();

    let yaml = serde_yaml_ng::to_string(&overrides).unwrap();
    assert_eq!(yaml.trim(), "show_help_datetime_formats: true");
}
