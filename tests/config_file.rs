use std::fs;
use tempfile::TempDir;

use refmonster::config::Config;

#[test]
fn test_missing_file_is_created_from_template() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");
    let path_str = path.to_string_lossy().to_string();

    let config = Config::load_from(Some(&path_str)).unwrap();
    assert!(path.exists());
    assert_eq!(config.search.max_concurrency, 6);

    // The template itself parses to the defaults
    let reloaded = Config::load_from(Some(&path_str)).unwrap();
    assert_eq!(reloaded.openai.model, "gpt-5");
    assert_eq!(reloaded.openai.api_key, "${OPENAI_API_KEY}");
    assert_eq!(reloaded.server.port, 31337);
}

#[test]
fn test_set_and_save_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    let path_str = path.to_string_lossy().to_string();

    let mut config = Config::load_from(Some(&path_str)).unwrap();
    config.set_value("search.max_concurrency", "3").unwrap();
    config.set_value("openai.structured_output", "true").unwrap();
    config.save(&path).unwrap();

    let reloaded = Config::load_from(Some(&path_str)).unwrap();
    assert_eq!(reloaded.get_value("search.max_concurrency").unwrap(), "3");
    assert!(reloaded.openai.structured_output);
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    let path_str = path.to_string_lossy().to_string();

    fs::write(&path, "[search]\nmax_concurrency = 0\n").unwrap();
    assert!(Config::load_from(Some(&path_str)).is_err());

    fs::write(&path, "[openai\nmodel = ").unwrap();
    let err = Config::load_from(Some(&path_str)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
