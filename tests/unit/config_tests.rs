// Configuration module unit tests
// File loading, environment substitution and validation

use gifstamp::config::*;
use gifstamp::watermark::WatermarkKind;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(
        r##"
pipeline:
  workers: 3
  cache_capacity: 4
watermark:
  defaults:
    kind: text
    text: "DRAFT"
    color: "#FF0000"
    opacity: 0.4
    rotation_deg: -30
"##,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.pipeline.workers, 3);
    assert_eq!(config.pipeline.cache_capacity, 4);
    // Untouched sections keep their defaults.
    assert_eq!(config.decoder, DecoderConfig::default());
    assert_eq!(config.encoder, EncoderConfig::default());

    let wm = config.watermark.descriptor().unwrap();
    assert_eq!(wm.kind(), WatermarkKind::Text);
    assert_eq!(wm.opacity(), 0.4);
    assert_eq!(wm.color(), image::Rgba([255, 0, 0, 255]));
}

#[test]
fn test_missing_file_is_reported() {
    let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.starts_with("Failed to read config file"));
}

#[test]
fn test_malformed_yaml_is_reported() {
    let file = write_config("pipeline: [workers");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_env_var_in_file() {
    std::env::set_var("GIFSTAMP_TEST_WORKERS", "5");
    let file = write_config("pipeline:\n  workers: ${GIFSTAMP_TEST_WORKERS}\n");
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.pipeline.workers, 5);
}

#[test]
fn test_invalid_watermark_defaults_surface_on_descriptor() {
    let file = write_config("watermark:\n  defaults:\n    text: \"\"\n");
    let config = Config::from_file(file.path()).unwrap();
    let err = config.watermark.descriptor().unwrap_err();
    assert!(err.contains("watermark.defaults"));
}

#[test]
fn test_zero_max_frames_is_invalid() {
    let mut config = Config::default();
    config.decoder.max_frames = 0;
    assert!(config.validate().unwrap_err().contains("max_frames"));
}

#[test]
fn test_watchdog_duration() {
    let mut pipeline = PipelineConfig::default();
    assert_eq!(pipeline.watchdog(), Some(std::time::Duration::from_secs(30)));
    pipeline.watchdog_secs = 0;
    assert_eq!(pipeline.watchdog(), None);
}
