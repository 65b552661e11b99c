use super::*;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = RuntimeConfig::default();
    assert_eq!(config.log.level, "info");
    assert_eq!(config.types.initial_capacity, 256);
    assert!(!config.equality.defer_fails);
    assert_eq!(config.equality.assert_render_limit, 200);
}

#[test]
fn test_parse_config() {
    let toml = r#"
[log]
level = "debug"
format = "json"

[equality]
defer_fails = true
"#;

    let config = RuntimeConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.format, LogFormatName::Json);
    assert!(config.equality.defer_fails);
    // untouched sections keep their defaults
    assert_eq!(config.equality.assert_render_limit, 200);
    assert!(config.types.log_registrations);
}

#[test]
fn test_parse_error_is_value_error() {
    let err = RuntimeConfig::from_toml_str("[log\nlevel=").unwrap_err();
    assert_eq!(err.kind(), &crate::error::ErrorKind::ValueError);
    assert!(err.message().starts_with("Failed to parse config"));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[types]\ninitial_capacity = 1024").unwrap();
    let config = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.types.initial_capacity, 1024);
}

#[test]
fn test_missing_file() {
    let err = RuntimeConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert_eq!(err.kind(), &crate::error::ErrorKind::RuntimeError);
}

#[test]
fn test_toml_roundtrip() {
    let mut config = RuntimeConfig::default();
    config.log.directory = Some("/tmp/logs".to_string());
    let text = config.to_toml_string().unwrap();
    assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn test_log_config_translation() {
    let mut config = RuntimeConfig::default();
    config.log.level = "trace".to_string();
    config.log.directory = Some("/tmp/logs".to_string());
    let log = config.log_config();
    assert_eq!(log.level, tracing::Level::TRACE);
    assert!(matches!(log.output, LogOutput::File { .. }));
}
