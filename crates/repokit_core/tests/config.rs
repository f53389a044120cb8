use repokit_core::{default_log_level, DbConfig, LoggingConfig};
use std::time::Duration;

#[test]
fn db_config_fills_missing_fields_with_defaults() {
    let config: DbConfig = serde_json::from_str(r#"{ "busy_timeout_ms": 250 }"#).unwrap();
    assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    assert!(config.foreign_keys);

    let empty: DbConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, DbConfig::default());
}

#[test]
fn logging_config_deserializes_partial_documents() {
    let config: LoggingConfig =
        serde_json::from_str(r#"{ "log_dir": "/var/log/repokit", "max_files": 2 }"#).unwrap();
    assert_eq!(config.log_dir.to_str(), Some("/var/log/repokit"));
    assert_eq!(config.max_files, 2);
    assert_eq!(config.level, default_log_level());
    assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
}
