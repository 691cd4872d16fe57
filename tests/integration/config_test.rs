use std::fs;

use hostwatch::core::config::AgentConfig;
use tempfile::TempDir;

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "broker": { "host": "mqtt.lan" }, "cadences": { "disk_secs": 5 } }"#,
    )
    .unwrap();

    let config = AgentConfig::from_file(&path).unwrap();

    assert_eq!(config.broker.host, "mqtt.lan");
    assert_eq!(config.broker.port, 1883);
    assert_eq!(config.cadences.disk_secs, 5);
    assert_eq!(config.cadences.fast_secs, 1);
    assert_eq!(config.topic_prefix, "sys/agents");
}

#[test]
fn test_invalid_json_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = AgentConfig::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.json"));
}

#[test]
fn test_load_explicit_path_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "cadences": { "publish_secs": 0 } }"#).unwrap();

    assert!(AgentConfig::load(Some(&path)).is_err());
}

#[test]
fn test_missing_explicit_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(AgentConfig::load(Some(&dir.path().join("absent.json"))).is_err());
}

#[test]
fn test_config_roundtrips_through_json() {
    let mut config = AgentConfig::default();
    config.hostname = Some("rack-7".to_string());
    config.broker.username = Some("agent".to_string());

    let text = serde_json::to_string(&config).unwrap();
    let back: AgentConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}
