use pulse_shared::SeriesKind;
use pulse_viewer::Config;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn no_env() -> config::Environment {
    Config::environment().source(Some(HashMap::new()))
}

fn env(vars: &[(&str, &str)]) -> config::Environment {
    let map = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::environment().source(Some(map))
}

#[test]
fn test_defaults_without_file() {
    let config = Config::load(None, no_env()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.endpoints.api_prefix, "/api");
    assert_eq!(config.layout().width, 800.0);
}

#[test]
fn test_partial_file_overrides_defaults() {
    let file = yaml_file(
        r#"
endpoints:
  origin: "http://localhost:3001"
  fallback_hosts:
    - "http://10.0.0.2:8001"
chart:
  width: 640
"#,
    );
    let config = Config::load(Some(file.path()), no_env()).unwrap();

    assert_eq!(config.endpoints.origin.as_deref(), Some("http://localhost:3001"));
    assert_eq!(config.endpoints.fallback_hosts, vec!["http://10.0.0.2:8001"]);
    assert_eq!(config.endpoints.request_timeout_ms, 5_000);
    assert_eq!(config.chart.width, 640.0);
    assert_eq!(config.chart.height, 300.0);

    let candidates = config.endpoint_set().metadata_candidates(SeriesKind::Scroller);
    assert_eq!(
        candidates,
        vec![
            "http://localhost:3001/api/scroller.json",
            "http://10.0.0.2:8001/scroller.json",
        ]
    );
}

#[test]
fn test_environment_overrides_file() {
    let file = yaml_file("stream:\n  interval_ms: 250\n");
    let config = Config::load(
        Some(file.path()),
        env(&[
            ("PULSE__STREAM__INTERVAL_MS", "1000"),
            ("PULSE__ENDPOINTS__FALLBACK_HOSTS", "http://a:1,http://b:2"),
        ]),
    )
    .unwrap();

    assert_eq!(config.stream.interval_ms, Some(1000));
    assert_eq!(config.endpoints.fallback_hosts, vec!["http://a:1", "http://b:2"]);

    let view = config.view_config(SeriesKind::Impact, Some("X".to_string()));
    assert_eq!(view.interval_ms(), 1000);
    assert_eq!(view.preferred_preset.as_deref(), Some("X"));
}

#[test]
fn test_validation_rejects_unusable_settings() {
    let zero_timeout = yaml_file("endpoints:\n  request_timeout_ms: 0\n");
    assert!(Config::load(Some(zero_timeout.path()), no_env()).is_err());

    let mut config = Config::default();
    config.endpoints.fallback_hosts.clear();
    assert!(config.validate().is_err());
    config.endpoints.origin = Some("http://localhost:3001".to_string());
    assert!(config.validate().is_ok());

    config = Config::default();
    config.chart.padding = 200.0;
    assert!(config.validate().is_err());

    config = Config::default();
    config.stream.interval_ms = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_http_config_conversion() {
    let config = Config::default();
    let http = config.http_config();
    assert_eq!(http.request_timeout.as_millis(), 5_000);
    assert_eq!(http.connect_timeout.as_millis(), 3_000);
}
