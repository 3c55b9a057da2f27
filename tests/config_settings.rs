use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::json;
use voicedm::config::{ConfigError, Settings};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn settings_file(name: &str, document: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("voicedm-{}-{}.json", name, std::process::id()));
    std::fs::write(&path, document).unwrap();
    path
}

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.protocol_version, "3.4");
    assert_eq!(settings.asr_default_no_input_timeout_ms, 5000);
    assert_eq!(settings.asr_default_complete_timeout_ms, 0);
    assert!(settings.device_id.starts_with("voicedm-"));
    assert!(!settings.click_to_skip);
    assert!(settings.synthesizer_command.is_none());
}

#[test]
fn test_environment_overrides_defaults() {
    let settings = Settings::layered(
        None,
        Some(vars(&[
            ("VOICEDM_ENDPOINT", "https://dm.example.org/interact"),
            ("VOICEDM_DEVICE_ID", "kiosk-7"),
            ("VOICEDM_SESSION_EXTRA", r#"{"user":"ada"}"#),
            ("VOICEDM_CLICK_TO_SKIP", "true"),
            ("VOICEDM_PASSIVITY_RETRY_DELAY_MS", "250"),
            ("VOICEDM_SYNTHESIZER_COMMAND", "espeak -s 160"),
            ("UNRELATED_ENDPOINT", "http://elsewhere"),
        ])),
    )
    .expect("valid settings");

    assert_eq!(settings.endpoint, "https://dm.example.org/interact");
    assert_eq!(settings.device_id, "kiosk-7");
    assert_eq!(settings.session_extra.get("user"), Some(&json!("ada")));
    assert!(settings.click_to_skip);
    assert_eq!(settings.passivity_retry_delay_ms, 250);
    assert_eq!(settings.synthesizer_command.as_deref(), Some("espeak -s 160"));
    assert_eq!(settings.request_timeout_ms, 10_000);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_environment_layers_over_the_file() {
    let path = settings_file(
        "layers",
        r#"{"endpoint": "http://localhost:9090/interact", "locale": "sv-SE", "session_extra": {"user": "bo"}}"#,
    );
    let settings = Settings::layered(Some(path.as_path()), Some(vars(&[("VOICEDM_LOCALE", "nb-NO")]))).expect("valid settings");
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.endpoint, "http://localhost:9090/interact");
    assert_eq!(settings.locale, "nb-NO");
    assert_eq!(settings.session_extra.get("user"), Some(&json!("bo")));
}

#[test]
fn test_bad_values_are_rejected() {
    let err = Settings::layered(None, Some(vars(&[("VOICEDM_ASR_DEFAULT_NO_INPUT_TIMEOUT_MS", "soon")]))).unwrap_err();
    assert!(matches!(err, ConfigError::Source(_)));

    let err = Settings::layered(None, Some(vars(&[("VOICEDM_SESSION_EXTRA", "[1,2]")]))).unwrap_err();
    assert!(matches!(err, ConfigError::Source(_)));

    let missing = PathBuf::from("/nonexistent/voicedm.json");
    assert!(matches!(Settings::layered(Some(missing.as_path()), Some(HashMap::new())), Err(ConfigError::Source(_))));
}

#[test]
fn test_blank_synthesizer_command_means_console() {
    let settings = Settings::layered(None, Some(vars(&[("VOICEDM_SYNTHESIZER_COMMAND", "  ")]))).expect("valid settings");
    assert!(settings.synthesizer_command.is_none());
}

#[test]
fn test_from_json_fills_defaults() {
    let settings = Settings::from_json(r#"{"endpoint": "http://localhost:9090/interact", "locale": "sv-SE"}"#)
        .expect("valid document");
    assert_eq!(settings.locale, "sv-SE");
    assert_eq!(settings.request_timeout_ms, 10_000);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_validate() {
    let missing = Settings::default();
    assert!(matches!(missing.validate(), Err(ConfigError::Missing("endpoint"))));

    let ftp = Settings { endpoint: "ftp://dm".to_string(), ..Settings::default() };
    assert!(matches!(ftp.validate(), Err(ConfigError::Invalid { key: "endpoint", .. })));
}
