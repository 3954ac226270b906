// tests/integration/env_overrides.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use pmdispatch::config::{Settings, apply_env_overrides_from};
use pmdispatch::errors::DispatchError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_headless_switch_accepts_truthy_values() {
    for value in ["1", "true", "YES", " yes "] {
        let mut settings = Settings::default();
        apply_env_overrides_from(&mut settings, env(&[("PMDISPATCH_HEADLESS", value)])).unwrap();
        assert!(settings.headless, "{value:?} should force headless");
    }

    for value in ["0", "false", "", "nope"] {
        let mut settings = Settings::default();
        apply_env_overrides_from(&mut settings, env(&[("PMDISPATCH_HEADLESS", value)])).unwrap();
        assert!(!settings.headless, "{value:?} should not force headless");
    }
}

#[test]
fn test_close_timeout_override() {
    let mut settings = Settings::default();
    apply_env_overrides_from(&mut settings, env(&[("PMDISPATCH_CLOSE_TIMEOUT", "15")])).unwrap();
    assert_eq!(settings.close_prompt_timeout, Duration::from_secs(15));
}

#[test]
fn test_invalid_close_timeout_is_config_error() {
    let mut settings = Settings::default();
    let result = apply_env_overrides_from(&mut settings, env(&[("PMDISPATCH_CLOSE_TIMEOUT", "soon")]));
    assert!(matches!(result, Err(DispatchError::ConfigError(msg)) if msg.contains("PMDISPATCH_CLOSE_TIMEOUT")));
}

#[test]
fn test_state_dir_override() {
    let mut settings = Settings::default();
    apply_env_overrides_from(&mut settings, env(&[("PMDISPATCH_STATE_DIR", "/var/tmp/pmd")])).unwrap();
    assert_eq!(settings.resolved_state_dir(), PathBuf::from("/var/tmp/pmd"));
    assert!(settings.registry_path().ends_with("surface_registry.json"));
}

#[test]
fn test_no_environment_leaves_settings_alone() {
    let mut settings = Settings::default();
    apply_env_overrides_from(&mut settings, env(&[])).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_log_level_strings() {
    use pmdispatch::logging::parse_level_str;

    assert_eq!(parse_level_str("debug"), Some(tracing::Level::DEBUG));
    assert_eq!(parse_level_str(" WARNING "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("loud"), None);
}
