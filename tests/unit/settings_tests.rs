//! Unit tests for settings clamping and defaults.

use std::time::Duration;

use quest_passer::models::settings::{
    clamp_duration, Settings, DEFAULT_SESSION_DURATION_SECS, MAX_SESSION_DURATION_SECS,
    MIN_SESSION_DURATION_SECS,
};

#[test]
fn default_duration_is_fifteen_and_a_half_minutes() {
    let settings = Settings::default();
    assert_eq!(settings.session_duration_seconds, DEFAULT_SESSION_DURATION_SECS);
    assert_eq!(settings.session_budget(), Duration::from_secs(930));
    assert!(!settings.notify_on_budget_reached);
}

#[test]
fn new_clamps_into_range() {
    assert_eq!(Settings::new(5, false).session_duration_seconds, MIN_SESSION_DURATION_SECS);
    assert_eq!(
        Settings::new(99_999, false).session_duration_seconds,
        MAX_SESSION_DURATION_SECS
    );
    assert_eq!(Settings::new(600, true).session_duration_seconds, 600);
}

#[test]
fn clamp_keeps_boundaries() {
    assert_eq!(clamp_duration(60), 60);
    assert_eq!(clamp_duration(3600), 3600);
    assert_eq!(clamp_duration(59), 60);
    assert_eq!(clamp_duration(3601), 3600);
}

#[test]
fn deserialized_values_are_normalized() {
    let parsed: Settings =
        serde_json::from_str(r#"{"session_duration_seconds": 10}"#).expect("parse");
    assert_eq!(parsed.session_duration_seconds, 10, "raw value before normalizing");
    assert_eq!(parsed.session_budget(), Duration::from_secs(60));
    assert_eq!(parsed.normalized().session_duration_seconds, 60);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let parsed: Settings = serde_json::from_str("{}").expect("parse");
    assert_eq!(parsed, Settings::default());
}
