use beacon_core::config::{
    AnalyticsSettings, DEFAULT_COOKIE_PATH, DEFAULT_COOKIE_USER_PERSISTENCE,
    MAX_COOKIE_USER_PERSISTENCE,
};

#[test]
fn test_analytics_settings_default() {
    let settings = AnalyticsSettings::default();

    assert_eq!(settings.google_analytics_id, None);
    assert_eq!(settings.request_key, None);
    assert!(settings.force_track_paths.is_empty());
    assert!(settings.include_content_types.is_empty());
    assert!(settings.ignore_paths.is_empty());
    assert!(settings.custom_data_providers.is_empty());
    assert_eq!(settings.cookie_user_persistence, DEFAULT_COOKIE_USER_PERSISTENCE);
    assert_eq!(settings.cookie_path, DEFAULT_COOKIE_PATH);
}

#[test]
fn test_analytics_settings_partial_yaml() {
    let yaml = r#"
google_analytics_id: UA-1234-1
ignore_paths:
  - /admin
  - /static
cookie_path: /app
"#;
    let settings = AnalyticsSettings::from_yaml_str(yaml).unwrap();

    assert_eq!(settings.google_analytics_id.as_deref(), Some("UA-1234-1"));
    assert_eq!(settings.ignore_paths, vec!["/admin", "/static"]);
    assert_eq!(settings.cookie_path, "/app");
    // Untouched fields keep their defaults
    assert_eq!(settings.cookie_user_persistence, DEFAULT_COOKIE_USER_PERSISTENCE);
}

#[test]
fn test_analytics_settings_json_round_trip() {
    let settings = AnalyticsSettings {
        ua_google_analytics_id: Some("UA-9999-2".to_string()),
        custom_data_providers: vec!["client_ip".to_string()],
        ..Default::default()
    };

    let serialized = serde_json::to_string(&settings).unwrap();
    let deserialized = AnalyticsSettings::from_json_str(&serialized).unwrap();
    assert_eq!(deserialized, settings);
}

#[test]
fn test_analytics_settings_invalid_yaml() {
    let err = AnalyticsSettings::from_yaml_str("ignore_paths: 12").unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_analytics_settings_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"request_key": "ga_account"}"#).unwrap();

    let settings = AnalyticsSettings::from_file(&path).unwrap();
    assert_eq!(settings.request_key.as_deref(), Some("ga_account"));
}

#[test]
fn test_path_policies() {
    let settings = AnalyticsSettings {
        force_track_paths: vec!["/track".to_string()],
        ignore_paths: vec!["/admin".to_string()],
        include_content_types: vec!["text/html".to_string()],
        ..Default::default()
    };

    assert!(settings.is_force_tracked("/track?x=1"));
    assert!(!settings.is_force_tracked("/blog/track"));
    assert!(settings.is_ignored("/admin/users"));
    assert!(!settings.is_ignored("/blog"));
    assert!(settings.is_content_type_included(Some("text/html; charset=utf-8")));
    assert!(!settings.is_content_type_included(Some("application/json")));
    assert!(!settings.is_content_type_included(None));
}

#[test]
fn test_content_type_without_allow_list() {
    let settings = AnalyticsSettings::default();
    assert!(settings.is_content_type_included(None));
    assert!(settings.is_content_type_included(Some("image/png")));
}

#[test]
fn test_cookie_persistence_out_of_range_is_rejected() {
    let err = AnalyticsSettings::from_yaml_str("cookie_user_persistence: 1000000000000").unwrap_err();
    assert!(err.is_configuration());

    let err = AnalyticsSettings::from_json_str(r#"{"cookie_user_persistence": -1}"#).unwrap_err();
    assert!(err.is_configuration());

    let settings = AnalyticsSettings::from_json_str(&format!(
        r#"{{"cookie_user_persistence": {}}}"#,
        MAX_COOKIE_USER_PERSISTENCE
    ))
    .unwrap();
    assert_eq!(settings.cookie_user_persistence, MAX_COOKIE_USER_PERSISTENCE);
}
