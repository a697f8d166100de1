use super::*;
use std::collections::BTreeMap;

fn temp_session(name: &str) -> (tempfile::TempDir, SessionPaths) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = SessionPaths::new(dir.path().join(name));
    (dir, paths)
}

fn command_config(command: &str) -> PlannerConfig {
    PlannerConfig {
        backend: Some(BackendConfig::Command {
            command: command.to_string(),
        }),
        ..default_config()
    }
}

#[test]
fn missing_config_loads_defaults() {
    let (_dir, paths) = temp_session("missing");
    let config = load_config(&paths).expect("load defaults");
    assert_eq!(config, default_config());
    assert_eq!(config.funnel_policy, FunnelPolicy::PreferExplicit);
    assert_eq!(config.intake_profile, IntakeProfile::Full);
}

#[test]
fn config_round_trips_and_fills_omitted_fields() {
    let (_dir, paths) = temp_session("roundtrip");
    let config = PlannerConfig {
        funnel_policy: FunnelPolicy::RequireExplicit,
        intake_profile: IntakeProfile::Basic,
        ..command_config("llm -m local")
    };
    write_config(&paths, &config).expect("write config");
    assert_eq!(load_config(&paths).expect("load config"), config);

    std::fs::write(paths.config_path(), r#"{"schema_version":1}"#).expect("write minimal");
    let minimal = load_config(&paths).expect("minimal config");
    assert_eq!(minimal.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(minimal.backend, None);
}

#[test]
fn rejects_unknown_schema_and_blank_backends() {
    let bad_schema = PlannerConfig {
        schema_version: 7,
        ..default_config()
    };
    assert!(validate_config(&bad_schema).is_err());
    assert!(validate_config(&command_config("  ")).is_err());
    let zero_timeout = PlannerConfig {
        timeout_secs: 0,
        ..default_config()
    };
    assert!(validate_config(&zero_timeout).is_err());
}

#[test]
fn backend_resolution_order() {
    let empty = default_config();
    let configured = command_config("from-config");

    assert_eq!(
        resolve_backend(&configured, Some("from-flag"), Some("from-env".to_string())),
        BackendConfig::Command {
            command: "from-flag".to_string()
        }
    );
    assert_eq!(
        resolve_backend(&configured, None, Some("from-env".to_string())),
        BackendConfig::Command {
            command: "from-config".to_string()
        }
    );
    assert_eq!(
        resolve_backend(&empty, None, Some("from-env".to_string())),
        BackendConfig::Command {
            command: "from-env".to_string()
        }
    );
    assert_eq!(
        resolve_backend(&empty, Some(" "), None),
        BackendConfig::default_gemini()
    );
}

#[test]
fn gemini_backend_requires_api_key() {
    let backend = BackendConfig::default_gemini();
    let err = build_client(&backend, |_| None)
        .err()
        .expect("missing key");
    assert_eq!(err.kind(), "configuration");
    assert!(err.to_string().contains(DEFAULT_API_KEY_ENV));

    let env = BTreeMap::from([(DEFAULT_API_KEY_ENV.to_string(), "secret".to_string())]);
    assert!(build_client(&backend, |name| env.get(name).cloned()).is_ok());
}

#[test]
fn timeout_flag_overrides_config() {
    let config = default_config();
    assert_eq!(
        resolve_timeout(&config, None),
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    );
    assert_eq!(resolve_timeout(&config, Some(5)), Duration::from_secs(5));
}
