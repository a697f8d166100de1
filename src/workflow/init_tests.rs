use super::init_session;
use crate::campaign::{CampaignForm, IntakeProfile};
use crate::config;
use crate::session::{self, SessionPaths};

#[test]
fn init_writes_config_and_a_valid_starter_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = SessionPaths::new(dir.path().join("brand-x"));

    init_session(&paths, false).expect("init");

    let config = config::load_config(&paths).expect("config");
    assert_eq!(config.schema_version, config::CONFIG_SCHEMA_VERSION);
    let form = session::load_form(&paths.campaign_path()).expect("form");
    form.submit(IntakeProfile::Full).expect("starter form validates");
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = SessionPaths::new(dir.path().to_path_buf());
    init_session(&paths, false).expect("first init");

    let err = init_session(&paths, false).expect_err("second init");
    assert!(err.to_string().contains("--force"), "{err}");
}

#[test]
fn force_rewrites_an_edited_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = SessionPaths::new(dir.path().to_path_buf());
    init_session(&paths, false).expect("init");

    let edited = CampaignForm {
        objective: Some("Edited".to_string()),
        ..CampaignForm::default()
    };
    session::write_form(&paths.campaign_path(), &edited).expect("edit");
    init_session(&paths, true).expect("force init");

    let form = session::load_form(&paths.campaign_path()).expect("form");
    assert_eq!(form.objective, CampaignForm::example().objective);
}
