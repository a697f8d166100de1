use super::*;
use crate::campaign::{CampaignForm, IntakeProfile};
use crate::cli::SessionArgs;
use crate::funnel::FunnelPolicy;
use crate::lm::testing::ScriptedClient;
use crate::pipeline::Orchestrator;
use crate::session::LmLogger;

fn context(dir: &tempfile::TempDir) -> SessionContext {
    SessionContext::load(&SessionArgs {
        session: Some(dir.path().join("session")),
    })
    .expect("context")
}

#[test]
fn empty_session_points_at_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let summary = status_summary(&context(&dir)).expect("summary");
    assert!(!summary.has_state);
    assert_eq!(summary.phase, PipelinePhase::Empty);
    assert_eq!(summary.next_stage, Some(PipelineStage::Strategy));
    assert!(summary.next_action.starts_with("mplan run"));
    assert_eq!(summary.lm_calls, 0);
}

#[test]
fn partial_session_reports_progress_and_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&dir);
    let params = CampaignForm::example()
        .submit(IntakeProfile::Full)
        .expect("valid form");
    let (mut session, _) =
        Session::open(ctx.paths.clone(), params, FunnelPolicy::PreferExplicit).expect("open");

    let client = ScriptedClient::new();
    client.fail_on("budget_allocation");
    let logger = LmLogger::open(&ctx.paths, false).expect("logger");
    Orchestrator::new(&client)
        .with_observer(&logger)
        .run_batch(session.state_mut())
        .expect_err("budget fails");
    session.save().expect("save");

    let summary = status_summary(&ctx).expect("summary");
    assert_eq!(summary.phase, PipelinePhase::Strategy);
    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.next_stage, Some(PipelineStage::BudgetAllocation));
    assert_eq!(summary.lm_calls, 2);
    assert_eq!(summary.lm_failures, 1);
    assert_eq!(summary.submission_sha256.as_deref(), Some(session.digest()));
    assert_eq!(summary.funnel_source, Some(FunnelSource::Classified));
    assert!(summary.next_action.ends_with("--stage budget_allocation"));
}
