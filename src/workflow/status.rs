//! Status reporting for a session.
use super::context::SessionContext;
use crate::cli::StatusArgs;
use crate::config::{self, LM_COMMAND_ENV};
use crate::funnel::FunnelSource;
use crate::pipeline::{PipelinePhase, PipelineStage, ResultOrigin};
use crate::session::{self, LmOutcome, Session};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StageStatus {
    pub stage: PipelineStage,
    pub origin: ResultOrigin,
    pub generated_at_epoch_ms: u64,
    pub chars: usize,
}

/// Everything `mplan status` reports.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub session: String,
    pub has_state: bool,
    pub objective: Option<String>,
    pub submission_sha256: Option<String>,
    pub phase: PipelinePhase,
    pub funnel_stage: Option<String>,
    pub funnel_source: Option<FunnelSource>,
    pub completed: Vec<StageStatus>,
    pub next_stage: Option<PipelineStage>,
    pub backend: String,
    pub lm_calls: usize,
    pub lm_failures: usize,
    pub history_entries: usize,
    pub next_action: String,
}

/// Summarize a session without side effects.
pub fn status_summary(ctx: &SessionContext) -> Result<StatusSummary> {
    let session = if ctx.paths.state_path().is_file() {
        Some(Session::load(ctx.paths.clone())?)
    } else {
        None
    };
    let lm_log = session::load_lm_log(&ctx.paths)?;
    let history = session::load_history(&ctx.paths)?;
    let backend =
        config::resolve_backend(&ctx.config, None, std::env::var(LM_COMMAND_ENV).ok()).describe();

    let session_dir = ctx.paths.root().display().to_string();
    let mut summary = StatusSummary {
        session: session_dir.clone(),
        has_state: session.is_some(),
        objective: None,
        submission_sha256: None,
        phase: PipelinePhase::Empty,
        funnel_stage: None,
        funnel_source: None,
        completed: Vec::new(),
        next_stage: Some(PipelineStage::Strategy),
        backend,
        lm_calls: lm_log.len(),
        lm_failures: lm_log
            .iter()
            .filter(|entry| entry.outcome == LmOutcome::Failed)
            .count(),
        history_entries: history.len(),
        next_action: format!("mplan run --session {session_dir}"),
    };
    let Some(session) = session else {
        return Ok(summary);
    };

    summary.submission_sha256 = Some(session.digest().to_string());
    let state = session.state();
    summary.objective = Some(state.params().objective.clone());
    summary.phase = state.phase();
    summary.funnel_stage = Some(state.funnel_stage().label().to_string());
    summary.funnel_source = Some(state.funnel().source);
    summary.completed = state
        .results()
        .values()
        .map(|result| StageStatus {
            stage: result.stage(),
            origin: result.origin(),
            generated_at_epoch_ms: result.generated_at_epoch_ms(),
            chars: result.text().chars().count(),
        })
        .collect();
    summary.next_stage = state.next_stage();
    summary.next_action = match state.next_stage() {
        Some(stage) => format!("mplan step --session {session_dir} --stage {stage}"),
        None => format!("mplan export --session {session_dir}"),
    };
    Ok(summary)
}

fn print_status(summary: &StatusSummary) {
    println!("session: {}", summary.session);
    if let Some(objective) = &summary.objective {
        println!("campaign: {objective}");
    }
    println!("phase: {}", summary.phase);
    if let (Some(stage), Some(source)) = (&summary.funnel_stage, summary.funnel_source) {
        println!("funnel: {stage} ({})", source.key());
    }
    for stage in PipelineStage::ORDER {
        let marker = match summary.completed.iter().find(|done| done.stage == stage) {
            Some(done) if done.origin == ResultOrigin::Placeholder => "placeholder",
            Some(_) => "done",
            None if summary.next_stage == Some(stage) => "next",
            None => "pending",
        };
        println!("  {:<18} {marker}", stage.key());
    }
    println!("backend: {}", summary.backend);
    println!(
        "lm calls: {} ({} failed)",
        summary.lm_calls, summary.lm_failures
    );
    println!("next: {}", summary.next_action);
}

pub fn run_status(args: &StatusArgs) -> Result<()> {
    let ctx = SessionContext::load(&args.session)?;
    let summary = status_summary(&ctx)?;
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize status summary")?;
        println!("{text}");
    } else {
        print_status(&summary);
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
