//! Generation commands: batch `run` and stepwise `step`.
//!
//! Both persist the state after every attempt, successful or not, so a
//! failed stage can be retried later without regenerating earlier ones.
use super::context::SessionContext;
use crate::cli::{RunArgs, StepArgs};
use crate::lm::{GenerationClient, GenerationError, GenerationRequest};
use crate::pipeline::{Orchestrator, PipelineError, PipelineStage, StageOutcome};
use crate::session::{append_history, HistoryEntry, LmLogger, Opened, Session};
use crate::util::now_epoch_ms;
use anyhow::{anyhow, Result};
use std::path::Path;

fn open_session(ctx: &SessionContext, params_path: Option<&Path>) -> Result<Session> {
    let params = ctx.submission(params_path, None)?;
    let (session, opened) = Session::open(ctx.paths.clone(), params, ctx.config.funnel_policy)?;
    match opened {
        Opened::Created => println!("new session at {}", ctx.paths.root().display()),
        Opened::Resumed => println!(
            "resuming session at {} (phase {})",
            ctx.paths.root().display(),
            session.state().phase()
        ),
        Opened::Replaced => {
            println!("campaign parameters changed; previous stages discarded");
            session.save()?;
            let entry = HistoryEntry::for_state(
                "reset",
                now_epoch_ms(),
                session.state(),
                Ok(()),
            );
            append_history(&ctx.paths, &entry)?;
        }
    }
    Ok(session)
}

fn print_outcome(outcome: &StageOutcome) {
    if outcome.cached {
        println!("{}: cached", outcome.stage);
    } else {
        println!(
            "{}: generated in {:.1}s",
            outcome.stage,
            outcome.elapsed.as_secs_f64()
        );
    }
}

/// Save state and history for every attempt, then turn a pipeline failure
/// into a CLI error.
fn finish<T>(
    session: &Session,
    step: &str,
    started: u64,
    result: Result<T, PipelineError>,
) -> Result<T> {
    session.save()?;
    let outcome = result.as_ref().map(|_| ()).map_err(ToString::to_string);
    append_history(
        session.paths(),
        &HistoryEntry::for_state(step, started, session.state(), outcome),
    )?;
    result.map_err(|err| {
        let completed = session.state().completed_stages().len();
        let failed = err
            .failed_stage()
            .map(|stage| format!(" at {stage}"))
            .unwrap_or_default();
        anyhow::Error::new(err).context(format!(
            "{step} stopped{failed} with {completed} of {} stages saved; rerun to retry",
            PipelineStage::ORDER.len()
        ))
    })
}

pub fn run_run(args: &RunArgs, verbose: bool) -> Result<()> {
    let started = now_epoch_ms();
    let ctx = SessionContext::load(&args.session)?;
    let mut session = open_session(&ctx, args.generation.params.as_deref())?;
    if session.state().is_complete() {
        println!("all stages already generated; nothing to do");
        return finish(&session, "run", started, Ok(()));
    }

    let client = ctx.client(&args.generation)?;
    let logger = LmLogger::open(&ctx.paths, verbose)?;
    let orchestrator = Orchestrator::new(client.as_ref())
        .with_options(ctx.call_options(&args.generation))
        .with_observer(&logger);
    let result = if args.combined {
        orchestrator.run_combined(session.state_mut())
    } else {
        orchestrator.run_batch(session.state_mut())
    };
    let outcomes = finish(&session, "run", started, result)?;
    for outcome in &outcomes {
        print_outcome(outcome);
    }
    println!(
        "pipeline complete; export with `mplan export --session {}`",
        ctx.paths.root().display()
    );
    Ok(())
}

pub fn run_step(args: &StepArgs, verbose: bool) -> Result<()> {
    let started = now_epoch_ms();
    let ctx = SessionContext::load(&args.session)?;
    let mut session = open_session(&ctx, args.generation.params.as_deref())?;

    let stage = match args.stage.or_else(|| session.state().next_stage()) {
        Some(stage) => stage,
        None => {
            println!("all stages already generated; nothing to do");
            return finish(&session, "step", started, Ok(()));
        }
    };
    let needs_generation = session.state().next_stage() == Some(stage);
    let result = if !needs_generation {
        // Cached reads and out-of-order requests never reach the backend.
        Orchestrator::new(&NoClient).request_stage(session.state_mut(), stage)
    } else {
        let client = ctx.client(&args.generation)?;
        let logger = LmLogger::open(&ctx.paths, verbose)?;
        let orchestrator = Orchestrator::new(client.as_ref())
            .with_options(ctx.call_options(&args.generation))
            .with_observer(&logger);
        orchestrator.request_stage(session.state_mut(), stage)
    };
    let outcome = finish(&session, "step", started, result)?;
    print_outcome(&outcome);

    let text = session
        .state()
        .text(stage)
        .ok_or_else(|| anyhow!("{stage} missing after step"))?;
    println!("\n{}\n\n{text}", stage.heading());
    Ok(())
}

/// Backend for requests the orchestrator answers without generating.
struct NoClient;

impl GenerationClient for NoClient {
    fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        Err(GenerationError::Configuration(
            "no generation backend for cached reads".to_string(),
        ))
    }
}
