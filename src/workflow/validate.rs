//! Workflow validate step.
//!
//! Validation checks the config and campaign form, then shows the funnel
//! stage and metrics the pipeline would use. Nothing is written.
use super::context::SessionContext;
use crate::cli::ValidateArgs;
use crate::config;
use crate::metrics;
use crate::pipeline::PipelineState;
use crate::session;
use anyhow::{anyhow, Result};
use std::path::Path;

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    let ctx = SessionContext::load(&args.session)?;
    config::validate_config(&ctx.config)?;

    let form_path = args
        .params
        .as_deref()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.paths.campaign_path());
    let form = session::load_form(&form_path)?;
    let profile = args.profile.unwrap_or(ctx.config.intake_profile);
    let params = match form.submit(profile) {
        Ok(params) => params,
        Err(err) => {
            for issue in &err.issues {
                println!("  {issue}");
            }
            return Err(anyhow!(
                "{} has {} invalid field(s)",
                form_path.display(),
                err.issues.len()
            ));
        }
    };

    let state = PipelineState::new(params, ctx.config.funnel_policy)?;
    let funnel = state.funnel();
    println!("campaign: {}", state.params().objective);
    println!("funnel: {} ({})", funnel.stage.label(), funnel.source.key());
    println!("metrics:");
    for metric in state.relevant_metrics() {
        println!("  {metric}: {}", metrics::description_of(&metric));
    }
    println!("ok");
    Ok(())
}
