//! CLI argument parsing for the media planning workflow.
//!
//! Every command works against one session directory; the command bodies
//! live in `workflow`.
use crate::campaign::IntakeProfile;
use crate::funnel::FunnelStage;
use crate::pipeline::PipelineStage;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mplan",
    version,
    about = "Staged LM media plan generator",
    after_help = "Examples:\n  mplan init --session ./brand-x\n  mplan validate --session ./brand-x\n  mplan run --session ./brand-x --lm 'llm -m gemini-1.5-flash'\n  mplan step --session ./brand-x --stage forecast\n  mplan status --session ./brand-x --json\n  mplan export --session ./brand-x",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at info level and keep full prompts/responses under lm_log/
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Validate(ValidateArgs),
    Run(RunArgs),
    Step(StepArgs),
    Status(StatusArgs),
    Export(ExportArgs),
    Reset(ResetArgs),
    Classify(ClassifyArgs),
    Metrics(MetricsArgs),
}

/// Session directory shared by the stateful commands.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Session directory (defaults to the user data dir, `mplan/default`)
    #[arg(long, value_name = "DIR")]
    pub session: Option<PathBuf>,
}

/// Generation options shared by `run` and `step`.
#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Campaign form JSON (defaults to the session's campaign.json)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Generation command reading the prompt on stdin (overrides config)
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Per-call timeout in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
#[command(about = "Write a default config.json and a campaign.json stub")]
pub struct InitArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
#[command(about = "Validate the campaign form and show the resolved funnel stage")]
pub struct ValidateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Campaign form JSON (defaults to the session's campaign.json)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Intake profile: full or basic (overrides config)
    #[arg(long, value_name = "PROFILE", value_parser = parse_profile)]
    pub profile: Option<IntakeProfile>,
}

#[derive(Args, Debug)]
#[command(about = "Generate every remaining stage in order")]
pub struct RunArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Request all sections in a single prompt (empty state only)
    #[arg(long)]
    pub combined: bool,
}

#[derive(Args, Debug)]
#[command(about = "Generate one stage (the next one by default)")]
pub struct StepArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Stage to return: strategy, budget, forecast, audience, schedule
    #[arg(long, value_name = "STAGE", value_parser = parse_stage)]
    pub stage: Option<PipelineStage>,
}

#[derive(Args, Debug)]
#[command(about = "Summarize pipeline progress and the next stage")]
pub struct StatusArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(about = "Assemble the complete media plan document")]
pub struct ExportArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output path (defaults to out/plano_midia_<campaign>_<budget>.md)
    #[arg(long, value_name = "PATH", conflicts_with = "stdout")]
    pub out: Option<PathBuf>,

    /// Print the document instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Args, Debug)]
#[command(about = "Discard generated stages, keeping the submitted parameters")]
pub struct ResetArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
#[command(about = "Classify a campaign name/objective into a funnel stage")]
pub struct ClassifyArgs {
    /// Campaign name or objective
    pub text: String,
}

#[derive(Args, Debug)]
#[command(about = "List key-result metrics per funnel stage")]
pub struct MetricsArgs {
    /// Funnel stage: top, middle or bottom (all when omitted)
    #[arg(long, value_name = "STAGE", value_parser = parse_funnel_stage)]
    pub stage: Option<FunnelStage>,
}

fn parse_stage(value: &str) -> Result<PipelineStage, String> {
    PipelineStage::parse(value).ok_or_else(|| {
        format!("unknown stage {value:?} (expected strategy, budget, forecast, audience, schedule)")
    })
}

fn parse_funnel_stage(value: &str) -> Result<FunnelStage, String> {
    FunnelStage::parse(value)
        .ok_or_else(|| format!("unknown funnel stage {value:?} (expected top, middle, bottom)"))
}

fn parse_profile(value: &str) -> Result<IntakeProfile, String> {
    IntakeProfile::parse(value)
        .ok_or_else(|| format!("unknown intake profile {value:?} (expected full, basic)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_with_stage_alias() {
        let args = RootArgs::try_parse_from([
            "mplan",
            "step",
            "--session",
            "/tmp/s",
            "--stage",
            "budget",
            "--lm",
            "cat",
        ])
        .expect("parse");
        let Command::Step(step) = args.command else {
            panic!("expected step");
        };
        assert_eq!(step.stage, Some(PipelineStage::BudgetAllocation));
        assert_eq!(step.generation.lm.as_deref(), Some("cat"));
    }

    #[test]
    fn rejects_unknown_stage_and_conflicting_export_targets() {
        assert!(RootArgs::try_parse_from(["mplan", "step", "--stage", "report"]).is_err());
        assert!(
            RootArgs::try_parse_from(["mplan", "export", "--stdout", "--out", "x.md"]).is_err()
        );
    }

    #[test]
    fn verbose_is_global() {
        let args = RootArgs::try_parse_from(["mplan", "run", "--verbose", "--combined"])
            .expect("parse");
        assert!(args.verbose);
    }
}
