//! Command bodies for the media planning workflow.
//!
//! Each command opens the session directory, does one thing, and leaves the
//! directory consistent for the next invocation.
mod catalog;
mod context;
mod export;
mod init;
mod run;
mod status;
mod validate;

use crate::cli::{Command, RootArgs};
use anyhow::Result;

pub fn dispatch(args: RootArgs) -> Result<()> {
    let verbose = args.verbose;
    match args.command {
        Command::Init(args) => init::run_init(&args),
        Command::Validate(args) => validate::run_validate(&args),
        Command::Run(args) => run::run_run(&args, verbose),
        Command::Step(args) => run::run_step(&args, verbose),
        Command::Status(args) => status::run_status(&args),
        Command::Export(args) => export::run_export(&args),
        Command::Reset(args) => export::run_reset(&args),
        Command::Classify(args) => catalog::run_classify(&args),
        Command::Metrics(args) => catalog::run_metrics(&args),
    }
}
