use anyhow::Result;
use clap::Parser;

mod campaign;
mod cli;
mod config;
mod document;
mod funnel;
mod lm;
mod metrics;
mod pipeline;
mod prompts;
mod sections;
mod session;
mod util;
mod workflow;

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();

    // `RUST_LOG` wins; otherwise warnings only unless --verbose.
    let level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    workflow::dispatch(args)
}
