//! Catalog utilities that need no session.
use crate::cli::{ClassifyArgs, MetricsArgs};
use crate::funnel::{self, FunnelStage};
use crate::metrics;
use anyhow::Result;

pub fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let stage = funnel::classify(&args.text);
    println!("{} ({})", stage.key(), stage.label());
    Ok(())
}

pub fn run_metrics(args: &MetricsArgs) -> Result<()> {
    let stages: Vec<FunnelStage> = match args.stage {
        Some(stage) => vec![stage],
        None => FunnelStage::ALL.to_vec(),
    };
    for stage in stages {
        println!("{}:", stage.label());
        for metric in metrics::metrics_for(stage) {
            println!("  {metric}: {}", metrics::description_of(metric));
        }
    }
    Ok(())
}
