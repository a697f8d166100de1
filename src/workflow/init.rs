//! Workflow init step.
//!
//! Init writes a default config and a starter campaign form so `validate`
//! and `run` have something to work from.
use super::context::session_root;
use crate::campaign::CampaignForm;
use crate::cli::InitArgs;
use crate::config;
use crate::session::{self, SessionPaths};
use anyhow::{anyhow, Context, Result};
use std::fs;

/// Run the init step, creating the session directory and its defaults.
pub fn run_init(args: &InitArgs) -> Result<()> {
    let paths = SessionPaths::new(session_root(&args.session)?);
    init_session(&paths, args.force)?;
    println!(
        "edit {} then run `mplan validate --session {}`",
        paths.campaign_path().display(),
        paths.root().display()
    );
    Ok(())
}

fn init_session(paths: &SessionPaths, force: bool) -> Result<()> {
    let config_path = paths.config_path();
    if config_path.is_file() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    fs::create_dir_all(paths.root())
        .with_context(|| format!("create session dir {}", paths.root().display()))?;
    config::write_config(paths, &config::default_config())?;
    println!("wrote {}", config_path.display());

    let campaign_path = paths.campaign_path();
    if campaign_path.is_file() && !force {
        println!("kept {}", campaign_path.display());
    } else {
        session::write_form(&campaign_path, &CampaignForm::example())?;
        println!("wrote {}", campaign_path.display());
    }
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
