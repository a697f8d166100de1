use crate::campaign::{CampaignParameters, IntakeProfile};
use crate::cli::{GenerationArgs, SessionArgs};
use crate::config::{self, PlannerConfig, LM_COMMAND_ENV};
use crate::lm::GenerationClient;
use crate::pipeline::CallOptions;
use crate::session::{self, SessionPaths};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve `--session`, defaulting to `<data dir>/mplan/default`.
pub(crate) fn session_root(args: &SessionArgs) -> Result<PathBuf> {
    if let Some(root) = &args.session {
        return Ok(root.clone());
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("mplan").join("default"))
        .ok_or_else(|| anyhow!("cannot determine a data directory; pass --session <DIR>"))
}

/// Session paths plus its loaded config.
pub(crate) struct SessionContext {
    pub(crate) paths: SessionPaths,
    pub(crate) config: PlannerConfig,
}

impl SessionContext {
    pub(crate) fn load(args: &SessionArgs) -> Result<Self> {
        let paths = SessionPaths::new(session_root(args)?);
        let config = config::load_config(&paths)?;
        Ok(Self { paths, config })
    }

    /// Read the campaign form and validate it under the intake profile.
    pub(crate) fn submission(
        &self,
        params_path: Option<&Path>,
        profile: Option<IntakeProfile>,
    ) -> Result<CampaignParameters> {
        let form_path = params_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.campaign_path());
        if !form_path.is_file() {
            return Err(anyhow!(
                "missing campaign form at {} (run `mplan init --session {}` or pass --params)",
                form_path.display(),
                self.paths.root().display()
            ));
        }
        let form = session::load_form(&form_path)?;
        let profile = profile.unwrap_or(self.config.intake_profile);
        form.submit(profile)
            .with_context(|| format!("validate campaign form {}", form_path.display()))
    }

    /// Build the generation client for this invocation.
    pub(crate) fn client(&self, args: &GenerationArgs) -> Result<Box<dyn GenerationClient>> {
        let backend = config::resolve_backend(
            &self.config,
            args.lm.as_deref(),
            std::env::var(LM_COMMAND_ENV).ok(),
        );
        tracing::info!(backend = %backend.describe(), "generation backend");
        let client = config::build_client(&backend, |name| std::env::var(name).ok())
            .context("configure generation backend")?;
        Ok(client)
    }

    pub(crate) fn call_options(&self, args: &GenerationArgs) -> CallOptions {
        CallOptions {
            timeout: Some(config::resolve_timeout(&self.config, args.timeout_secs)),
            cancel: None,
        }
    }
}
