//! Session directory persistence.
//!
//! A session owns one campaign submission and its pipeline state. The state is
//! stored with a digest of the submitted parameters; reopening with the same
//! submission resumes it, while a different submission starts over.
mod history;
mod lm_log;
mod paths;

pub use history::{append_history, load_history, HistoryEntry};
pub use lm_log::{load_lm_log, LmLogger, LmOutcome};
pub use paths::SessionPaths;

use crate::campaign::{CampaignForm, CampaignParameters};
use crate::funnel::FunnelPolicy;
use crate::pipeline::PipelineState;
use crate::util::sha256_hex;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

/// SHA-256 of the canonical JSON of a submission.
pub fn submission_digest(params: &CampaignParameters, policy: FunnelPolicy) -> Result<String> {
    let canonical = serde_json::to_vec(&(params, policy)).context("serialize submission")?;
    Ok(sha256_hex(&canonical))
}

/// How [`Session::open`] obtained its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// No stored state existed.
    Created,
    /// Stored state matched the submission.
    Resumed,
    /// Stored state belonged to a different submission and was discarded.
    Replaced,
}

#[derive(Serialize, Deserialize)]
struct StoredState {
    submission_sha256: String,
    state: PipelineState,
}

/// A session directory with its loaded pipeline state.
#[derive(Debug)]
pub struct Session {
    paths: SessionPaths,
    digest: String,
    state: PipelineState,
}

impl Session {
    /// Open the session for a submission, resuming or replacing stored state.
    pub fn open(
        paths: SessionPaths,
        params: CampaignParameters,
        policy: FunnelPolicy,
    ) -> Result<(Self, Opened)> {
        let digest = submission_digest(&params, policy)?;
        let (state, opened) = match load_stored(&paths)? {
            Some(stored) if stored.submission_sha256 == digest => (stored.state, Opened::Resumed),
            Some(_) => {
                tracing::info!(session = %paths.root().display(), "submission changed; resetting state");
                (PipelineState::new(params, policy)?, Opened::Replaced)
            }
            None => (PipelineState::new(params, policy)?, Opened::Created),
        };
        Ok((
            Self {
                paths,
                digest,
                state,
            },
            opened,
        ))
    }

    /// Load the stored state without a new submission.
    pub fn load(paths: SessionPaths) -> Result<Self> {
        let stored = load_stored(&paths)?.ok_or_else(|| {
            anyhow!(
                "no pipeline state in {} (run `mplan run` or `mplan step` first)",
                paths.root().display()
            )
        })?;
        Ok(Self {
            paths,
            digest: stored.submission_sha256,
            state: stored.state,
        })
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PipelineState {
        &mut self.state
    }

    /// Discard every stage result, keeping the submission.
    pub fn reset(&mut self) {
        self.state = self.state.reset();
    }

    /// Persist the state atomically.
    pub fn save(&self) -> Result<()> {
        let stored = StoredState {
            submission_sha256: self.digest.clone(),
            state: self.state.clone(),
        };
        let text = serde_json::to_string_pretty(&stored).context("serialize pipeline state")?;
        write_atomic(&self.paths.state_path(), text.as_bytes())
    }
}

fn load_stored(paths: &SessionPaths) -> Result<Option<StoredState>> {
    let path = paths.state_path();
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let stored: StoredState = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse pipeline state {}", path.display()))?;
    stored
        .state
        .check_integrity()
        .with_context(|| format!("corrupt pipeline state {}", path.display()))?;
    Ok(Some(stored))
}

/// Write through a temp file in the same directory, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    temp.write_all(bytes)
        .with_context(|| format!("write temp file for {}", path.display()))?;
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Read the intake form from `campaign.json` (or another path).
pub fn load_form(path: &Path) -> Result<CampaignForm> {
    let bytes = fs::read(path).with_context(|| format!("read campaign form {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse campaign form {}", path.display()))
}

pub fn write_form(path: &Path, form: &CampaignForm) -> Result<()> {
    let text = serde_json::to_string_pretty(form).context("serialize campaign form")?;
    write_atomic(path, text.as_bytes())
}
