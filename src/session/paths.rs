//! Typed paths into a session directory.
use std::path::{Path, PathBuf};

/// Locates the files a planning session owns.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Return the `campaign.json` intake form path.
    pub fn campaign_path(&self) -> PathBuf {
        self.root.join("campaign.json")
    }

    /// Return the `state.json` pipeline state path.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }

    pub fn lm_log_path(&self) -> PathBuf {
        self.root.join("lm_log.jsonl")
    }

    /// Return the `lm_log/` directory for full prompt/response storage.
    pub fn lm_log_dir(&self) -> PathBuf {
        self.root.join("lm_log")
    }

    /// Return the `out/` directory for exported documents.
    pub fn out_dir(&self) -> PathBuf {
        self.root.join("out")
    }
}
