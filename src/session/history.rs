//! Append-only record of CLI steps run against a session.
use super::SessionPaths;
use crate::pipeline::PipelineState;
use crate::util::now_epoch_ms;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

/// One `history.jsonl` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub schema_version: u32,
    pub started_at_epoch_ms: u64,
    pub finished_at_epoch_ms: u64,
    /// CLI step name (`run`, `step`, `reset`, `export`, ...).
    pub step: String,
    pub phase: String,
    #[serde(default)]
    pub completed: Vec<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HistoryEntry {
    /// Entry describing `state` after a step that began at `started_at_epoch_ms`.
    pub fn for_state(
        step: &str,
        started_at_epoch_ms: u64,
        state: &PipelineState,
        outcome: Result<(), String>,
    ) -> Self {
        let (success, message) = match outcome {
            Ok(()) => (true, None),
            Err(message) => (false, Some(message)),
        };
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            started_at_epoch_ms,
            finished_at_epoch_ms: now_epoch_ms(),
            step: step.to_string(),
            phase: state.phase().to_string(),
            completed: state
                .completed_stages()
                .iter()
                .map(|stage| stage.key().to_string())
                .collect(),
            success,
            message,
        }
    }
}

/// Append a history entry as JSONL.
pub fn append_history(paths: &SessionPaths, entry: &HistoryEntry) -> Result<()> {
    let path = paths.history_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create session dir")?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read every history entry; a missing file is an empty history.
pub fn load_history(paths: &SessionPaths) -> Result<Vec<HistoryEntry>> {
    let path = paths.history_path();
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse {} entry {}", path.display(), index + 1))
        })
        .collect()
}
