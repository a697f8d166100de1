//! Generation call logging.
//!
//! Every call the orchestrator makes is appended to `lm_log.jsonl` as one
//! JSON line:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"seq":1,"label":"strategy","duration_ms":4200,"outcome":"success",...}
//! ```
//!
//! With verbose logging the full texts are also stored as
//! `lm_log/NNN_<label>_prompt.txt` and `lm_log/NNN_<label>_response.txt`.
use super::SessionPaths;
use crate::lm::GenerationError;
use crate::pipeline::StageObserver;
use crate::util::{now_epoch_ms, truncate_string};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;

pub const LM_LOG_SCHEMA_VERSION: u32 = 1;

const PROMPT_PREVIEW_BYTES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmOutcome {
    Success,
    Failed,
}

/// A single generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmLogEntry {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the call finished.
    pub ts: u64,

    /// Call number within the session (1-indexed).
    pub seq: u32,

    /// Stage key, or `combined`.
    pub label: String,

    pub duration_ms: u64,

    pub outcome: LmOutcome,

    pub prompt_bytes: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,

    /// Stable error classification (`timeout`, `rate_limited`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_preview: Option<String>,
}

/// Append an entry to `lm_log.jsonl`.
pub fn append_lm_log(paths: &SessionPaths, entry: &LmLogEntry) -> Result<()> {
    let log_path = paths.lm_log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("create session directory for lm_log")?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open lm_log for append: {}", log_path.display()))?;
    let line = serde_json::to_string(entry).context("serialize lm_log entry")?;
    writeln!(file, "{line}").context("write lm_log entry")?;
    Ok(())
}

/// Store the full prompt and response (if any) for call `seq`.
pub fn store_lm_content(
    paths: &SessionPaths,
    seq: u32,
    label: &str,
    prompt: &str,
    response: Option<&str>,
) -> Result<()> {
    let log_dir = paths.lm_log_dir();
    fs::create_dir_all(&log_dir).context("create lm_log directory")?;
    let prompt_path = log_dir.join(format!("{seq:03}_{label}_prompt.txt"));
    fs::write(&prompt_path, prompt)
        .with_context(|| format!("write prompt: {}", prompt_path.display()))?;
    if let Some(response) = response {
        let response_path = log_dir.join(format!("{seq:03}_{label}_response.txt"));
        fs::write(&response_path, response)
            .with_context(|| format!("write response: {}", response_path.display()))?;
    }
    Ok(())
}

/// Load every entry; corrupt lines are skipped with a warning.
pub fn load_lm_log(paths: &SessionPaths) -> Result<Vec<LmLogEntry>> {
    let log_path = paths.lm_log_path();
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&log_path)
        .with_context(|| format!("open lm_log: {}", log_path.display()))?;
    let mut entries = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LmLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_num + 1, error = %err, "skip corrupt lm_log entry");
            }
        }
    }
    Ok(entries)
}

/// Orchestrator observer that writes the call log for one session.
pub struct LmLogger {
    paths: SessionPaths,
    verbose: bool,
    next_seq: Cell<u32>,
}

impl LmLogger {
    /// Continue numbering after the calls already logged in the session.
    pub fn open(paths: &SessionPaths, verbose: bool) -> Result<Self> {
        let last = load_lm_log(paths)?
            .iter()
            .map(|entry| entry.seq)
            .max()
            .unwrap_or(0);
        Ok(Self {
            paths: paths.clone(),
            verbose,
            next_seq: Cell::new(last + 1),
        })
    }

    fn take_seq(&self) -> u32 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        seq
    }

    fn write(&self, entry: LmLogEntry, prompt: &str, response: Option<&str>) {
        if let Err(err) = append_lm_log(&self.paths, &entry) {
            tracing::warn!(error = %err, "failed to append lm_log entry");
        }
        if self.verbose {
            if let Err(err) = store_lm_content(&self.paths, entry.seq, &entry.label, prompt, response)
            {
                tracing::warn!(error = %err, "failed to store lm_log content");
            }
        }
    }

    fn entry(&self, label: &str, prompt: &str, elapsed: Duration, outcome: LmOutcome) -> LmLogEntry {
        LmLogEntry {
            schema_version: LM_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            seq: self.take_seq(),
            label: label.to_string(),
            duration_ms: elapsed.as_millis() as u64,
            outcome,
            prompt_bytes: prompt.len(),
            response_bytes: None,
            error_kind: None,
            error: None,
            prompt_preview: Some(truncate_string(prompt, PROMPT_PREVIEW_BYTES)),
        }
    }
}

impl StageObserver for LmLogger {
    fn call_succeeded(&self, label: &str, prompt: &str, text: &str, elapsed: Duration) {
        let mut entry = self.entry(label, prompt, elapsed, LmOutcome::Success);
        entry.response_bytes = Some(text.len());
        self.write(entry, prompt, Some(text));
    }

    fn call_failed(&self, label: &str, prompt: &str, err: &GenerationError, elapsed: Duration) {
        let mut entry = self.entry(label, prompt, elapsed, LmOutcome::Failed);
        entry.error_kind = Some(err.kind().to_string());
        entry.error = Some(err.to_string());
        self.write(entry, prompt, None);
    }
}
