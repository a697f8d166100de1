//! Session configuration.
//!
//! `config.json` selects the generation backend, the per-call timeout and the
//! intake/funnel policies. A missing file means defaults; an explicit backend
//! in the file is overridden only by the `--lm` flag.
use crate::campaign::IntakeProfile;
use crate::funnel::FunnelPolicy;
use crate::lm::{
    CommandClient, GeminiClient, GenerationClient, GenerationError, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL,
};
use crate::session::{write_atomic, SessionPaths};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable naming a generation command when no backend is set.
pub const LM_COMMAND_ENV: &str = "MPLAN_LM_COMMAND";

/// Environment variable holding the Gemini API key by default.
pub const DEFAULT_API_KEY_ENV: &str = "GEM_API_KEY";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Where generated text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Gemini {
        model: String,
        api_key_env: String,
        base_url: String,
    },
    Command {
        command: String,
    },
}

impl BackendConfig {
    pub fn default_gemini() -> Self {
        BackendConfig::Gemini {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Short description for status output.
    pub fn describe(&self) -> String {
        match self {
            BackendConfig::Gemini { model, .. } => format!("gemini ({model})"),
            BackendConfig::Command { command } => format!("command ({command})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub schema_version: u32,
    /// `None` defers to `MPLAN_LM_COMMAND`, then the Gemini default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub funnel_policy: FunnelPolicy,
    #[serde(default)]
    pub intake_profile: IntakeProfile,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Config used when a session has no `config.json`.
pub fn default_config() -> PlannerConfig {
    PlannerConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        backend: None,
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        funnel_policy: FunnelPolicy::default(),
        intake_profile: IntakeProfile::default(),
    }
}

/// Load and validate `config.json`, falling back to defaults when absent.
pub fn load_config(paths: &SessionPaths) -> Result<PlannerConfig> {
    let path = paths.config_path();
    if !path.is_file() {
        return Ok(default_config());
    }
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: PlannerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(paths: &SessionPaths, config: &PlannerConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config).context("serialize config")?;
    write_atomic(&paths.config_path(), text.as_bytes())
}

pub fn validate_config(config: &PlannerConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.timeout_secs == 0 {
        return Err(anyhow!("timeout_secs must be greater than zero"));
    }
    match &config.backend {
        Some(BackendConfig::Command { command }) if command.trim().is_empty() => {
            Err(anyhow!("backend.command must be non-empty"))
        }
        Some(BackendConfig::Gemini {
            model, api_key_env, ..
        }) if model.trim().is_empty() || api_key_env.trim().is_empty() => Err(anyhow!(
            "backend.model and backend.api_key_env must be non-empty"
        )),
        _ => Ok(()),
    }
}

/// Pick the backend: `--lm` flag, then config, then `MPLAN_LM_COMMAND`, then
/// the Gemini default.
pub fn resolve_backend(
    config: &PlannerConfig,
    lm_flag: Option<&str>,
    env_command: Option<String>,
) -> BackendConfig {
    let non_blank = |value: &str| !value.trim().is_empty();
    if let Some(command) = lm_flag.filter(|value| non_blank(value)) {
        return BackendConfig::Command {
            command: command.to_string(),
        };
    }
    if let Some(backend) = &config.backend {
        return backend.clone();
    }
    match env_command.filter(|value| non_blank(value)) {
        Some(command) => BackendConfig::Command { command },
        None => BackendConfig::default_gemini(),
    }
}

/// Per-call timeout: the flag wins over the config.
pub fn resolve_timeout(config: &PlannerConfig, flag_secs: Option<u64>) -> Duration {
    Duration::from_secs(flag_secs.unwrap_or(config.timeout_secs).max(1))
}

/// Construct the generation client, reading secrets through `env`.
pub fn build_client(
    backend: &BackendConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn GenerationClient>, GenerationError> {
    match backend {
        BackendConfig::Command { command } => {
            Ok(Box::new(CommandClient::from_command_line(command)?))
        }
        BackendConfig::Gemini {
            model,
            api_key_env,
            base_url,
        } => {
            let api_key = env(api_key_env)
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    GenerationError::Configuration(format!(
                        "{api_key_env} is not set; export a Gemini API key or configure a command backend (--lm or {LM_COMMAND_ENV})"
                    ))
                })?;
            Ok(Box::new(GeminiClient::new(base_url, model, api_key)?))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
