//! Shared test infrastructure for integration tests.
//!
//! Each test gets a temp directory holding a session and a stub generation
//! script. The stub answers every prompt with `<stage>: texto gerado` and
//! fails a stage while a `fail_<stage>` file sits next to it.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const STUB_SCRIPT: &str = r#"#!/bin/sh
prompt=$(cat)
case "$prompt" in
  *"Crie um plano detalhado"*) stage=combined ;;
  *"Recomendação Estratégica** da campanha"*) stage=strategy ;;
  *"Distribuição de Budget** de"*) stage=budget_allocation ;;
  *"Previsão de Resultados** da campanha"*) stage=forecast ;;
  *"Recomendações de Público** da campanha"*) stage=audience ;;
  *"Cronograma Sugerido** de"*) stage=schedule ;;
  *) stage=unknown ;;
esac
dir=$(dirname "$0")
echo "$stage" >> "$dir/calls.txt"
if [ -f "$dir/fail_$stage" ]; then
  echo "stub failure on $stage" >&2
  exit 3
fi
if [ "$stage" = combined ]; then
  printf '## Recomendação Estratégica\nstrategy: texto gerado\n\n'
  printf '## Distribuição de Budget\nbudget_allocation: texto gerado\n\n'
  printf '## Previsão de Resultados\nforecast: texto gerado\n\n'
  printf '## Recomendações de Público\naudience: texto gerado\n'
  exit 0
fi
echo "$stage: texto gerado"
"#;

/// A temp session plus the stub backend that serves it.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("stub.sh"), STUB_SCRIPT).expect("write stub");
        Self { dir }
    }

    /// Workspace with `mplan init` already run.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        workspace.mplan_ok(&["init"]);
        workspace
    }

    pub fn session(&self) -> PathBuf {
        self.dir.path().join("session")
    }

    pub fn lm_command(&self) -> String {
        format!("sh {}", self.dir.path().join("stub.sh").display())
    }

    /// Make the stub fail (or stop failing) on `stage`.
    pub fn fail_on(&self, stage: &str, fail: bool) {
        let flag = self.dir.path().join(format!("fail_{stage}"));
        if fail {
            std::fs::write(&flag, b"").expect("write fail flag");
        } else {
            std::fs::remove_file(&flag).expect("remove fail flag");
        }
    }

    /// Stage labels in the order the stub was called.
    pub fn stub_calls(&self) -> Vec<String> {
        match std::fs::read_to_string(self.dir.path().join("calls.txt")) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Run `mplan <args> --session <dir>` and return the raw output.
    pub fn mplan(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mplan"))
            .args(args)
            .arg("--session")
            .arg(self.session())
            .env_remove("MPLAN_LM_COMMAND")
            .env_remove("RUST_LOG")
            .env_remove("GEM_API_KEY")
            .output()
            .expect("run mplan")
    }

    pub fn mplan_ok(&self, args: &[&str]) -> String {
        let output = self.mplan(args);
        assert!(
            output.status.success(),
            "mplan {args:?} failed:\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Run a command expected to fail and return its stderr.
    pub fn mplan_err(&self, args: &[&str]) -> String {
        let output = self.mplan(args);
        assert!(
            !output.status.success(),
            "mplan {args:?} unexpectedly succeeded:\n{}",
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    /// `run` against the stub backend.
    pub fn run_args(&self, extra: &[&str]) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--lm".to_string(), self.lm_command()];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        args
    }

    pub fn status_json(&self) -> Value {
        let stdout = self.mplan_ok(&["status", "--json"]);
        serde_json::from_str(&stdout).expect("parse status json")
    }

    pub fn read(&self, relative: impl AsRef<Path>) -> String {
        std::fs::read_to_string(self.session().join(relative)).expect("read session file")
    }

    pub fn history_steps(&self) -> Vec<(String, bool)> {
        self.read("history.jsonl")
            .lines()
            .map(|line| {
                let entry: Value = serde_json::from_str(line).expect("history line");
                (
                    entry["step"].as_str().unwrap_or_default().to_string(),
                    entry["success"].as_bool().unwrap_or_default(),
                )
            })
            .collect()
    }
}

pub fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
