use super::{PipelineError, PipelineStage, PipelineState, ResultOrigin, StageResult};
use crate::lm::{CancelToken, GenerationClient, GenerationError, GenerationRequest};
use crate::prompts;
use crate::sections::{self, SECTION_PLACEHOLDER};
use crate::util::{now_epoch_ms, sha256_hex};
use std::time::{Duration, Instant};

/// Label used for the single call of combined mode.
pub const COMBINED_LABEL: &str = "combined";

/// Per-call limits applied to every generation request.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

/// Hooks around each generation call, keyed by the request label
/// (a stage key or [`COMBINED_LABEL`]).
pub trait StageObserver {
    fn call_started(&self, _label: &str, _prompt: &str) {}

    fn call_succeeded(&self, _label: &str, _prompt: &str, _text: &str, _elapsed: Duration) {}

    fn call_failed(&self, _label: &str, _prompt: &str, _err: &GenerationError, _elapsed: Duration) {
    }
}

pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// What a transition did for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: PipelineStage,
    /// The result was already present; no generation call was made.
    pub cached: bool,
    pub elapsed: Duration,
}

/// Render the prompt for `stage` from the state's parameters and the text of
/// the stages it depends on.
pub fn prompt_for(state: &PipelineState, stage: PipelineStage) -> Result<String, PipelineError> {
    let dependency = |dep: PipelineStage| {
        state.text(dep).ok_or_else(|| {
            PipelineError::Precondition(format!("{stage} requires {dep} to be completed first"))
        })
    };
    let params = state.params();
    let funnel = state.funnel_stage();
    let prompt = match stage {
        PipelineStage::Strategy => {
            prompts::build_strategy_prompt(params, funnel, &state.relevant_metrics())
        }
        PipelineStage::BudgetAllocation => {
            prompts::build_budget_prompt(params, funnel, dependency(PipelineStage::Strategy)?)
        }
        PipelineStage::Forecast => prompts::build_forecast_prompt(
            params,
            funnel,
            &state.relevant_metrics(),
            dependency(PipelineStage::Strategy)?,
            dependency(PipelineStage::BudgetAllocation)?,
        ),
        PipelineStage::Audience => {
            prompts::build_audience_prompt(params, funnel, dependency(PipelineStage::Strategy)?)
        }
        PipelineStage::Schedule => prompts::build_schedule_prompt(
            params,
            funnel,
            dependency(PipelineStage::Strategy)?,
            dependency(PipelineStage::BudgetAllocation)?,
        ),
    };
    Ok(prompt)
}

/// Drives a [`PipelineState`] through its stages with one generation client.
///
/// The orchestrator holds no pipeline data of its own; every operation takes
/// the state explicitly, and a failed call leaves it untouched.
pub struct Orchestrator<'a> {
    client: &'a dyn GenerationClient,
    options: CallOptions,
    observer: &'a dyn StageObserver,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a dyn GenerationClient) -> Self {
        Self {
            client,
            options: CallOptions::default(),
            observer: &NoopObserver,
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Compute the next stage. Returns `None` when the state is complete.
    pub fn advance(
        &self,
        state: &mut PipelineState,
    ) -> Result<Option<StageOutcome>, PipelineError> {
        match state.next_stage() {
            Some(stage) => self.generate_stage(state, stage).map(Some),
            None => Ok(None),
        }
    }

    /// Return `stage`, generating it only if it is the next stage and not
    /// already present.
    pub fn request_stage(
        &self,
        state: &mut PipelineState,
        stage: PipelineStage,
    ) -> Result<StageOutcome, PipelineError> {
        if state.result(stage).is_some() {
            tracing::info!(stage = %stage, "stage cached");
            return Ok(StageOutcome {
                stage,
                cached: true,
                elapsed: Duration::ZERO,
            });
        }
        match state.next_stage() {
            Some(next) if next == stage => self.generate_stage(state, stage),
            Some(next) => Err(PipelineError::Precondition(format!(
                "{stage} cannot run before {next} is completed"
            ))),
            None => Err(PipelineError::Precondition(format!(
                "pipeline already complete without {stage}"
            ))),
        }
    }

    /// Run every remaining stage in order, stopping at the first failure.
    /// Stages completed before the failure stay in `state`.
    pub fn run_batch(&self, state: &mut PipelineState) -> Result<Vec<StageOutcome>, PipelineError> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.advance(state)? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Fill an empty state from a single combined prompt. Sections missing
    /// from the response are recorded as placeholders.
    pub fn run_combined(
        &self,
        state: &mut PipelineState,
    ) -> Result<Vec<StageOutcome>, PipelineError> {
        if !state.results().is_empty() {
            return Err(PipelineError::Precondition(format!(
                "combined mode needs an empty pipeline; state is at {}",
                state.phase()
            )));
        }
        let prompt = prompts::build_combined_prompt(
            state.params(),
            state.funnel_stage(),
            &state.relevant_metrics(),
        );
        let start = Instant::now();
        let response = self
            .call(COMBINED_LABEL, &prompt)
            .map_err(|source| PipelineError::Generation {
                stage: PipelineStage::Strategy,
                source,
            })?;
        let elapsed = start.elapsed();
        let prompt_sha256 = sha256_hex(prompt.as_bytes());
        let generated_at = now_epoch_ms();

        let mut outcomes = Vec::new();
        for stage in PipelineStage::ORDER {
            let (text, origin) = match sections::section_for(&response, stage) {
                Some(text) => (text, ResultOrigin::Combined),
                None => (SECTION_PLACEHOLDER.to_string(), ResultOrigin::Placeholder),
            };
            state.record(StageResult::new(
                stage,
                text,
                origin,
                prompt_sha256.clone(),
                generated_at,
            ))?;
            outcomes.push(StageOutcome {
                stage,
                cached: false,
                elapsed,
            });
        }
        Ok(outcomes)
    }

    fn generate_stage(
        &self,
        state: &mut PipelineState,
        stage: PipelineStage,
    ) -> Result<StageOutcome, PipelineError> {
        let prompt = prompt_for(state, stage)?;
        let start = Instant::now();
        let generation_error = |source| PipelineError::Generation { stage, source };
        let raw = self.call(stage.key(), &prompt).map_err(generation_error)?;
        let text = sections::strip_leading_heading(&raw, stage);
        if text.is_empty() {
            return Err(generation_error(GenerationError::EmptyResponse));
        }
        state.record(StageResult::new(
            stage,
            text,
            ResultOrigin::Staged,
            sha256_hex(prompt.as_bytes()),
            now_epoch_ms(),
        ))?;
        Ok(StageOutcome {
            stage,
            cached: false,
            elapsed: start.elapsed(),
        })
    }

    fn call(&self, label: &str, prompt: &str) -> Result<String, GenerationError> {
        let mut request = GenerationRequest::new(label, prompt);
        request.timeout = self.options.timeout;
        request.cancel = self.options.cancel.as_ref();

        self.observer.call_started(label, prompt);
        tracing::info!(label, prompt_bytes = prompt.len(), "stage started");
        let start = Instant::now();
        let result = self.client.generate(&request);
        let elapsed = start.elapsed();
        match &result {
            Ok(text) => {
                tracing::info!(
                    label,
                    elapsed_ms = elapsed.as_millis() as u64,
                    prompt_bytes = prompt.len(),
                    response_bytes = text.len(),
                    "stage complete"
                );
                self.observer.call_succeeded(label, prompt, text, elapsed);
            }
            Err(err) => {
                tracing::warn!(
                    label,
                    kind = err.kind(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "stage failed"
                );
                self.observer.call_failed(label, prompt, err, elapsed);
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
