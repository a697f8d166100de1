//! Staged generation pipeline: stage identities, accumulated state, and the
//! orchestrator that advances it.
//!
//! The five stages run in a fixed order. Each stage's prompt is rendered from
//! the campaign parameters plus the text of earlier stages, so a
//! [`PipelineState`] only ever grows by appending the next stage in order.
//! Results already present are never regenerated; a failed stage leaves the
//! state exactly as it was.
mod error;
mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{CallOptions, Orchestrator, StageObserver, StageOutcome};

use crate::campaign::{CampaignParameters, ValidationError};
use crate::funnel::{self, FunnelPolicy, FunnelResolution, FunnelStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Schema version for persisted pipeline state.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// One of the five ordered generation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Strategy,
    BudgetAllocation,
    Forecast,
    Audience,
    Schedule,
}

impl PipelineStage {
    /// Fixed dependency order.
    pub const ORDER: [PipelineStage; 5] = [
        PipelineStage::Strategy,
        PipelineStage::BudgetAllocation,
        PipelineStage::Forecast,
        PipelineStage::Audience,
        PipelineStage::Schedule,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PipelineStage::Strategy => "strategy",
            PipelineStage::BudgetAllocation => "budget_allocation",
            PipelineStage::Forecast => "forecast",
            PipelineStage::Audience => "audience",
            PipelineStage::Schedule => "schedule",
        }
    }

    pub fn parse(value: &str) -> Option<PipelineStage> {
        let value = match value.trim() {
            "budget" => "budget_allocation",
            other => other,
        };
        PipelineStage::ORDER
            .into_iter()
            .find(|stage| stage.key() == value)
    }

    /// Section title used in prompts, headings and section extraction.
    pub fn title(self) -> &'static str {
        match self {
            PipelineStage::Strategy => "Recomendação Estratégica",
            PipelineStage::BudgetAllocation => "Distribuição de Budget",
            PipelineStage::Forecast => "Previsão de Resultados",
            PipelineStage::Audience => "Recomendações de Público",
            PipelineStage::Schedule => "Cronograma Sugerido",
        }
    }

    /// Markdown heading for the exported document.
    pub fn heading(self) -> String {
        let icon = match self {
            PipelineStage::Strategy => "📌",
            PipelineStage::BudgetAllocation => "📊",
            PipelineStage::Forecast => "📈",
            PipelineStage::Audience => "🎯",
            PipelineStage::Schedule => "📅",
        };
        format!("## {icon} {}", self.title())
    }

    /// Earlier stages whose text this stage's prompt embeds.
    pub fn dependencies(self) -> &'static [PipelineStage] {
        match self {
            PipelineStage::Strategy => &[],
            PipelineStage::BudgetAllocation | PipelineStage::Audience => {
                &[PipelineStage::Strategy]
            }
            PipelineStage::Forecast | PipelineStage::Schedule => {
                &[PipelineStage::Strategy, PipelineStage::BudgetAllocation]
            }
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Named position of the state machine, after the latest completed stage.
///
/// Recording the schedule result completes the pipeline, so the phase after
/// `Audience` is `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Empty,
    Strategy,
    Budget,
    Forecast,
    Audience,
    Complete,
}

impl PipelinePhase {
    fn from_completed(count: usize) -> PipelinePhase {
        match count {
            0 => PipelinePhase::Empty,
            1 => PipelinePhase::Strategy,
            2 => PipelinePhase::Budget,
            3 => PipelinePhase::Forecast,
            4 => PipelinePhase::Audience,
            _ => PipelinePhase::Complete,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Empty => "empty",
            PipelinePhase::Strategy => "strategy",
            PipelinePhase::Budget => "budget",
            PipelinePhase::Forecast => "forecast",
            PipelinePhase::Audience => "audience",
            PipelinePhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// How a stage's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// Dedicated per-stage prompt.
    Staged,
    /// Split out of a single combined response.
    Combined,
    /// Combined response lacked the section; text is a placeholder.
    Placeholder,
}

/// Text produced by one stage. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    stage: PipelineStage,
    text: String,
    origin: ResultOrigin,
    prompt_sha256: String,
    generated_at_epoch_ms: u64,
}

impl StageResult {
    pub(crate) fn new(
        stage: PipelineStage,
        text: String,
        origin: ResultOrigin,
        prompt_sha256: String,
        generated_at_epoch_ms: u64,
    ) -> Self {
        Self {
            stage,
            text,
            origin,
            prompt_sha256,
            generated_at_epoch_ms,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> ResultOrigin {
        self.origin
    }

    pub fn prompt_sha256(&self) -> &str {
        &self.prompt_sha256
    }

    pub fn generated_at_epoch_ms(&self) -> u64 {
        self.generated_at_epoch_ms
    }
}

/// Results keyed by stage; iteration follows [`PipelineStage::ORDER`].
pub type StageResults = BTreeMap<PipelineStage, StageResult>;

/// Parameters of one submission plus every stage completed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    schema_version: u32,
    params: CampaignParameters,
    funnel_policy: FunnelPolicy,
    funnel: FunnelResolution,
    #[serde(default)]
    results: StageResults,
}

impl PipelineState {
    /// Start a fresh state for a submission, resolving its funnel stage.
    pub fn new(
        params: CampaignParameters,
        funnel_policy: FunnelPolicy,
    ) -> Result<Self, ValidationError> {
        let funnel = funnel::resolve(&params.objective, params.funnel_stage, funnel_policy)
            .ok_or_else(|| {
                ValidationError::single(
                    "funnel_stage",
                    "required by the require_explicit funnel policy",
                )
            })?;
        Ok(Self {
            schema_version: STATE_SCHEMA_VERSION,
            params,
            funnel_policy,
            funnel,
            results: StageResults::new(),
        })
    }

    pub fn params(&self) -> &CampaignParameters {
        &self.params
    }

    pub fn funnel_policy(&self) -> FunnelPolicy {
        self.funnel_policy
    }

    pub fn funnel(&self) -> FunnelResolution {
        self.funnel
    }

    pub fn funnel_stage(&self) -> FunnelStage {
        self.funnel.stage
    }

    /// Metrics prompts should prioritize for this submission.
    pub fn relevant_metrics(&self) -> Vec<String> {
        self.params.relevant_metrics(self.funnel.stage)
    }

    pub fn results(&self) -> &StageResults {
        &self.results
    }

    pub fn result(&self, stage: PipelineStage) -> Option<&StageResult> {
        self.results.get(&stage)
    }

    pub fn text(&self, stage: PipelineStage) -> Option<&str> {
        self.result(stage).map(StageResult::text)
    }

    pub fn completed_stages(&self) -> Vec<PipelineStage> {
        self.results.keys().copied().collect()
    }

    pub fn phase(&self) -> PipelinePhase {
        PipelinePhase::from_completed(self.results.len())
    }

    /// The stage the next transition computes, or `None` once complete.
    pub fn next_stage(&self) -> Option<PipelineStage> {
        PipelineStage::ORDER
            .into_iter()
            .find(|stage| !self.results.contains_key(stage))
    }

    pub fn is_complete(&self) -> bool {
        self.next_stage().is_none()
    }

    /// Same parameters with every stage result discarded.
    pub fn reset(&self) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            params: self.params.clone(),
            funnel_policy: self.funnel_policy,
            funnel: self.funnel,
            results: StageResults::new(),
        }
    }

    /// Append the result for the next stage in order.
    pub(crate) fn record(&mut self, result: StageResult) -> Result<(), PipelineError> {
        let stage = result.stage;
        match self.next_stage() {
            Some(next) if next == stage => {
                self.results.insert(stage, result);
                Ok(())
            }
            Some(next) => Err(PipelineError::Precondition(format!(
                "cannot record {stage} before {next}"
            ))),
            None => Err(PipelineError::Precondition(format!(
                "pipeline already complete; {stage} is recorded"
            ))),
        }
    }

    /// Check a deserialized state: supported schema and results forming a
    /// prefix of the stage order.
    pub fn check_integrity(&self) -> Result<(), PipelineError> {
        if self.schema_version != STATE_SCHEMA_VERSION {
            return Err(PipelineError::Precondition(format!(
                "unsupported pipeline state schema_version {}",
                self.schema_version
            )));
        }
        for (position, (stage, result)) in self.results.iter().enumerate() {
            if stage.index() != position {
                return Err(PipelineError::Precondition(format!(
                    "state records {stage} without {}",
                    PipelineStage::ORDER[position]
                )));
            }
            if result.stage != *stage {
                return Err(PipelineError::Precondition(format!(
                    "result keyed {stage} belongs to {}",
                    result.stage
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignForm, IntakeProfile};

    fn state() -> PipelineState {
        let params = CampaignForm::example()
            .submit(IntakeProfile::Full)
            .expect("valid form");
        PipelineState::new(params, FunnelPolicy::PreferExplicit).expect("state")
    }

    fn result(stage: PipelineStage) -> StageResult {
        StageResult::new(
            stage,
            format!("{stage} text"),
            ResultOrigin::Staged,
            String::new(),
            0,
        )
    }

    #[test]
    fn phases_follow_recorded_stages() {
        let mut state = state();
        assert_eq!(state.phase(), PipelinePhase::Empty);
        assert_eq!(state.next_stage(), Some(PipelineStage::Strategy));
        for stage in PipelineStage::ORDER {
            state.record(result(stage)).expect("record in order");
        }
        assert_eq!(state.phase(), PipelinePhase::Complete);
        assert!(state.is_complete());
        assert_eq!(state.completed_stages(), PipelineStage::ORDER.to_vec());
    }

    #[test]
    fn record_rejects_out_of_order_and_duplicates() {
        let mut state = state();
        let err = state
            .record(result(PipelineStage::Forecast))
            .expect_err("forecast before strategy");
        assert_eq!(err.kind(), "precondition");
        state.record(result(PipelineStage::Strategy)).expect("strategy");
        let err = state
            .record(result(PipelineStage::Strategy))
            .expect_err("strategy twice");
        assert_eq!(err.kind(), "precondition");
        assert_eq!(state.text(PipelineStage::Strategy), Some("strategy text"));
    }

    #[test]
    fn dependencies_point_strictly_backwards() {
        for stage in PipelineStage::ORDER {
            for dependency in stage.dependencies() {
                assert!(dependency.index() < stage.index());
            }
        }
        assert_eq!(
            PipelineStage::Audience.dependencies(),
            &[PipelineStage::Strategy]
        );
    }

    #[test]
    fn integrity_check_rejects_gaps() {
        let mut state = state();
        state.record(result(PipelineStage::Strategy)).expect("strategy");
        let mut json = serde_json::to_value(&state).expect("serialize");
        json["results"]["forecast"] = serde_json::to_value(result(PipelineStage::Forecast))
            .expect("serialize result");
        let tampered: PipelineState = serde_json::from_value(json).expect("deserialize");
        assert!(tampered.check_integrity().is_err());
        assert!(state.check_integrity().is_ok());
    }

    #[test]
    fn require_explicit_policy_needs_a_stage() {
        let params = CampaignForm::example()
            .submit(IntakeProfile::Full)
            .expect("valid form");
        let err = PipelineState::new(params, FunnelPolicy::RequireExplicit)
            .expect_err("missing explicit stage");
        assert_eq!(err.issues[0].field, "funnel_stage");
    }

    #[test]
    fn reset_keeps_parameters_only() {
        let mut state = state();
        state.record(result(PipelineStage::Strategy)).expect("strategy");
        let fresh = state.reset();
        assert_eq!(fresh.params(), state.params());
        assert!(fresh.results().is_empty());
    }

    #[test]
    fn stage_names_parse() {
        assert_eq!(
            PipelineStage::parse("budget"),
            Some(PipelineStage::BudgetAllocation)
        );
        assert_eq!(PipelineStage::parse("schedule"), Some(PipelineStage::Schedule));
        assert_eq!(PipelineStage::parse("report"), None);
    }
}
