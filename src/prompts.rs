//! Prompt rendering for each pipeline stage.
//!
//! Templates live in `prompts/*.md` and are embedded at compile time. Every
//! builder is a pure function of its inputs; placeholders are substituted in a
//! single pass so text from earlier stages is never re-expanded.
use crate::campaign::CampaignParameters;
use crate::funnel::FunnelStage;
use crate::metrics;
use crate::pipeline::PipelineStage;
use crate::util::{format_brl, format_quantity};
use std::collections::BTreeMap;

const STRATEGY_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/strategy.md"));
const BUDGET_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/budget.md"));
const FORECAST_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/forecast.md"));
const AUDIENCE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/audience.md"));
const SCHEDULE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/schedule.md"));
const COMBINED_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/combined.md"));

/// Substitute `{name}` placeholders. Unknown names are left untouched.
fn render(template: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|ch: char| !(ch.is_ascii_lowercase() || ch == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        match vars.get(name) {
            Some(value) if after[name_len..].starts_with('}') => {
                out.push_str(value);
                rest = &after[name_len + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn or_default(value: Option<&str>, fallback: &str) -> String {
    value.unwrap_or(fallback).to_string()
}

fn key_results_line(params: &CampaignParameters) -> String {
    match &params.key_results {
        None => "Padrão da etapa do funil".to_string(),
        Some(selected) => selected
            .iter()
            .map(|kr| match kr.target {
                Some(target) => format!("{} (meta: {})", kr.metric, format_quantity(target)),
                None => kr.metric.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Parameter block shared by every prompt.
fn briefing(params: &CampaignParameters, stage: FunnelStage) -> String {
    let lines = [
        format!("**Objetivo da Campanha:** {}", params.objective),
        format!("**Tipo de Campanha:** {}", params.campaign_type.label()),
        format!("**Budget Total:** {}", format_brl(params.budget)),
        format!("**Período:** {}", params.period.label()),
        format!("**Plataformas:** {}", params.platform_labels().join(", ")),
        format!("**Localização Primária:** {}", params.primary_location),
        format!(
            "**Localização Secundária:** {}",
            or_default(params.secondary_location.as_deref(), "Nenhuma")
        ),
        format!("**Tipo de Público:** {}", params.audience_type.label()),
        format!(
            "**Tipos de Criativo:** {}",
            params.creative_labels().join(", ")
        ),
        format!("**Etapa do Funil:** {}", stage.label()),
        format!("**OKRs Selecionados:** {}", key_results_line(params)),
        format!(
            "**Detalhes da Ação:** {}",
            or_default(params.action_details.as_deref(), "Não informado")
        ),
        format!(
            "**Observações:** {}",
            or_default(params.notes.as_deref(), "Nenhuma")
        ),
    ];
    lines.join("\n")
}

fn metrics_block(params: &CampaignParameters, relevant_metrics: &[String]) -> String {
    relevant_metrics
        .iter()
        .map(|metric| {
            let target = params
                .key_results
                .as_ref()
                .and_then(|selected| selected.iter().find(|kr| &kr.metric == metric))
                .and_then(|kr| kr.target);
            match target {
                Some(target) => format!(
                    "- {metric}: {} (meta: {})",
                    metrics::description_of(metric),
                    format_quantity(target)
                ),
                None => format!("- {metric}: {}", metrics::description_of(metric)),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hard constraints every stage's output must respect.
fn constraints(params: &CampaignParameters, relevant_metrics: &[String]) -> String {
    let locations = match params.secondary_location.as_deref() {
        Some(secondary) => format!(
            "- Use SOMENTE estas localizações: primária {}; secundária {}.",
            params.primary_location, secondary
        ),
        None => format!(
            "- Use SOMENTE a localização primária: {}. Não há localização secundária.",
            params.primary_location
        ),
    };
    [
        format!(
            "- Use SOMENTE estas plataformas: {}.",
            params.platform_labels().join(", ")
        ),
        format!(
            "- Use SOMENTE estes tipos de criativo: {}.",
            params.creative_labels().join(", ")
        ),
        locations,
        format!(
            "- Priorize SOMENTE estas métricas: {}.",
            relevant_metrics.join(", ")
        ),
        format!(
            "- Respeite o budget total de {} e o período de {}.",
            format_brl(params.budget),
            params.period.label()
        ),
        format!(
            "- Público principal do tipo {}.",
            params.audience_type.label()
        ),
    ]
    .join("\n")
}

fn base_vars(
    params: &CampaignParameters,
    stage: FunnelStage,
    relevant_metrics: &[String],
) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("briefing", briefing(params, stage)),
        ("constraints", constraints(params, relevant_metrics)),
        ("metrics", metrics_block(params, relevant_metrics)),
        ("funnel_stage", stage.label().to_string()),
        ("budget", format_brl(params.budget)),
        ("period", params.period.label().to_string()),
        ("weeks", params.period.weeks().to_string()),
        ("audience_type", params.audience_type.label().to_string()),
    ])
}

pub fn build_strategy_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    relevant_metrics: &[String],
) -> String {
    render(STRATEGY_TEMPLATE, &base_vars(params, stage, relevant_metrics))
}

pub fn build_budget_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    strategy_text: &str,
) -> String {
    let mut vars = base_vars(params, stage, &params.relevant_metrics(stage));
    vars.insert("strategy", strategy_text.trim().to_string());
    render(BUDGET_TEMPLATE, &vars)
}

pub fn build_forecast_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    relevant_metrics: &[String],
    strategy_text: &str,
    budget_text: &str,
) -> String {
    let mut vars = base_vars(params, stage, relevant_metrics);
    vars.insert("strategy", strategy_text.trim().to_string());
    vars.insert("budget_allocation", budget_text.trim().to_string());
    vars.insert("metric_columns", relevant_metrics.join(" | "));
    render(FORECAST_TEMPLATE, &vars)
}

pub fn build_audience_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    strategy_text: &str,
) -> String {
    let mut vars = base_vars(params, stage, &params.relevant_metrics(stage));
    vars.insert("strategy", strategy_text.trim().to_string());
    render(AUDIENCE_TEMPLATE, &vars)
}

pub fn build_schedule_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    strategy_text: &str,
    budget_text: &str,
) -> String {
    let mut vars = base_vars(params, stage, &params.relevant_metrics(stage));
    vars.insert("strategy", strategy_text.trim().to_string());
    vars.insert("budget_allocation", budget_text.trim().to_string());
    render(SCHEDULE_TEMPLATE, &vars)
}

/// Single prompt asking for all five sections at once.
pub fn build_combined_prompt(
    params: &CampaignParameters,
    stage: FunnelStage,
    relevant_metrics: &[String],
) -> String {
    let mut vars = base_vars(params, stage, relevant_metrics);
    let headings = PipelineStage::ORDER
        .iter()
        .map(|pipeline_stage| pipeline_stage.heading())
        .collect::<Vec<_>>()
        .join("\n");
    vars.insert("section_headings", headings);
    render(COMBINED_TEMPLATE, &vars)
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
