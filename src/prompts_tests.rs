use super::*;
use crate::campaign::{CampaignForm, IntakeProfile, KeyResult};

fn params() -> CampaignParameters {
    CampaignForm::example()
        .submit(IntakeProfile::Full)
        .expect("valid form")
}

fn default_metrics(params: &CampaignParameters) -> Vec<String> {
    params.relevant_metrics(FunnelStage::Top)
}

#[test]
fn builders_are_deterministic() {
    let params = params();
    let metrics = default_metrics(&params);
    assert_eq!(
        build_strategy_prompt(&params, FunnelStage::Top, &metrics),
        build_strategy_prompt(&params, FunnelStage::Top, &metrics)
    );
    assert_eq!(
        build_schedule_prompt(&params, FunnelStage::Top, "s", "b"),
        build_schedule_prompt(&params, FunnelStage::Top, "s", "b")
    );
}

#[test]
fn strategy_prompt_lists_every_parameter() {
    let params = params();
    let prompt = build_strategy_prompt(&params, FunnelStage::Top, &default_metrics(&params));
    for expected in [
        "Awareness Campaign - Brand X",
        "Alcance",
        "R$ 100.000,00",
        "1 month",
        "Meta Ads",
        "Google Ads",
        "MT, GO, RS",
        "SP, MG, RJ",
        "Interesses",
        "Estático",
        "Vídeo",
        "Topo de Funil (Awareness)",
        "Lançamento da nova linha de produtos",
        "Impressões",
        "CPM",
    ] {
        assert!(prompt.contains(expected), "missing {expected:?}");
    }
    assert!(!prompt.contains("{briefing}"));
    assert!(!prompt.contains("{constraints}"));
}

#[test]
fn constraints_restrict_to_selected_choices() {
    let params = params();
    let prompt = build_budget_prompt(&params, FunnelStage::Top, "estratégia");
    assert!(prompt.contains("Use SOMENTE estas plataformas: Meta Ads, Google Ads."));
    assert!(prompt.contains("Use SOMENTE estes tipos de criativo: Estático, Vídeo."));
    assert!(prompt.contains("primária MT, GO, RS; secundária SP, MG, RJ"));
}

#[test]
fn missing_secondary_location_is_stated() {
    let params = CampaignParameters {
        secondary_location: None,
        ..params()
    };
    let prompt = build_audience_prompt(&params, FunnelStage::Top, "estratégia");
    assert!(prompt.contains("Não há localização secundária"));
}

#[test]
fn later_prompts_embed_earlier_stage_text() {
    let params = params();
    let metrics = default_metrics(&params);
    let forecast = build_forecast_prompt(
        &params,
        FunnelStage::Top,
        &metrics,
        "[strategy] texto",
        "[budget_allocation] texto",
    );
    assert!(forecast.contains("[strategy] texto"));
    assert!(forecast.contains("[budget_allocation] texto"));
    assert!(forecast.contains("Impressões | Alcance | Frequência | CPM | Video Views"));

    let schedule = build_schedule_prompt(&params, FunnelStage::Top, "E1", "B1");
    assert!(schedule.contains("E1"));
    assert!(schedule.contains("B1"));
    assert!(schedule.contains("aproximadamente 4 semana(s)"));
}

#[test]
fn embedded_text_is_not_re_expanded() {
    let params = params();
    let prompt = build_budget_prompt(&params, FunnelStage::Top, "literal {briefing} token");
    assert!(prompt.contains("literal {briefing} token"));
}

#[test]
fn explicit_key_results_replace_funnel_defaults() {
    let params = CampaignParameters {
        key_results: Some(vec![KeyResult {
            metric: "Leads".to_string(),
            target: Some(1500.0),
        }]),
        ..params()
    };
    let metrics = params.relevant_metrics(FunnelStage::Top);
    let prompt = build_strategy_prompt(&params, FunnelStage::Top, &metrics);
    assert!(prompt.contains("Leads (meta: 1.500)"));
    assert!(!prompt.contains("Priorize SOMENTE estas métricas: Impressões"));
}

#[test]
fn combined_prompt_names_every_section() {
    let params = params();
    let prompt = build_combined_prompt(&params, FunnelStage::Top, &default_metrics(&params));
    for stage in PipelineStage::ORDER {
        assert!(prompt.contains(stage.title()), "missing {}", stage.title());
    }
}

#[test]
fn render_leaves_unknown_placeholders() {
    let vars = BTreeMap::from([("name", "valor".to_string())]);
    assert_eq!(render("{name} {other} {", &vars), "valor {other} {");
    assert_eq!(render("{Name}", &vars), "{Name}");
}
