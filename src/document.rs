//! Exportable media plan document.
use crate::campaign::CampaignParameters;
use crate::funnel::FunnelStage;
use crate::pipeline::{PipelineError, PipelineStage, StageResults};
use crate::util::{format_brl, format_quantity, slugify};

/// Concatenate the parameter header and all five stage sections.
///
/// Output depends only on the inputs, so the same state always exports the
/// same bytes. Fails if any stage result is missing.
pub fn assemble(
    params: &CampaignParameters,
    funnel: FunnelStage,
    results: &StageResults,
) -> Result<String, PipelineError> {
    let missing: Vec<&str> = PipelineStage::ORDER
        .iter()
        .filter(|stage| !results.contains_key(*stage))
        .map(|stage| stage.key())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Precondition(format!(
            "document needs every stage; missing {}",
            missing.join(", ")
        )));
    }

    let mut doc = String::new();
    doc.push_str(&format!("# Plano de Mídia: {}\n\n", params.objective));
    doc.push_str(&format!(
        "- **Campanha:** {} ({})\n",
        params.objective,
        params.campaign_type.label()
    ));
    doc.push_str(&format!("- **Budget Total:** {}\n", format_brl(params.budget)));
    doc.push_str(&format!("- **Período:** {}\n", params.period.label()));
    doc.push_str(&format!(
        "- **Plataformas:** {}\n",
        params.platform_labels().join(", ")
    ));
    doc.push_str(&format!("- **Etapa do Funil:** {}\n", funnel.label()));
    if let Some(key_results) = &params.key_results {
        doc.push_str("- **OKRs Selecionados:**\n");
        for key_result in key_results {
            match key_result.target {
                Some(target) => doc.push_str(&format!(
                    "  - {}: {}\n",
                    key_result.metric,
                    format_quantity(target)
                )),
                None => doc.push_str(&format!("  - {}\n", key_result.metric)),
            }
        }
    }

    for (stage, result) in results {
        doc.push_str("\n---\n\n");
        doc.push_str(&stage.heading());
        doc.push_str("\n\n");
        doc.push_str(result.text().trim());
        doc.push('\n');
    }
    Ok(doc)
}

/// File name for an exported plan: `plano_midia_<objective>_<budget>.md`.
pub fn export_file_name(params: &CampaignParameters) -> String {
    let budget = if params.budget.fract() == 0.0 {
        format!("{:.0}", params.budget)
    } else {
        format!("{:.2}", params.budget).replace('.', "_")
    };
    format!("plano_midia_{}_{budget}.md", slugify(&params.objective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignForm, IntakeProfile, KeyResult};
    use crate::pipeline::{ResultOrigin, StageResult};

    fn params() -> CampaignParameters {
        CampaignForm::example()
            .submit(IntakeProfile::Full)
            .expect("valid form")
    }

    fn results(stages: &[PipelineStage]) -> StageResults {
        stages
            .iter()
            .map(|stage| {
                let result = StageResult::new(
                    *stage,
                    format!("texto {}\n", stage.key()),
                    ResultOrigin::Staged,
                    String::new(),
                    1,
                );
                (*stage, result)
            })
            .collect()
    }

    #[test]
    fn assembly_is_byte_deterministic() {
        let params = params();
        let results = results(&PipelineStage::ORDER);
        let first = assemble(&params, FunnelStage::Top, &results).expect("assemble");
        let second = assemble(&params, FunnelStage::Top, &results).expect("assemble");
        assert_eq!(first, second);
        assert!(first.starts_with("# Plano de Mídia: Awareness Campaign - Brand X\n"));
        assert!(first.contains("- **Etapa do Funil:** Topo de Funil (Awareness)\n"));
        assert!(!first.contains("OKRs Selecionados"));
        assert!(first.ends_with("## 📅 Cronograma Sugerido\n\ntexto schedule\n"));
    }

    #[test]
    fn missing_stage_is_a_precondition_failure() {
        let err = assemble(
            &params(),
            FunnelStage::Top,
            &results(&[PipelineStage::Strategy, PipelineStage::BudgetAllocation]),
        )
        .expect_err("incomplete results");
        assert_eq!(err.kind(), "precondition");
        assert!(err.to_string().contains("forecast, audience, schedule"));
    }

    #[test]
    fn explicit_key_results_are_listed() {
        let params = CampaignParameters {
            key_results: Some(vec![
                KeyResult {
                    metric: "Leads".to_string(),
                    target: Some(1500.0),
                },
                KeyResult {
                    metric: "CPA".to_string(),
                    target: None,
                },
            ]),
            ..params()
        };
        let doc = assemble(&params, FunnelStage::Bottom, &results(&PipelineStage::ORDER))
            .expect("assemble");
        assert!(doc.contains("- **OKRs Selecionados:**\n  - Leads: 1.500\n  - CPA\n"));
    }

    #[test]
    fn export_name_uses_slug_and_budget() {
        assert_eq!(
            export_file_name(&params()),
            "plano_midia_awareness_campaign_brand_x_100000.md"
        );
        let params = CampaignParameters {
            budget: 2500.5,
            ..params()
        };
        assert_eq!(
            export_file_name(&params),
            "plano_midia_awareness_campaign_brand_x_2500_50.md"
        );
    }
}
