//! Key-result metric catalog keyed by funnel stage.
use crate::funnel::FunnelStage;

/// Description returned for metrics the catalog does not know.
pub const UNKNOWN_METRIC_DESCRIPTION: &str = "Métrica personalizada (sem descrição no catálogo)";

const TOP_METRICS: &[&str] = &["Impressões", "Alcance", "Frequência", "CPM", "Video Views"];
const MIDDLE_METRICS: &[&str] = &["Engajamento", "Sessões", "CTR", "CPC", "Video Views"];
const BOTTOM_METRICS: &[&str] = &["Conversões", "Leads", "CPA", "ROAS", "Taxa de Conversão"];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("Impressões", "Número total de vezes que os anúncios foram exibidos"),
    ("Alcance", "Número de pessoas únicas impactadas pelos anúncios"),
    ("Frequência", "Média de vezes que cada pessoa viu o anúncio"),
    ("CPM", "Custo por mil impressões"),
    ("Video Views", "Visualizações de vídeo acima do limiar da plataforma"),
    ("Engajamento", "Interações com o anúncio (curtidas, comentários, compartilhamentos)"),
    ("Sessões", "Visitas ao site originadas pela campanha"),
    ("CTR", "Taxa de cliques sobre impressões"),
    ("CPC", "Custo por clique"),
    ("Conversões", "Ações de conversão concluídas (compras, cadastros)"),
    ("Leads", "Contatos qualificados gerados pela campanha"),
    ("CPA", "Custo por aquisição"),
    ("ROAS", "Retorno sobre o investimento em mídia"),
    ("Taxa de Conversão", "Percentual de sessões que resultam em conversão"),
];

/// Relevant metrics for a funnel stage, in presentation order.
pub fn metrics_for(stage: FunnelStage) -> &'static [&'static str] {
    match stage {
        FunnelStage::Top => TOP_METRICS,
        FunnelStage::Middle => MIDDLE_METRICS,
        FunnelStage::Bottom => BOTTOM_METRICS,
    }
}

/// Human-readable description; unknown metrics get a placeholder.
pub fn description_of(metric: &str) -> &'static str {
    let needle = metric.trim();
    DESCRIPTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(needle) || *name == needle)
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_METRIC_DESCRIPTION)
}

/// Whether the catalog lists `metric` under any stage.
pub fn is_known(metric: &str) -> bool {
    description_of(metric) != UNKNOWN_METRIC_DESCRIPTION
}
