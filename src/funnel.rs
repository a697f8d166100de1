//! Funnel-stage classification for campaign objectives.
//!
//! Classification is a keyword scan over the lower-cased objective text. The
//! sets are checked in a fixed priority order so an objective that mentions
//! both awareness and conversion terms lands at the top of the funnel.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketing funnel phase a campaign targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    /// Awareness.
    #[serde(alias = "topo", alias = "awareness")]
    Top,
    /// Consideration.
    #[serde(alias = "meio", alias = "consideration")]
    Middle,
    /// Conversion.
    #[serde(alias = "fundo", alias = "conversion")]
    Bottom,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 3] = [FunnelStage::Top, FunnelStage::Middle, FunnelStage::Bottom];

    /// Stable identifier used in CLI flags and JSON.
    pub fn key(self) -> &'static str {
        match self {
            FunnelStage::Top => "top",
            FunnelStage::Middle => "middle",
            FunnelStage::Bottom => "bottom",
        }
    }

    /// Human-readable label used in prompts and exported documents.
    pub fn label(self) -> &'static str {
        match self {
            FunnelStage::Top => "Topo de Funil (Awareness)",
            FunnelStage::Middle => "Meio de Funil (Consideração)",
            FunnelStage::Bottom => "Fundo de Funil (Conversão)",
        }
    }

    /// Parse a stage identifier (English or Portuguese).
    pub fn parse(value: &str) -> Option<FunnelStage> {
        match value.trim().to_lowercase().as_str() {
            "top" | "topo" | "awareness" => Some(FunnelStage::Top),
            "middle" | "meio" | "consideration" | "consideração" => Some(FunnelStage::Middle),
            "bottom" | "fundo" | "conversion" | "conversão" => Some(FunnelStage::Bottom),
            _ => None,
        }
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const TOP_KEYWORDS: &[&str] = &[
    "awareness",
    "branding",
    "brand",
    "reach",
    "alcance",
    "reconhecimento",
    "marca",
    "lançamento",
    "visibilidade",
];

const MIDDLE_KEYWORDS: &[&str] = &[
    "consideration",
    "consideração",
    "consideracao",
    "engagement",
    "engajamento",
    "video",
    "vídeo",
    "traffic",
    "tráfego",
    "trafego",
    "visitas",
];

const BOTTOM_KEYWORDS: &[&str] = &[
    "conversion",
    "conversão",
    "conversao",
    "sale",
    "venda",
    "compra",
    "purchase",
    "lead",
    "performance",
    "roas",
];

fn keywords(stage: FunnelStage) -> &'static [&'static str] {
    match stage {
        FunnelStage::Top => TOP_KEYWORDS,
        FunnelStage::Middle => MIDDLE_KEYWORDS,
        FunnelStage::Bottom => BOTTOM_KEYWORDS,
    }
}

/// Classify a campaign name/objective into a funnel stage.
///
/// Returns [`FunnelStage::Top`] when no keyword matches.
pub fn classify(campaign_text: &str) -> FunnelStage {
    let text = campaign_text.to_lowercase();
    FunnelStage::ALL
        .into_iter()
        .find(|stage| keyword_pattern(*stage).is_some_and(|pattern| pattern.is_match(&text)))
        .unwrap_or(FunnelStage::Top)
}

/// Whole-word match on any keyword of `stage`, allowing a plural `s`.
fn keyword_pattern(stage: FunnelStage) -> Option<Regex> {
    let alternatives = keywords(stage)
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternatives})s?\b")).ok()
}

/// How an explicit stage and the classifier are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelPolicy {
    /// Explicit stage wins; classify only when none was supplied.
    #[default]
    PreferExplicit,
    /// Always classify; an explicit stage is ignored.
    Classify,
    /// An explicit stage must be supplied.
    RequireExplicit,
}

impl FunnelPolicy {
    pub fn parse(value: &str) -> Option<FunnelPolicy> {
        match value.trim() {
            "prefer_explicit" | "prefer-explicit" => Some(FunnelPolicy::PreferExplicit),
            "classify" => Some(FunnelPolicy::Classify),
            "require_explicit" | "require-explicit" => Some(FunnelPolicy::RequireExplicit),
            _ => None,
        }
    }
}

/// Where the resolved stage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelSource {
    Explicit,
    Classified,
}

impl FunnelSource {
    pub fn key(self) -> &'static str {
        match self {
            FunnelSource::Explicit => "explicit",
            FunnelSource::Classified => "classified",
        }
    }
}

/// Funnel stage chosen for a campaign, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelResolution {
    pub stage: FunnelStage,
    pub source: FunnelSource,
}

/// Resolve the funnel stage under `policy`.
///
/// Returns `None` only for [`FunnelPolicy::RequireExplicit`] without an
/// explicit stage; intake validation reports that case.
pub fn resolve(
    objective: &str,
    explicit: Option<FunnelStage>,
    policy: FunnelPolicy,
) -> Option<FunnelResolution> {
    let classified = classify(objective);
    let explicit_resolution = |stage: FunnelStage| {
        if stage != classified {
            tracing::warn!(
                explicit = stage.key(),
                classified = classified.key(),
                "explicit funnel stage disagrees with objective keywords"
            );
        }
        FunnelResolution {
            stage,
            source: FunnelSource::Explicit,
        }
    };
    match (policy, explicit) {
        (FunnelPolicy::Classify, _) | (FunnelPolicy::PreferExplicit, None) => {
            Some(FunnelResolution {
                stage: classified,
                source: FunnelSource::Classified,
            })
        }
        (FunnelPolicy::PreferExplicit, Some(stage))
        | (FunnelPolicy::RequireExplicit, Some(stage)) => Some(explicit_resolution(stage)),
        (FunnelPolicy::RequireExplicit, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_each_keyword_set() {
        assert_eq!(classify("Awareness Campaign - Brand X"), FunnelStage::Top);
        assert_eq!(classify("Campanha de Engajamento"), FunnelStage::Middle);
        assert_eq!(classify("Video views Q3"), FunnelStage::Middle);
        assert_eq!(classify("Geração de LEADS"), FunnelStage::Bottom);
        assert_eq!(classify("Black Friday sales push"), FunnelStage::Bottom);
    }

    #[test]
    fn classify_matches_whole_words_only() {
        assert_eq!(classify("Leadership summit"), FunnelStage::Top);
        assert_eq!(classify("Wholesale partners"), FunnelStage::Top);
        assert_eq!(classify("Community outreach for sales"), FunnelStage::Bottom);
    }

    #[test]
    fn classify_defaults_to_top() {
        assert_eq!(classify(""), FunnelStage::Top);
        assert_eq!(classify("Q4 plan"), FunnelStage::Top);
    }

    #[test]
    fn classify_prefers_top_then_middle() {
        assert_eq!(classify("brand conversion"), FunnelStage::Top);
        assert_eq!(classify("traffic to drive sales"), FunnelStage::Middle);
    }

    #[test]
    fn every_keyword_classifies_to_its_own_stage() {
        for stage in FunnelStage::ALL {
            for keyword in keywords(stage) {
                let text = format!("Campaign {}", keyword.to_uppercase());
                assert_eq!(classify(&text), stage, "keyword {keyword}");
            }
        }
    }

    #[test]
    fn resolve_applies_policy() {
        let explicit = resolve("Awareness", Some(FunnelStage::Bottom), FunnelPolicy::PreferExplicit)
            .expect("resolution");
        assert_eq!(explicit.stage, FunnelStage::Bottom);
        assert_eq!(explicit.source, FunnelSource::Explicit);

        let classified = resolve("Awareness", Some(FunnelStage::Bottom), FunnelPolicy::Classify)
            .expect("resolution");
        assert_eq!(classified.stage, FunnelStage::Top);
        assert_eq!(classified.source, FunnelSource::Classified);

        assert!(resolve("Awareness", None, FunnelPolicy::RequireExplicit).is_none());
    }

    #[test]
    fn parse_accepts_portuguese_names() {
        assert_eq!(FunnelStage::parse("Fundo"), Some(FunnelStage::Bottom));
        assert_eq!(FunnelStage::parse("middle"), Some(FunnelStage::Middle));
        assert_eq!(FunnelStage::parse("side"), None);
    }
}
