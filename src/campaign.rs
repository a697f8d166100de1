//! Campaign parameter intake.
//!
//! A [`CampaignForm`] is what an intake surface hands over: every field is
//! optional and enumerations are free text. [`CampaignForm::submit`] checks the
//! whole record against an [`IntakeProfile`] and produces the immutable
//! [`CampaignParameters`] the pipeline runs on, or a [`ValidationError`]
//! listing every problem at once.
use crate::funnel::FunnelStage;
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

fn same_label(value: &str, label: &str) -> bool {
    value.trim().to_lowercase() == label.to_lowercase()
}

/// Declares a closed set of form choices that (de)serialize through their
/// display label and also parse from the English identifier or aliases.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(value: &str) -> Option<$name> {
                $(
                    if same_label(value, stringify!($variant))
                        || same_label(value, $label)
                        $(|| same_label(value, $alias))*
                    {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::parse(&value)
                    .ok_or_else(|| format!("unknown {} {value:?}", stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.label().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labeled_enum! {
    /// Campaign buying objective.
    CampaignType {
        Reach => "Alcance",
        Engagement => "Engajamento",
        Traffic => "Tráfego" | "Trafego",
        Conversion => "Conversão" | "Conversao",
    }
}

labeled_enum! {
    /// Supported flight durations.
    CampaignPeriod {
        OneWeek => "1 week" | "1 semana",
        TwoWeeks => "2 weeks" | "2 semanas",
        OneMonth => "1 month" | "1 mês" | "1 mes",
        TwoMonths => "2 months" | "2 meses",
        ThreeMonths => "3 months" | "3 meses",
        SixMonths => "6 months" | "6 meses",
        TwelveMonths => "12 months" | "12 meses" | "1 year" | "1 ano",
    }
}

labeled_enum! {
    /// Media buying platforms.
    Platform {
        MetaAds => "Meta Ads" | "Meta Ads (Facebook/Instagram)" | "Facebook" | "Instagram",
        GoogleAds => "Google Ads",
        TikTok => "TikTok",
        LinkedIn => "LinkedIn",
        YouTube => "YouTube",
        Programmatic => "Mídia Programática" | "Midia Programatica" | "Programmatic",
        Twitter => "Twitter" | "X",
        Pinterest => "Pinterest",
    }
}

labeled_enum! {
    /// Audience targeting approach.
    AudienceType {
        Interests => "Interesses",
        Lookalike => "Lookalike Audience (LAL)" | "LAL",
        CustomerBase => "Base de Clientes" | "Customer Base",
        Retargeting => "Retargeting",
        Behavior => "Comportamento" | "Behaviour",
        Demographic => "Demográfico" | "Demografico",
    }
}

labeled_enum! {
    /// Creative formats.
    CreativeType {
        Static => "Estático" | "Estatico",
        Video => "Vídeo",
        Carousel => "Carrossel",
        Motion => "Motion",
        Story => "Story" | "Stories",
        Collection => "Coleção" | "Colecao",
    }
}

impl CampaignPeriod {
    /// Approximate length in weeks, used to size the schedule.
    pub fn weeks(self) -> u32 {
        match self {
            CampaignPeriod::OneWeek => 1,
            CampaignPeriod::TwoWeeks => 2,
            CampaignPeriod::OneMonth => 4,
            CampaignPeriod::TwoMonths => 8,
            CampaignPeriod::ThreeMonths => 13,
            CampaignPeriod::SixMonths => 26,
            CampaignPeriod::TwelveMonths => 52,
        }
    }
}

/// Which fields an intake surface must fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeProfile {
    /// Everything the pipeline uses, including action details.
    #[default]
    Full,
    /// Action details optional.
    Basic,
}

impl IntakeProfile {
    pub fn parse(value: &str) -> Option<IntakeProfile> {
        match value.trim() {
            "full" => Some(IntakeProfile::Full),
            "basic" => Some(IntakeProfile::Basic),
            _ => None,
        }
    }
}

/// A selected metric with an optional numeric target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// Raw campaign intake record, typically read from `campaign.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignForm {
    pub objective: Option<String>,
    pub campaign_type: Option<String>,
    pub budget: Option<f64>,
    pub period: Option<String>,
    pub platforms: Vec<String>,
    pub primary_location: Option<String>,
    pub secondary_location: Option<String>,
    pub audience_type: Option<String>,
    pub creative_types: Vec<String>,
    pub key_results: Option<Vec<KeyResult>>,
    pub funnel_stage: Option<String>,
    pub action_details: Option<String>,
    pub notes: Option<String>,
}

/// Validated, immutable campaign parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignParameters {
    pub objective: String,
    pub campaign_type: CampaignType,
    pub budget: f64,
    pub period: CampaignPeriod,
    pub platforms: BTreeSet<Platform>,
    pub primary_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_location: Option<String>,
    pub audience_type: AudienceType,
    pub creative_types: BTreeSet<CreativeType>,
    /// `None` means "use the funnel defaults".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_results: Option<Vec<KeyResult>>,
    /// Caller-selected funnel stage, reconciled with classification by policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_stage: Option<FunnelStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One rejected intake field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Campaign parameters were incomplete or invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid campaign parameters: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                field,
                message: message.into(),
            }],
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Issues(Vec<FieldIssue>);

impl Issues {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldIssue {
            field,
            message: message.into(),
        });
    }

    fn required_text(&mut self, field: &'static str, value: Option<&str>) -> Option<String> {
        match non_blank(value) {
            Some(text) => Some(text),
            None => {
                self.push(field, "required");
                None
            }
        }
    }

    fn required_choice<T>(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        parse: fn(&str) -> Option<T>,
    ) -> Option<T> {
        let Some(raw) = non_blank(value) else {
            self.push(field, "required");
            return None;
        };
        let parsed = parse(&raw);
        if parsed.is_none() {
            self.push(field, format!("unsupported value {raw:?}"));
        }
        parsed
    }

    fn required_set<T: Ord>(
        &mut self,
        field: &'static str,
        values: &[String],
        parse: fn(&str) -> Option<T>,
    ) -> Option<BTreeSet<T>> {
        let mut set = BTreeSet::new();
        let mut ok = true;
        for raw in values.iter().filter(|raw| !raw.trim().is_empty()) {
            match parse(raw) {
                Some(value) => {
                    set.insert(value);
                }
                None => {
                    self.push(field, format!("unsupported value {:?}", raw.trim()));
                    ok = false;
                }
            }
        }
        if ok && set.is_empty() {
            self.push(field, "at least one value is required");
            return None;
        }
        ok.then_some(set)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl CampaignForm {
    /// Validate the form and freeze it into [`CampaignParameters`].
    pub fn submit(&self, profile: IntakeProfile) -> Result<CampaignParameters, ValidationError> {
        let mut issues = Issues::default();

        let objective = issues.required_text("objective", self.objective.as_deref());
        let campaign_type = issues.required_choice(
            "campaign_type",
            self.campaign_type.as_deref(),
            CampaignType::parse,
        );
        let budget = match self.budget {
            None => {
                issues.push("budget", "required");
                None
            }
            Some(value) if !value.is_finite() || value <= 0.0 => {
                issues.push("budget", format!("must be a positive amount (got {value})"));
                None
            }
            Some(value) => Some(value),
        };
        let period =
            issues.required_choice("period", self.period.as_deref(), CampaignPeriod::parse);
        let platforms = issues.required_set("platforms", &self.platforms, Platform::parse);
        let primary_location =
            issues.required_text("primary_location", self.primary_location.as_deref());
        let audience_type = issues.required_choice(
            "audience_type",
            self.audience_type.as_deref(),
            AudienceType::parse,
        );
        let creative_types =
            issues.required_set("creative_types", &self.creative_types, CreativeType::parse);
        let key_results = self.validated_key_results(&mut issues);
        let funnel_stage = match non_blank(self.funnel_stage.as_deref()) {
            None => None,
            Some(raw) => {
                let parsed = FunnelStage::parse(&raw);
                if parsed.is_none() {
                    issues.push("funnel_stage", format!("unsupported value {raw:?}"));
                }
                parsed
            }
        };
        let action_details = match profile {
            IntakeProfile::Full => {
                issues.required_text("action_details", self.action_details.as_deref())
            }
            IntakeProfile::Basic => non_blank(self.action_details.as_deref()),
        };

        if !issues.0.is_empty() {
            return Err(ValidationError { issues: issues.0 });
        }
        match (
            objective,
            campaign_type,
            budget,
            period,
            platforms,
            primary_location,
            audience_type,
            creative_types,
        ) {
            (
                Some(objective),
                Some(campaign_type),
                Some(budget),
                Some(period),
                Some(platforms),
                Some(primary_location),
                Some(audience_type),
                Some(creative_types),
            ) => Ok(CampaignParameters {
                objective,
                campaign_type,
                budget,
                period,
                platforms,
                primary_location,
                secondary_location: non_blank(self.secondary_location.as_deref()),
                audience_type,
                creative_types,
                key_results,
                funnel_stage,
                action_details,
                notes: non_blank(self.notes.as_deref()),
            }),
            _ => Err(ValidationError::single(
                "form",
                "incomplete campaign parameters",
            )),
        }
    }

    fn validated_key_results(&self, issues: &mut Issues) -> Option<Vec<KeyResult>> {
        let selected = self.key_results.as_ref()?;
        let mut seen = BTreeSet::new();
        let mut key_results = Vec::new();
        for key_result in selected {
            let metric = key_result.metric.trim();
            if metric.is_empty() {
                issues.push("key_results", "metric name must be non-empty");
                continue;
            }
            if let Some(target) = key_result.target {
                if !target.is_finite() || target < 0.0 {
                    issues.push(
                        "key_results",
                        format!("target for {metric:?} must be a non-negative number"),
                    );
                    continue;
                }
            }
            if !metrics::is_known(metric) {
                tracing::debug!(metric, "key result is not in the metric catalog");
            }
            if seen.insert(metric.to_string()) {
                key_results.push(KeyResult {
                    metric: metric.to_string(),
                    target: key_result.target,
                });
            }
        }
        (!key_results.is_empty()).then_some(key_results)
    }

    /// Starter form written by `mplan init`.
    pub fn example() -> Self {
        CampaignForm {
            objective: Some("Awareness Campaign - Brand X".to_string()),
            campaign_type: Some(CampaignType::Reach.label().to_string()),
            budget: Some(100_000.0),
            period: Some(CampaignPeriod::OneMonth.label().to_string()),
            platforms: vec![
                Platform::MetaAds.label().to_string(),
                Platform::GoogleAds.label().to_string(),
            ],
            primary_location: Some("MT, GO, RS".to_string()),
            secondary_location: Some("SP, MG, RJ".to_string()),
            audience_type: Some(AudienceType::Interests.label().to_string()),
            creative_types: vec![
                CreativeType::Static.label().to_string(),
                CreativeType::Video.label().to_string(),
            ],
            key_results: None,
            funnel_stage: None,
            action_details: Some("Lançamento da nova linha de produtos".to_string()),
            notes: None,
        }
    }
}

impl CampaignParameters {
    /// Metrics the prompts should prioritize: the explicit selection when
    /// present, otherwise the catalog defaults for `stage`.
    pub fn relevant_metrics(&self, stage: FunnelStage) -> Vec<String> {
        match &self.key_results {
            Some(selected) => selected.iter().map(|kr| kr.metric.clone()).collect(),
            None => metrics::metrics_for(stage)
                .iter()
                .map(|metric| metric.to_string())
                .collect(),
        }
    }

    pub fn platform_labels(&self) -> Vec<&'static str> {
        self.platforms.iter().map(|platform| platform.label()).collect()
    }

    pub fn creative_labels(&self) -> Vec<&'static str> {
        self.creative_types
            .iter()
            .map(|creative| creative.label())
            .collect()
    }
}

#[cfg(test)]
#[path = "campaign_tests.rs"]
mod tests;
