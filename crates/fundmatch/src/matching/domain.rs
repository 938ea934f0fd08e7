use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Stable identifier of a catalog offering.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The five evaluation dimensions every offering is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Cost,
    Sustainability,
    Guidance,
    Features,
    Return,
}

/// How a criterion's raw value becomes a 1-10 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationPolicy {
    /// The catalog already stores a 1-10 rating.
    Direct,
    /// The catalog stores a raw metric that is ranked against the population.
    Percentile { descending_is_better: bool },
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Cost,
        Criterion::Sustainability,
        Criterion::Guidance,
        Criterion::Features,
        Criterion::Return,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Criterion::Cost => "cost",
            Criterion::Sustainability => "sustainability",
            Criterion::Guidance => "guidance",
            Criterion::Features => "features",
            Criterion::Return => "return",
        }
    }

    /// Wording used in narratives.
    pub const fn display_name(self) -> &'static str {
        match self {
            Criterion::Cost => "costs",
            Criterion::Sustainability => "sustainability",
            Criterion::Guidance => "personal guidance",
            Criterion::Features => "features",
            Criterion::Return => "returns",
        }
    }

    pub const fn policy(self) -> NormalizationPolicy {
        match self {
            Criterion::Cost => NormalizationPolicy::Percentile {
                descending_is_better: true,
            },
            Criterion::Return => NormalizationPolicy::Percentile {
                descending_is_better: false,
            },
            Criterion::Sustainability | Criterion::Guidance | Criterion::Features => {
                NormalizationPolicy::Direct
            }
        }
    }

    /// Parses canonical keys and the legacy quiz vocabulary.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cost" | "costs" | "kosten" => Some(Criterion::Cost),
            "sustainability" | "duurzaamheid" => Some(Criterion::Sustainability),
            "guidance" | "begeleiding" | "persoonlijke_begeleiding" => Some(Criterion::Guidance),
            "features" | "functionaliteiten" => Some(Criterion::Features),
            "return" | "returns" | "rendement" => Some(Criterion::Return),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Criterion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Criterion::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown criterion '{raw}'")))
    }
}

/// User-stated priority tier for a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceLabel {
    VeryImportant,
    Important,
    LowPreference,
    #[default]
    NotImportant,
}

impl ImportanceLabel {
    /// Total parse: anything unrecognised lands in the lowest tier.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "very_important" | "most_important" | "heel_belangrijk" | "zeer_belangrijk" => {
                ImportanceLabel::VeryImportant
            }
            "important" | "belangrijk" => ImportanceLabel::Important,
            "low_preference" | "no_preference" | "geen_voorkeur" => ImportanceLabel::LowPreference,
            _ => ImportanceLabel::NotImportant,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ImportanceLabel::VeryImportant => "very_important",
            ImportanceLabel::Important => "important",
            ImportanceLabel::LowPreference => "low_preference",
            ImportanceLabel::NotImportant => "not_important",
        }
    }

    /// Steps the top tier down once; lower tiers are left alone.
    pub const fn loosened(self) -> Self {
        match self {
            ImportanceLabel::VeryImportant => ImportanceLabel::Important,
            other => other,
        }
    }

    pub const fn is_prioritised(self) -> bool {
        matches!(
            self,
            ImportanceLabel::VeryImportant | ImportanceLabel::Important
        )
    }
}

impl<'de> Deserialize<'de> for ImportanceLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .map(ImportanceLabel::parse)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Active,
    Inactive,
}

impl CandidateStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "actief" => CandidateStatus::Active,
            _ => CandidateStatus::Inactive,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CandidateStatus::Active => "active",
            CandidateStatus::Inactive => "inactive",
        }
    }
}

/// Read-only snapshot of a financial service offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub provider: String,
    pub category: String,
    pub status: CandidateStatus,
    /// `None` means the offering has no minimum investment.
    pub minimum_investment: Option<u64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl Candidate {
    pub fn is_active(&self) -> bool {
        self.status == CandidateStatus::Active
    }
}

const MAX_STRENGTHS: usize = 3;
const MAX_WEAKNESSES: usize = 2;
const DEFAULT_STRENGTH: &str = "Reliable service provider";

/// Splits a comma-delimited strengths field, keeping at most three entries.
pub fn parse_strengths(raw: &str) -> Vec<String> {
    let strengths = split_delimited(raw, MAX_STRENGTHS);
    if strengths.is_empty() {
        vec![DEFAULT_STRENGTH.to_string()]
    } else {
        strengths
    }
}

/// Splits a comma-delimited weaknesses field, keeping at most two entries.
pub fn parse_weaknesses(raw: &str) -> Vec<String> {
    split_delimited(raw, MAX_WEAKNESSES)
}

fn split_delimited(raw: &str, cap: usize) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .take(cap)
        .map(str::to_string)
        .collect()
}

/// Raw per-criterion values fetched in bulk for a set of candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub candidate_id: CandidateId,
    /// Annual total cost of ownership as a fraction of the invested amount.
    pub total_cost_ratio: Option<f64>,
    pub expected_return: Option<f64>,
    pub sustainability: Option<f64>,
    pub guidance: Option<f64>,
    pub features: Option<f64>,
}

impl CandidateMetrics {
    pub fn empty(candidate_id: CandidateId) -> Self {
        Self {
            candidate_id,
            ..Self::default()
        }
    }

    pub fn raw(&self, criterion: Criterion) -> Option<f64> {
        let value = match criterion {
            Criterion::Cost => self.total_cost_ratio,
            Criterion::Return => self.expected_return,
            Criterion::Sustainability => self.sustainability,
            Criterion::Guidance => self.guidance,
            Criterion::Features => self.features,
        };
        value.filter(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankFilterMode {
    Include,
    Exclude,
    Boost,
}

/// Provider-name filter applied before ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankFilter {
    pub mode: BankFilterMode,
    pub banks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftAction {
    BoostBanks,
    ExcludeBanks,
    IncludeBanks,
}

impl SoftAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "boost_banks" => Some(SoftAction::BoostBanks),
            "exclude_banks" => Some(SoftAction::ExcludeBanks),
            "include_banks" => Some(SoftAction::IncludeBanks),
            _ => None,
        }
    }
}

/// Name-similarity based adjustment applied after base scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftPreference {
    pub action: SoftAction,
    pub banks: Vec<String>,
}

/// User input driving a ranking request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSet {
    /// User-facing cluster label, expanded to internal categories by the filter.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: u64,
    #[serde(default)]
    pub importance: BTreeMap<Criterion, ImportanceLabel>,
    #[serde(default)]
    pub bank_filter: Option<BankFilter>,
    #[serde(default)]
    pub soft_preferences: Vec<SoftPreference>,
    /// Multipliers applied to the resolved weight of a criterion.
    #[serde(default)]
    pub weight_overrides: BTreeMap<Criterion, f64>,
}

impl PreferenceSet {
    pub fn importance_of(&self, criterion: Criterion) -> ImportanceLabel {
        self.importance
            .get(&criterion)
            .copied()
            .unwrap_or_default()
    }

    pub fn with_importance(mut self, criterion: Criterion, label: ImportanceLabel) -> Self {
        self.importance.insert(criterion, label);
        self
    }

    /// Copy with every top-tier importance stepped down once.
    pub fn loosened(&self) -> Self {
        let mut loosened = self.clone();
        for label in loosened.importance.values_mut() {
            *label = label.loosened();
        }
        loosened
    }
}

/// Non-numeric or negative amounts resolve to zero instead of failing the request.
fn lenient_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let amount = match raw {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(amount
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(|value| value.floor().min(u64::MAX as f64) as u64)
        .unwrap_or(0))
}

/// A candidate scored against a preference set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub candidate_id: CandidateId,
    pub provider: String,
    pub category: String,
    pub minimum_investment: Option<u64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub total_cost_ratio: Option<f64>,
    /// Per-criterion score on the 1-10 scale.
    pub scores: BTreeMap<Criterion, f64>,
    pub weights: BTreeMap<Criterion, f64>,
    /// Weighted aggregate in [0, 1].
    pub aggregate_score: f64,
    /// User-facing percentage in [0, 100].
    pub match_percentage: u8,
    #[serde(default)]
    pub boost_applied: bool,
}

impl ScoredMatch {
    pub fn score(&self, criterion: Criterion) -> Option<f64> {
        self.scores.get(&criterion).copied()
    }
}

/// Echo of the filters that shaped a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiltersApplied {
    pub category: Option<String>,
    pub amount: u64,
    pub bank_filter: Option<BankFilterMode>,
    pub soft_preferences: usize,
}

impl FiltersApplied {
    pub fn from_preferences(preferences: &PreferenceSet) -> Self {
        Self {
            category: preferences.category.clone(),
            amount: preferences.amount,
            bank_filter: preferences.bank_filter.as_ref().map(|filter| filter.mode),
            soft_preferences: preferences.soft_preferences.len(),
        }
    }
}

/// Result of a ranking request. An empty eligible set is a result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Ranked {
        matches: Vec<ScoredMatch>,
        total_found: usize,
        filters_applied: FiltersApplied,
    },
    NoMatches {
        reason: String,
        filters_applied: FiltersApplied,
    },
}

impl MatchOutcome {
    pub fn matches(&self) -> &[ScoredMatch] {
        match self {
            MatchOutcome::Ranked { matches, .. } => matches,
            MatchOutcome::NoMatches { .. } => &[],
        }
    }

    pub fn into_matches(self) -> Vec<ScoredMatch> {
        match self {
            MatchOutcome::Ranked { matches, .. } => matches,
            MatchOutcome::NoMatches { .. } => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches().is_empty()
    }
}
