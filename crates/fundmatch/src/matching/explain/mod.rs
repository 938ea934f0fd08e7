//! Structured explanation of a ranked list.
//!
//! [`ExplanationContext`] is rich enough to drive either an external
//! [`NarrativeGenerator`] or the deterministic templates in this module.

mod analysis;
mod fallback;
mod scenario;

pub use analysis::{
    ComparisonVerdict, CostLeader, CriterionAnalysis, CrossMatchPatterns, Insight,
    MatchBreakdown, PerformanceLevel, PriorityLeader, ProfileSummary, TopComparison,
};
pub use fallback::{fallback_highlights, fallback_summary};
pub use scenario::{
    detect_scenario, follow_up_questions, FollowUpQuestion, MissedPriority, QuestionOption,
    Scenario, ScenarioKind, Urgency,
};

use serde::{Deserialize, Serialize};

use super::domain::{PreferenceSet, ScoredMatch};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationContext {
    pub profile: ProfileSummary,
    pub matches: Vec<MatchBreakdown>,
    pub patterns: CrossMatchPatterns,
    pub comparison: Option<TopComparison>,
    pub scenario: Scenario,
}

impl ExplanationContext {
    /// Builds the explanation for a list that is already sorted best first.
    pub fn build(matches: &[ScoredMatch], preferences: &PreferenceSet) -> Self {
        let breakdowns: Vec<MatchBreakdown> = matches
            .iter()
            .enumerate()
            .map(|(index, entry)| MatchBreakdown::build(index + 1, entry, preferences))
            .collect();
        let patterns = CrossMatchPatterns::build(&breakdowns, matches);

        Self {
            profile: ProfileSummary::build(preferences),
            comparison: TopComparison::build(matches),
            scenario: detect_scenario(matches, preferences),
            matches: breakdowns,
            patterns,
        }
    }
}

/// Three short takeaways shown next to the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlights {
    pub key_insight: String,
    pub trade_offs: String,
    pub priority_analysis: String,
}

/// External prose generator. Callers substitute the templated fallbacks on
/// any error.
pub trait NarrativeGenerator: Send + Sync {
    fn summarize(&self, context: &ExplanationContext) -> Result<String, NarrativeError>;
    fn highlights(&self, context: &ExplanationContext) -> Result<Highlights, NarrativeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("narrative generator unavailable: {0}")]
    Unavailable(String),
    #[error("narrative generator timed out")]
    TimedOut,
}
