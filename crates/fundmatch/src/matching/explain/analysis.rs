use serde::Serialize;

use crate::matching::domain::{
    CandidateId, Criterion, ImportanceLabel, PreferenceSet, ScoredMatch,
};
use crate::matching::engine::NEUTRAL_SCORE;

const STRONG_SCORE: f64 = 8.0;
const WEAK_SCORE: f64 = 6.0;
const LEADER_SCORE: f64 = 7.0;
const CLOSE_RACE_GAP: i16 = 3;
const CLEAR_WINNER_GAP: i16 = 8;
/// Cost differences below this many percentage points are not worth reporting.
const COST_DIFFERENCE_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    BelowAverage,
}

impl PerformanceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            PerformanceLevel::Excellent
        } else if score >= 6.0 {
            PerformanceLevel::Good
        } else if score >= 4.0 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::BelowAverage
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Average => "average",
            PerformanceLevel::BelowAverage => "below average",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionAnalysis {
    pub criterion: Criterion,
    pub importance: ImportanceLabel,
    pub score: f64,
    pub level: PerformanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Insight {
    TradeOff {
        strong: Vec<Criterion>,
        weak: Vec<Criterion>,
    },
    Risk {
        criterion: Criterion,
        score: f64,
    },
    UnexpectedStrength {
        criterion: Criterion,
        score: f64,
    },
}

impl Insight {
    pub fn describe(&self) -> String {
        match self {
            Insight::TradeOff { strong, weak } => format!(
                "Strong on {} but weaker on {}",
                join_criteria(strong),
                join_criteria(weak)
            ),
            Insight::Risk { criterion, score } => format!(
                "Scores only {score:.1}/10 on {}, which you marked as very important",
                criterion.display_name()
            ),
            Insight::UnexpectedStrength { criterion, score } => format!(
                "Unexpectedly strong on {} ({score:.1}/10) even though it is not a priority",
                criterion.display_name()
            ),
        }
    }
}

/// Structured explanation of a single ranked match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBreakdown {
    pub rank: usize,
    pub candidate_id: CandidateId,
    pub provider: String,
    pub match_percentage: u8,
    pub total_cost_ratio: Option<f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub priority_analysis: Vec<CriterionAnalysis>,
    pub strongest: Vec<Criterion>,
    pub weakest: Vec<Criterion>,
    pub insights: Vec<Insight>,
}

impl MatchBreakdown {
    pub fn build(rank: usize, entry: &ScoredMatch, preferences: &PreferenceSet) -> Self {
        let priority_analysis: Vec<CriterionAnalysis> = Criterion::ALL
            .iter()
            .filter(|criterion| preferences.importance_of(**criterion).is_prioritised())
            .map(|criterion| {
                let score = score_of(entry, *criterion);
                CriterionAnalysis {
                    criterion: *criterion,
                    importance: preferences.importance_of(*criterion),
                    score,
                    level: PerformanceLevel::from_score(score),
                }
            })
            .collect();

        let strongest: Vec<Criterion> = priority_analysis
            .iter()
            .filter(|analysis| analysis.score >= STRONG_SCORE)
            .map(|analysis| analysis.criterion)
            .collect();
        let weakest: Vec<Criterion> = priority_analysis
            .iter()
            .filter(|analysis| analysis.score < WEAK_SCORE)
            .map(|analysis| analysis.criterion)
            .collect();

        let mut insights = Vec::new();
        if !strongest.is_empty() && !weakest.is_empty() {
            insights.push(Insight::TradeOff {
                strong: strongest.clone(),
                weak: weakest.clone(),
            });
        }
        let risks = priority_analysis.iter().filter(|analysis| {
            analysis.importance == ImportanceLabel::VeryImportant && analysis.score < WEAK_SCORE
        });
        for analysis in risks {
            insights.push(Insight::Risk {
                criterion: analysis.criterion,
                score: analysis.score,
            });
        }
        for criterion in Criterion::ALL {
            let score = score_of(entry, criterion);
            if preferences.importance_of(criterion) == ImportanceLabel::NotImportant
                && score >= STRONG_SCORE
            {
                insights.push(Insight::UnexpectedStrength { criterion, score });
            }
        }

        Self {
            rank,
            candidate_id: entry.candidate_id.clone(),
            provider: entry.provider.clone(),
            match_percentage: entry.match_percentage,
            total_cost_ratio: entry.total_cost_ratio,
            strengths: entry.strengths.iter().take(3).cloned().collect(),
            weaknesses: entry.weaknesses.iter().take(2).cloned().collect(),
            priority_analysis,
            strongest,
            weakest,
            insights,
        }
    }
}

/// The user's stated priorities grouped by tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub high_priorities: Vec<Criterion>,
    pub medium_priorities: Vec<Criterion>,
    pub summary: String,
}

impl ProfileSummary {
    pub fn build(preferences: &PreferenceSet) -> Self {
        let tier = |label: ImportanceLabel| -> Vec<Criterion> {
            Criterion::ALL
                .iter()
                .copied()
                .filter(|criterion| preferences.importance_of(*criterion) == label)
                .collect()
        };
        let high_priorities = tier(ImportanceLabel::VeryImportant);
        let medium_priorities = tier(ImportanceLabel::Important);

        let mut parts = Vec::new();
        if !high_priorities.is_empty() {
            parts.push(format!("High priorities: {}", join_criteria(&high_priorities)));
        }
        if !medium_priorities.is_empty() {
            parts.push(format!(
                "Medium priorities: {}",
                join_criteria(&medium_priorities)
            ));
        }
        let summary = if parts.is_empty() {
            "No strong priorities stated".to_string()
        } else {
            parts.join(". ")
        };

        Self {
            high_priorities,
            medium_priorities,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLeader {
    pub provider: String,
    pub total_cost_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityLeader {
    pub criterion: Criterion,
    pub provider: String,
    pub score: f64,
}

/// Observations spanning every ranked match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossMatchPatterns {
    pub cost_leader: Option<CostLeader>,
    pub priority_leaders: Vec<PriorityLeader>,
    pub trade_offs: Vec<String>,
}

impl CrossMatchPatterns {
    pub fn build(breakdowns: &[MatchBreakdown], matches: &[ScoredMatch]) -> Self {
        let cost_leader = breakdowns
            .iter()
            .filter_map(|breakdown| {
                breakdown
                    .total_cost_ratio
                    .map(|ratio| (breakdown.provider.as_str(), ratio))
            })
            .fold(None::<(&str, f64)>, |best, (provider, ratio)| match best {
                Some((_, best_ratio)) if best_ratio <= ratio => best,
                _ => Some((provider, ratio)),
            })
            .map(|(provider, ratio)| CostLeader {
                provider: provider.to_string(),
                total_cost_ratio: ratio,
            });

        let mut priority_leaders = Vec::new();
        if let Some(first) = breakdowns.first() {
            for analysis in &first.priority_analysis {
                let leader = best_on(matches, analysis.criterion)
                    .filter(|(_, score)| *score >= LEADER_SCORE);
                if let Some((entry, score)) = leader {
                    priority_leaders.push(PriorityLeader {
                        criterion: analysis.criterion,
                        provider: entry.provider.clone(),
                        score,
                    });
                }
            }
        }

        let trade_offs = breakdowns
            .iter()
            .flat_map(|breakdown| {
                breakdown.insights.iter().filter_map(move |insight| match insight {
                    Insight::TradeOff { .. } => {
                        Some(format!("{}: {}", breakdown.provider, insight.describe()))
                    }
                    _ => None,
                })
            })
            .collect();

        Self {
            cost_leader,
            priority_leaders,
            trade_offs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonVerdict {
    CloseRace,
    ClearWinner,
    LargeGap,
}

/// Head-to-head of the top two matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopComparison {
    pub leader: String,
    pub runner_up: String,
    pub gap: i16,
    pub verdict: ComparisonVerdict,
    /// Yearly cost difference in percentage points, runner-up minus leader.
    pub cost_difference: Option<f64>,
}

impl TopComparison {
    pub fn build(matches: &[ScoredMatch]) -> Option<Self> {
        let [leader, runner_up, ..] = matches else {
            return None;
        };

        let gap = i16::from(leader.match_percentage) - i16::from(runner_up.match_percentage);
        let verdict = if gap < CLOSE_RACE_GAP {
            ComparisonVerdict::CloseRace
        } else if gap < CLEAR_WINNER_GAP {
            ComparisonVerdict::ClearWinner
        } else {
            ComparisonVerdict::LargeGap
        };

        let cost_difference = match (leader.total_cost_ratio, runner_up.total_cost_ratio) {
            (Some(leader_cost), Some(runner_up_cost)) => {
                Some((runner_up_cost - leader_cost) * 100.0)
                    .filter(|difference| difference.abs() > COST_DIFFERENCE_FLOOR)
            }
            _ => None,
        };

        Some(Self {
            leader: leader.provider.clone(),
            runner_up: runner_up.provider.clone(),
            gap,
            verdict,
            cost_difference,
        })
    }
}

/// Highest scorer on a criterion; the earlier rank wins ties.
fn best_on(matches: &[ScoredMatch], criterion: Criterion) -> Option<(&ScoredMatch, f64)> {
    matches
        .iter()
        .map(|entry| (entry, score_of(entry, criterion)))
        .fold(None, |best, (entry, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((entry, score)),
        })
}

pub(crate) fn score_of(entry: &ScoredMatch, criterion: Criterion) -> f64 {
    entry.score(criterion).unwrap_or(NEUTRAL_SCORE)
}

pub(crate) fn join_criteria(criteria: &[Criterion]) -> String {
    criteria
        .iter()
        .map(|criterion| criterion.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
