use serde::Serialize;
use serde_json::{json, Value};

use super::analysis::score_of;
use crate::matching::domain::{Criterion, ImportanceLabel, PreferenceSet, ScoredMatch};

const CLOSE_RACE_GAP: i16 = 5;
const LOW_SCORE_THRESHOLD: u8 = 75;
const PRIORITY_MISS_SCORE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    InsufficientData,
    CloseRace,
    LowScores,
    PriorityMiss,
    Refinement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissedPriority {
    pub criterion: Criterion,
    pub score: f64,
}

/// Situation the ranked list puts the user in, used to pick follow-up questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_gap: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missed_priority: Option<MissedPriority>,
}

impl Scenario {
    fn new(kind: ScenarioKind, urgency: Option<Urgency>, description: Option<String>) -> Self {
        Self {
            kind,
            urgency,
            description,
            score_gap: None,
            missed_priority: None,
        }
    }
}

/// Classifies a ranked list. Checks run in a fixed order and the first hit wins.
pub fn detect_scenario(matches: &[ScoredMatch], preferences: &PreferenceSet) -> Scenario {
    let [top, second, ..] = matches else {
        return Scenario::new(ScenarioKind::InsufficientData, None, None);
    };

    let gap = i16::from(top.match_percentage) - i16::from(second.match_percentage);
    if gap <= CLOSE_RACE_GAP {
        return Scenario {
            score_gap: Some(gap),
            ..Scenario::new(
                ScenarioKind::CloseRace,
                Some(Urgency::High),
                Some(format!(
                    "Close race: {}% vs {}%",
                    top.match_percentage, second.match_percentage
                )),
            )
        };
    }

    if top.match_percentage < LOW_SCORE_THRESHOLD {
        return Scenario::new(
            ScenarioKind::LowScores,
            Some(Urgency::Medium),
            Some(format!(
                "Low scores: the best match reaches {}%",
                top.match_percentage
            )),
        );
    }

    let missed = Criterion::ALL.iter().find_map(|criterion| {
        let score = score_of(top, *criterion);
        (preferences.importance_of(*criterion) == ImportanceLabel::VeryImportant
            && score < PRIORITY_MISS_SCORE)
            .then_some(MissedPriority {
                criterion: *criterion,
                score,
            })
    });
    if let Some(missed) = missed {
        return Scenario {
            description: Some(format!(
                "Priority miss: {} scores {:.1}",
                missed.criterion.display_name(),
                missed.score
            )),
            missed_priority: Some(missed),
            ..Scenario::new(ScenarioKind::PriorityMiss, Some(Urgency::High), None)
        };
    }

    Scenario::new(
        ScenarioKind::Refinement,
        Some(Urgency::Low),
        Some("Good matches, refinement possible".to_string()),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    /// Impact object accepted by the recalculation endpoint.
    pub impact: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowUpQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
}

fn option(id: &str, label: String, impact: Value) -> QuestionOption {
    QuestionOption {
        id: id.to_string(),
        label,
        impact,
    }
}

/// Questions whose answers feed back into recalculation as impacts.
pub fn follow_up_questions(
    scenario: &Scenario,
    matches: &[ScoredMatch],
) -> Vec<FollowUpQuestion> {
    match scenario.kind {
        ScenarioKind::InsufficientData => Vec::new(),
        ScenarioKind::CloseRace => close_race_questions(matches),
        ScenarioKind::LowScores => matches.first().map(scope_question).into_iter().collect(),
        ScenarioKind::PriorityMiss | ScenarioKind::Refinement => {
            matches.first().and_then(strength_question).into_iter().collect()
        }
    }
}

fn close_race_questions(matches: &[ScoredMatch]) -> Vec<FollowUpQuestion> {
    let [first, second, ..] = matches else {
        return Vec::new();
    };

    let costs = (first.total_cost_ratio, second.total_cost_ratio);
    if let (Some(first_cost), Some(second_cost)) = costs {
        if first_cost != second_cost {
            let (cheaper, costlier) = if first_cost < second_cost {
                (first, second)
            } else {
                (second, first)
            };
            let difference = (first_cost - second_cost).abs() * 100.0;
            return vec![FollowUpQuestion {
                id: "cost_trade_off".to_string(),
                prompt: format!(
                    "{} is {difference:.2}% per year cheaper, but {} scores higher elsewhere. \
                     What matters more to you?",
                    cheaper.provider, costlier.provider
                ),
                options: vec![
                    option(
                        "lower_cost",
                        format!("Go for lower costs ({})", cheaper.provider),
                        json!({ "weight_cost": 1.5, "preferred_match": cheaper.candidate_id }),
                    ),
                    option(
                        "better_overall",
                        format!("Go for the better overall score ({})", costlier.provider),
                        json!({ "weight_cost": 0.8, "preferred_match": costlier.candidate_id }),
                    ),
                ],
            }];
        }
    }

    let (guided, digital) =
        if score_of(first, Criterion::Guidance) >= score_of(second, Criterion::Guidance) {
            (first, second)
        } else {
            (second, first)
        };
    vec![FollowUpQuestion {
        id: "guidance_or_platform".to_string(),
        prompt: format!(
            "{} offers more personal guidance, {} has the stronger digital platform. \
             Which suits you better?",
            guided.provider, digital.provider
        ),
        options: vec![
            option(
                "guidance",
                "I value personal guidance".to_string(),
                json!({ "weight_guidance": 1.4, "preferred_match": guided.candidate_id }),
            ),
            option(
                "platform",
                "I prefer a strong digital platform".to_string(),
                json!({ "weight_features": 1.4, "preferred_match": digital.candidate_id }),
            ),
        ],
    }]
}

fn scope_question(top: &ScoredMatch) -> FollowUpQuestion {
    FollowUpQuestion {
        id: "expand_scope".to_string(),
        prompt: format!(
            "The best option ({}) scores {}%. Do you want to relax your criteria for more choice?",
            top.provider, top.match_percentage
        ),
        options: vec![
            option(
                "expand",
                "Yes, show more options".to_string(),
                json!({ "lower_thresholds": true, "expand_scope": true }),
            ),
            option(
                "maintain",
                "No, I keep my requirements".to_string(),
                json!({ "maintain_standards": true }),
            ),
            option(
                "restart",
                "Let me set my priorities again".to_string(),
                json!({ "restart_wizard": true }),
            ),
        ],
    }
}

fn strength_question(top: &ScoredMatch) -> Option<FollowUpQuestion> {
    let strength = top.strengths.first()?;
    Some(FollowUpQuestion {
        id: "main_strength".to_string(),
        prompt: format!(
            "{} stands out for '{strength}'. How important is this to you?",
            top.provider
        ),
        options: vec![
            option(
                "very",
                "Very important, exactly what I am looking for".to_string(),
                json!({ "boost_similar_attributes": true }),
            ),
            option(
                "nice",
                "Nice to have, not decisive".to_string(),
                json!({ "neutral_weight": true }),
            ),
            option(
                "not",
                "Not that important to me".to_string(),
                json!({ "reduce_similar_attributes": true }),
            ),
        ],
    })
}
