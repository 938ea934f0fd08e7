use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::domain::{CandidateId, Criterion, PreferenceSet, ScoredMatch};

const PREFERRED_FACTOR: f64 = 1.15;
const BOOST_FACTOR: f64 = 1.10;
const REDUCE_FACTOR: f64 = 0.95;
const NEUTRAL_MIDPOINT: f64 = 5.0;
const DELTA_SENSITIVITY: f64 = 3.0;

/// Structured re-ranking instruction parsed from a follow-up answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Impact {
    /// Relative change of a criterion's importance; 1.0 means unchanged.
    WeightDelta { criterion: Criterion, multiplier: f64 },
    PreferredMatch { candidate_id: CandidateId },
    BoostSimilar,
    ReduceSimilar,
    Neutral,
    /// Re-score upstream with every top-tier importance stepped down.
    LowerThresholds,
    MaintainStandards,
    RestartWizard,
}

/// Parses raw impact objects, skipping anything unrecognised.
///
/// Flags set to `false` are dropped rather than treated as errors.
pub fn parse_impacts(raw: &[Value]) -> Vec<Impact> {
    let mut impacts = Vec::new();

    for entry in raw {
        let Some(object) = entry.as_object() else {
            warn!(impact = %entry, "skipping impact that is not an object");
            continue;
        };

        for (key, value) in object {
            match parse_entry(key, value) {
                Ok(Some(impact)) => impacts.push(impact),
                Ok(None) => debug!(key = %key, "impact flag disabled"),
                Err(reason) => {
                    warn!(key = %key, value = %value, reason, "skipping malformed impact")
                }
            }
        }
    }

    impacts
}

fn parse_entry(key: &str, value: &Value) -> Result<Option<Impact>, &'static str> {
    if let Some(criterion) = key.strip_prefix("weight_") {
        let criterion = Criterion::parse(criterion).ok_or("unknown criterion")?;
        let multiplier = value
            .as_f64()
            .filter(|multiplier| multiplier.is_finite())
            .ok_or("weight delta must be a number")?;
        return Ok(Some(Impact::WeightDelta {
            criterion,
            multiplier,
        }));
    }

    if key == "preferred_match" {
        let id = value
            .as_str()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or("preferred match must be a non-empty string")?;
        return Ok(Some(Impact::PreferredMatch {
            candidate_id: CandidateId::from(id),
        }));
    }

    let impact = match key {
        "boost_similar_attributes" | "boost_similar" => Impact::BoostSimilar,
        "reduce_similar_attributes" | "reduce_similar" => Impact::ReduceSimilar,
        "neutral_weight" | "neutral" => Impact::Neutral,
        "lower_thresholds" | "expand_scope" => Impact::LowerThresholds,
        "maintain_standards" => Impact::MaintainStandards,
        "restart_wizard" => Impact::RestartWizard,
        _ => return Err("unknown impact key"),
    };

    match value.as_bool() {
        Some(true) => Ok(Some(impact)),
        Some(false) => Ok(None),
        None => Err("flag must be a boolean"),
    }
}

/// Pure adjustments folded out of an impact list.
#[derive(Debug, Default)]
struct AdjustmentPlan {
    deltas: BTreeMap<Criterion, Vec<f64>>,
    preferred: Option<CandidateId>,
    boost: bool,
    reduce: bool,
}

impl AdjustmentPlan {
    fn from_impacts(impacts: &[Impact]) -> Self {
        let mut plan = Self::default();
        for impact in impacts {
            match impact {
                Impact::WeightDelta {
                    criterion,
                    multiplier,
                } => {
                    plan.deltas.entry(*criterion).or_default().push(*multiplier);
                }
                Impact::PreferredMatch { candidate_id } => {
                    plan.preferred = Some(candidate_id.clone());
                }
                Impact::BoostSimilar => plan.boost = true,
                Impact::ReduceSimilar => plan.reduce = true,
                Impact::Neutral
                | Impact::LowerThresholds
                | Impact::MaintainStandards
                | Impact::RestartWizard => {}
            }
        }
        plan
    }

    /// Mean signed nudge over criteria carrying both a delta and a score.
    fn weight_nudge(&self, entry: &ScoredMatch) -> Option<f64> {
        let nudges: Vec<f64> = self
            .deltas
            .iter()
            .filter_map(|(criterion, multipliers)| {
                let delta = multipliers.iter().sum::<f64>() / multipliers.len() as f64;
                entry.score(*criterion).map(|score| {
                    (score - NEUTRAL_MIDPOINT) * (delta - 1.0) * DELTA_SENSITIVITY
                })
            })
            .collect();

        if nudges.is_empty() {
            None
        } else {
            Some(nudges.iter().sum::<f64>() / nudges.len() as f64)
        }
    }
}

/// Re-ranks an already scored list without touching the catalog.
///
/// Output is sorted by percentage; ties keep their incoming order.
pub fn adjust(matches: Vec<ScoredMatch>, impacts: &[Impact]) -> Vec<ScoredMatch> {
    let plan = AdjustmentPlan::from_impacts(impacts);

    let mut working: Vec<(ScoredMatch, f64)> = matches
        .into_iter()
        .map(|entry| {
            let mut percentage = f64::from(entry.match_percentage.min(100));
            if let Some(nudge) = plan.weight_nudge(&entry) {
                percentage = (percentage + nudge).clamp(0.0, 100.0);
            }
            (entry, percentage)
        })
        .collect();

    let top = working
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (index, (_, percentage))| match best {
            Some((_, best_percentage)) if best_percentage >= *percentage => best,
            _ => Some((index, *percentage)),
        })
        .map(|(index, _)| index);

    for (index, (entry, percentage)) in working.iter_mut().enumerate() {
        if plan.preferred.as_ref() == Some(&entry.candidate_id) {
            *percentage = (*percentage * PREFERRED_FACTOR).min(100.0);
            continue;
        }

        let mut multiplier = 1.0;
        if plan.boost {
            multiplier *= BOOST_FACTOR;
        }
        if plan.reduce && Some(index) != top {
            multiplier *= REDUCE_FACTOR;
        }
        *percentage = (*percentage * multiplier).clamp(0.0, 100.0);
    }

    let mut adjusted: Vec<ScoredMatch> = working
        .into_iter()
        .map(|(mut entry, percentage)| {
            entry.match_percentage = percentage.round() as u8;
            entry
        })
        .collect();
    adjusted.sort_by(|left, right| right.match_percentage.cmp(&left.match_percentage));
    adjusted
}

/// Result of a recalculation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecalculationOutcome {
    Reranked {
        matches: Vec<ScoredMatch>,
        thresholds_lowered: bool,
    },
    /// The user asked to start the quiz over; nothing was re-ranked.
    RestartRequested,
}

/// Applies impacts to a ranked list. `LowerThresholds` replaces the working
/// list with a fresh ranking for the loosened preferences before the pure
/// adjustments run.
pub fn recalculate<F, E>(
    preferences: &PreferenceSet,
    ranked: Vec<ScoredMatch>,
    impacts: &[Impact],
    rescore: F,
) -> Result<RecalculationOutcome, E>
where
    F: FnOnce(&PreferenceSet) -> Result<Vec<ScoredMatch>, E>,
{
    if impacts.contains(&Impact::RestartWizard) {
        return Ok(RecalculationOutcome::RestartRequested);
    }

    let thresholds_lowered = impacts.contains(&Impact::LowerThresholds);
    let working = if thresholds_lowered {
        rescore(&preferences.loosened())?
    } else {
        ranked
    };

    Ok(RecalculationOutcome::Reranked {
        matches: adjust(working, impacts),
        thresholds_lowered,
    })
}
