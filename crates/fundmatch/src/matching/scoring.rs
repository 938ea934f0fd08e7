use std::collections::BTreeMap;

use super::domain::Criterion;

const SIGMOID_MIDPOINT: f64 = 0.6;
const SIGMOID_STEEPNESS: f64 = 12.0;

/// Coarse bucketing of a 1-10 criterion score onto [0, 1].
pub fn rescale(score: f64) -> f64 {
    if score >= 9.0 {
        1.0
    } else if score >= 7.0 {
        0.8
    } else if score >= 5.0 {
        0.5
    } else if score >= 3.0 {
        0.2
    } else {
        0.0
    }
}

/// Weighted mean of rescaled scores.
///
/// Only criteria with a score and a registered weight take part. When every
/// participating weight is zero the unweighted mean of the rescaled scores is
/// used instead, and with no scored criteria at all the aggregate is `0.0`.
pub fn aggregate(
    scores: &BTreeMap<Criterion, Option<f64>>,
    weights: &BTreeMap<Criterion, f64>,
) -> f64 {
    let scored: Vec<(f64, Option<f64>)> = scores
        .iter()
        .filter_map(|(criterion, score)| {
            score
                .filter(|score| score.is_finite())
                .map(|score| (rescale(score), weights.get(criterion).copied()))
        })
        .collect();

    if scored.is_empty() {
        return 0.0;
    }

    let (weighted_sum, total_weight) = scored
        .iter()
        .filter_map(|(rescaled, weight)| weight.map(|weight| (*rescaled, weight.max(0.0))))
        .fold((0.0, 0.0), |(sum, total), (rescaled, weight)| {
            (sum + rescaled * weight, total + weight)
        });

    if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    } else {
        scored.iter().map(|(rescaled, _)| rescaled).sum::<f64>() / scored.len() as f64
    }
}

/// Maps an aggregate in [0, 1] to a user-facing percentage.
///
/// The logistic curve is centred on 0.6 with steepness 12 and stretched so
/// that 0 maps to 0 and 1 maps to 100.
pub fn to_percentage(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }

    let score = score.clamp(0.0, 1.0);
    let floor = sigmoid(0.0);
    let ceiling = sigmoid(1.0);
    let stretched = (sigmoid(score) - floor) / (ceiling - floor) * 100.0;

    stretched.round().clamp(0.0, 100.0) as u8
}

fn sigmoid(score: f64) -> f64 {
    100.0 / (1.0 + (-SIGMOID_STEEPNESS * (score - SIGMOID_MIDPOINT)).exp())
}
