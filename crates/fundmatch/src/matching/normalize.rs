use std::cmp::Ordering;

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 10;

/// Ranks raw metric values against their population and buckets the
/// percentile onto the 1-10 scale.
///
/// Output has the same length and order as `values`. Absent or non-finite
/// entries stay `None`. With `descending_is_better` the lowest value earns the
/// highest score (cost-like metrics); otherwise the highest value does.
/// Equal values share the average of the positions they occupy.
pub fn normalize(values: &[Option<f64>], descending_is_better: bool) -> Vec<Option<u8>> {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|value| value.is_finite())
        .collect();

    if present.is_empty() {
        return vec![None; values.len()];
    }

    present.sort_by(|left, right| {
        let ordering = left.partial_cmp(right).unwrap_or(Ordering::Equal);
        if descending_is_better {
            ordering
        } else {
            ordering.reverse()
        }
    });

    values
        .iter()
        .map(|value| {
            value
                .filter(|value| value.is_finite())
                .map(|value| bucket(percentile(&present, value)))
        })
        .collect()
}

/// Position of `value` in the best-first population, expressed in [0, 1]
/// where 1 is the best.
fn percentile(sorted: &[f64], value: f64) -> f64 {
    if sorted.len() == 1 {
        return 0.5;
    }

    let first = sorted.iter().position(|candidate| *candidate == value);
    let last = sorted.iter().rposition(|candidate| *candidate == value);
    let position = match (first, last) {
        (Some(first), Some(last)) => (first + last) as f64 / 2.0,
        _ => 0.0,
    };

    1.0 - position / (sorted.len() - 1) as f64
}

fn bucket(percentile: f64) -> u8 {
    let raw = (percentile * 9.0).floor() + 1.0;
    raw.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_like_metrics_reward_the_lowest_value() {
        let scores = normalize(&[Some(0.01), Some(0.02), Some(0.03)], true);
        assert_eq!(scores, vec![Some(10), Some(5), Some(1)]);
    }

    #[test]
    fn return_like_metrics_reward_the_highest_value() {
        let scores = normalize(&[Some(0.03), Some(0.07), Some(0.05)], false);
        assert_eq!(scores, vec![Some(1), Some(10), Some(5)]);
    }

    #[test]
    fn absent_entries_keep_their_position() {
        let scores = normalize(&[None, Some(0.02), Some(f64::NAN), Some(0.01)], true);
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0], None);
        assert_eq!(scores[2], None);
        assert_eq!(scores[1], Some(1));
        assert_eq!(scores[3], Some(10));
    }

    #[test]
    fn all_absent_input_stays_absent() {
        assert_eq!(normalize(&[None, None, None], true), vec![None, None, None]);
        assert!(normalize(&[], false).is_empty());
    }

    #[test]
    fn single_value_lands_mid_scale() {
        assert_eq!(normalize(&[Some(0.5)], true), vec![Some(5)]);
        assert_eq!(normalize(&[None, Some(0.5)], false), vec![None, Some(5)]);
    }

    #[test]
    fn ties_share_a_score_in_both_directions() {
        let ascending = normalize(&[Some(0.02), Some(0.01), Some(0.02)], true);
        assert_eq!(ascending[0], ascending[2]);
        assert_eq!(ascending[1], Some(10));

        let descending = normalize(&[Some(0.02), Some(0.01), Some(0.02)], false);
        assert_eq!(descending[0], descending[2]);
        assert_eq!(descending[1], Some(1));
    }

    #[test]
    fn scores_stay_within_bounds() {
        let values: Vec<Option<f64>> = (0..25).map(|step| Some(step as f64 * 0.37)).collect();
        for direction in [true, false] {
            for score in normalize(&values, direction).into_iter().flatten() {
                assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
            }
        }
    }
}
