use super::common::*;

use crate::catalog::InMemoryCatalog;
use crate::matching::domain::{
    BankFilter, BankFilterMode, CandidateMetrics, Criterion, ImportanceLabel, MatchOutcome,
    PreferenceSet, SoftAction, SoftPreference,
};
use crate::matching::{MatchingEngine, MatchingError, WeightTable};

fn self_directed(amount: u64) -> PreferenceSet {
    PreferenceSet {
        category: Some("self_directed".to_string()),
        amount,
        ..cost_priority()
    }
}

#[test]
fn cheapest_candidate_wins_when_cost_is_the_priority() {
    let outcome = MatchingEngine::default()
        .rank(&cost_ranking_catalog(), &cost_priority())
        .expect("ranking succeeds");

    let MatchOutcome::Ranked {
        matches,
        total_found,
        ..
    } = outcome
    else {
        panic!("expected a ranked outcome");
    };

    assert_eq!(total_found, 3);
    assert_eq!(ids(&matches), vec!["a", "b", "c"]);
    assert_eq!(percentages(&matches), vec![92, 23, 1]);
    assert!(matches[0].match_percentage > matches[1].match_percentage);
    assert!(matches[1].match_percentage > matches[2].match_percentage);
    assert_eq!(matches[0].score(Criterion::Cost), Some(10.0));
    assert_eq!(matches[1].score(Criterion::Cost), Some(5.0));
    assert_eq!(matches[2].score(Criterion::Cost), Some(1.0));
    assert_eq!(matches[0].total_cost_ratio, Some(0.01));
    assert_eq!(matches[0].weights.get(&Criterion::Cost), Some(&0.30));
}

#[test]
fn empty_catalog_reports_a_reason_instead_of_failing() {
    let preferences = PreferenceSet {
        category: Some("pension".to_string()),
        amount: 100,
        ..PreferenceSet::default()
    };

    let outcome = MatchingEngine::default()
        .rank(&InMemoryCatalog::default(), &preferences)
        .expect("empty catalog is not an error");

    match outcome {
        MatchOutcome::NoMatches {
            reason,
            filters_applied,
        } => {
            assert!(reason.starts_with("No active offerings match your criteria"));
            assert!(reason.contains("for 'pension'"));
            assert!(reason.contains("with an investment of 100"));
            assert_eq!(filters_applied.amount, 100);
        }
        other => panic!("expected no matches, got {other:?}"),
    }
}

#[test]
fn category_cluster_and_status_restrict_the_population() {
    let outcome = MatchingEngine::new(WeightTable::default(), 10)
        .rank(&sample_catalog(), &self_directed(1_000))
        .expect("ranking succeeds");

    let mut found = ids(outcome.matches());
    found.sort();
    assert_eq!(found, vec!["bolero", "keytrade"]);
}

#[test]
fn minimum_investment_excludes_small_amounts() {
    let outcome = MatchingEngine::new(WeightTable::default(), 10)
        .rank(&sample_catalog(), &self_directed(100))
        .expect("ranking succeeds");

    assert_eq!(ids(outcome.matches()), vec!["bolero"]);
}

#[test]
fn list_is_truncated_but_total_counts_every_eligible_candidate() {
    let outcome = MatchingEngine::new(WeightTable::default(), 2)
        .rank(&cost_ranking_catalog(), &cost_priority())
        .expect("ranking succeeds");

    let MatchOutcome::Ranked {
        matches,
        total_found,
        ..
    } = outcome
    else {
        panic!("expected a ranked outcome");
    };
    assert_eq!(matches.len(), 2);
    assert_eq!(total_found, 3);
}

#[test]
fn missing_metrics_fall_back_to_neutral_scores_and_ties_sort_by_id() {
    let catalog = InMemoryCatalog::new(
        vec![
            candidate("c", "Gamma Invest", "broker", None),
            candidate("a", "Alpha Broker", "broker", None),
            candidate("b", "Beta Trade", "broker", None),
        ],
        Vec::new(),
    );

    let outcome = MatchingEngine::default()
        .rank(&catalog, &cost_priority())
        .expect("ranking succeeds");
    let matches = outcome.matches();

    assert_eq!(ids(matches), vec!["a", "b", "c"]);
    for entry in matches {
        for criterion in Criterion::ALL {
            assert_eq!(entry.score(criterion), Some(5.0));
        }
        assert!((entry.aggregate_score - 0.5).abs() < 1e-9);
        assert_eq!(entry.match_percentage, 23);
    }
}

#[test]
fn single_candidate_sits_in_the_middle_of_the_percentile_range() {
    let catalog = InMemoryCatalog::new(
        vec![candidate("a", "Alpha Broker", "broker", None)],
        vec![cost_metrics("a", 0.01)],
    );

    let outcome = MatchingEngine::default()
        .rank(&catalog, &cost_priority())
        .expect("ranking succeeds");

    assert_eq!(outcome.matches()[0].score(Criterion::Cost), Some(5.0));
}

#[test]
fn direct_criteria_are_clamped_to_the_score_range() {
    let catalog = InMemoryCatalog::new(
        vec![candidate("a", "Alpha Broker", "broker", None)],
        vec![CandidateMetrics {
            sustainability: Some(14.0),
            guidance: Some(-3.0),
            ..cost_metrics("a", 0.01)
        }],
    );

    let outcome = MatchingEngine::default()
        .rank(&catalog, &cost_priority())
        .expect("ranking succeeds");
    let entry = &outcome.matches()[0];

    assert_eq!(entry.score(Criterion::Sustainability), Some(10.0));
    assert_eq!(entry.score(Criterion::Guidance), Some(1.0));
}

#[test]
fn boosted_bank_reaches_full_aggregate() {
    let preferences = PreferenceSet {
        bank_filter: Some(BankFilter {
            mode: BankFilterMode::Boost,
            banks: vec!["keytrade".to_string()],
        }),
        ..self_directed(1_000)
    };

    let outcome = MatchingEngine::default()
        .rank(&sample_catalog(), &preferences)
        .expect("ranking succeeds");
    let top = &outcome.matches()[0];

    assert_eq!(top.candidate_id.0, "keytrade");
    assert!(top.boost_applied);
    assert_eq!(top.aggregate_score, 1.0);
    assert_eq!(top.match_percentage, 100);
    assert!(!outcome.matches()[1].boost_applied);
}

#[test]
fn include_and_exclude_bank_filters_match_provider_names() {
    let engine = MatchingEngine::default();
    let include = PreferenceSet {
        bank_filter: Some(BankFilter {
            mode: BankFilterMode::Include,
            banks: vec!["BOLERO".to_string()],
        }),
        ..self_directed(1_000)
    };
    let exclude = PreferenceSet {
        bank_filter: Some(BankFilter {
            mode: BankFilterMode::Exclude,
            banks: vec!["Bolero".to_string()],
        }),
        ..self_directed(1_000)
    };

    let included = engine.rank(&sample_catalog(), &include).expect("ranks");
    let excluded = engine.rank(&sample_catalog(), &exclude).expect("ranks");

    assert_eq!(ids(included.matches()), vec!["bolero"]);
    assert_eq!(ids(excluded.matches()), vec!["keytrade"]);
}

#[test]
fn soft_preferences_reshape_the_ranked_list() {
    let boost = PreferenceSet {
        soft_preferences: vec![SoftPreference {
            action: SoftAction::BoostBanks,
            banks: vec!["beta".to_string()],
        }],
        ..cost_priority()
    };
    let include = PreferenceSet {
        soft_preferences: vec![SoftPreference {
            action: SoftAction::IncludeBanks,
            banks: vec!["Alpha".to_string()],
        }],
        ..cost_priority()
    };

    let engine = MatchingEngine::default();
    let boosted = engine.rank(&cost_ranking_catalog(), &boost).expect("ranks");
    let narrowed = engine.rank(&cost_ranking_catalog(), &include).expect("ranks");

    assert_eq!(percentages(boosted.matches()), vec![92, 32, 1]);
    assert_eq!(ids(narrowed.matches()), vec!["a"]);
}

#[test]
fn excluding_every_remaining_bank_yields_no_matches() {
    let preferences = PreferenceSet {
        soft_preferences: vec![SoftPreference {
            action: SoftAction::ExcludeBanks,
            banks: vec!["bolero".to_string(), "keytrade".to_string()],
        }],
        ..self_directed(1_000)
    };

    let outcome = MatchingEngine::default()
        .rank(&sample_catalog(), &preferences)
        .expect("ranking succeeds");

    match outcome {
        MatchOutcome::NoMatches { reason, .. } => assert!(reason.contains("bank preferences")),
        other => panic!("expected no matches, got {other:?}"),
    }
}

#[test]
fn ranking_is_deterministic_and_bounded() {
    let engine = MatchingEngine::new(WeightTable::default(), 10);
    let preferences = PreferenceSet::default()
        .with_importance(Criterion::Guidance, ImportanceLabel::VeryImportant);

    let first = engine.rank(&sample_catalog(), &preferences).expect("ranks");
    let second = engine.rank(&sample_catalog(), &preferences).expect("ranks");

    assert_eq!(first, second);
    for entry in first.matches() {
        assert!(entry.match_percentage <= 100);
        assert!((0.0..=1.0).contains(&entry.aggregate_score));
    }
}

#[test]
fn catalog_failures_propagate() {
    let result = MatchingEngine::default().rank(&UnavailableCatalog, &cost_priority());

    assert!(matches!(result, Err(MatchingError::Catalog(_))));
}
