use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::catalog::CatalogSource;

use super::domain::{
    Candidate, CandidateId, CandidateMetrics, Criterion, FiltersApplied, MatchOutcome,
    NormalizationPolicy, PreferenceSet, ScoredMatch,
};
use super::filter::{candidate_query, filter_candidates, is_boosted};
use super::normalize::normalize;
use super::scoring::{aggregate, to_percentage};
use super::soft::apply_soft_preferences;
use super::weights::WeightTable;
use super::MatchingError;

/// Score used for a criterion the catalog has no data for.
pub const NEUTRAL_SCORE: f64 = 5.0;
const BOOST_BONUS: f64 = 1.0;

/// Stateless ranker applying the weight table to the eligible population.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    weights: WeightTable,
    top_n: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(WeightTable::default(), 3)
    }
}

impl MatchingEngine {
    pub fn new(weights: WeightTable, top_n: usize) -> Self {
        Self {
            weights,
            top_n: top_n.max(1),
        }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Full ranking pass: filter, bulk metric fetch, scoring, soft
    /// preferences, truncation.
    pub fn rank<C>(
        &self,
        catalog: &C,
        preferences: &PreferenceSet,
    ) -> Result<MatchOutcome, MatchingError>
    where
        C: CatalogSource + ?Sized,
    {
        let filters_applied = FiltersApplied::from_preferences(preferences);
        let fetched = catalog.fetch_candidates(&candidate_query(preferences.category.as_deref()))?;
        let fetched_count = fetched.len();

        let eligible = filter_candidates(
            fetched,
            preferences.category.as_deref(),
            preferences.amount,
            preferences.bank_filter.as_ref(),
        );

        if eligible.is_empty() {
            info!(fetched = fetched_count, "no candidates passed the filters");
            return Ok(MatchOutcome::NoMatches {
                reason: no_match_reason(preferences),
                filters_applied,
            });
        }

        let ids: BTreeSet<CandidateId> = eligible
            .iter()
            .map(|candidate| candidate.id.clone())
            .collect();
        let metrics = catalog.fetch_metrics(&ids)?;
        debug!(
            eligible = eligible.len(),
            metrics = metrics.len(),
            "fetched candidate metrics"
        );

        let scored = self.score_candidates(&eligible, &metrics, preferences);
        let mut matches = apply_soft_preferences(scored, &preferences.soft_preferences);
        sort_ranked(&mut matches);

        if matches.is_empty() {
            info!("soft preferences removed every candidate");
            return Ok(MatchOutcome::NoMatches {
                reason: "None of the remaining providers match your bank preferences.".to_string(),
                filters_applied,
            });
        }

        let total_found = matches.len();
        matches.truncate(self.top_n);
        info!(total_found, returned = matches.len(), "ranked candidates");

        Ok(MatchOutcome::Ranked {
            matches,
            total_found,
            filters_applied,
        })
    }

    /// Scores already-filtered candidates. Percentiles are taken over exactly
    /// this population, and the result is sorted best first.
    pub fn score_candidates(
        &self,
        candidates: &[Candidate],
        metrics: &[CandidateMetrics],
        preferences: &PreferenceSet,
    ) -> Vec<ScoredMatch> {
        let by_id: BTreeMap<&CandidateId, &CandidateMetrics> = metrics
            .iter()
            .map(|record| (&record.candidate_id, record))
            .collect();
        let population: Vec<Option<&CandidateMetrics>> = candidates
            .iter()
            .map(|candidate| by_id.get(&candidate.id).copied())
            .collect();

        let per_criterion: BTreeMap<Criterion, Vec<Option<f64>>> = Criterion::ALL
            .iter()
            .map(|criterion| (*criterion, criterion_scores(*criterion, &population)))
            .collect();

        let weights = self.weights.resolve(preferences);
        let bank_filter = preferences.bank_filter.as_ref();

        let mut matches: Vec<ScoredMatch> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let scores: BTreeMap<Criterion, f64> = per_criterion
                    .iter()
                    .map(|(criterion, column)| {
                        (*criterion, column[index].unwrap_or(NEUTRAL_SCORE))
                    })
                    .collect();
                let with_defaults: BTreeMap<Criterion, Option<f64>> = scores
                    .iter()
                    .map(|(criterion, score)| (*criterion, Some(*score)))
                    .collect();

                let mut aggregate_score = aggregate(&with_defaults, &weights);
                let boost_applied = is_boosted(candidate, bank_filter);
                if boost_applied {
                    aggregate_score = (aggregate_score + BOOST_BONUS).min(1.0);
                }

                ScoredMatch {
                    candidate_id: candidate.id.clone(),
                    provider: candidate.provider.clone(),
                    category: candidate.category.clone(),
                    minimum_investment: candidate.minimum_investment,
                    strengths: candidate.strengths.clone(),
                    weaknesses: candidate.weaknesses.clone(),
                    total_cost_ratio: population[index]
                        .and_then(|record| record.raw(Criterion::Cost)),
                    scores,
                    weights: weights.clone(),
                    aggregate_score,
                    match_percentage: to_percentage(aggregate_score),
                    boost_applied,
                }
            })
            .collect();

        sort_ranked(&mut matches);
        matches
    }
}

/// Per-candidate scores for one criterion, aligned with `population`.
fn criterion_scores(
    criterion: Criterion,
    population: &[Option<&CandidateMetrics>],
) -> Vec<Option<f64>> {
    let raw: Vec<Option<f64>> = population
        .iter()
        .map(|record| record.and_then(|record| record.raw(criterion)))
        .collect();

    match criterion.policy() {
        NormalizationPolicy::Direct => raw
            .into_iter()
            .map(|value| value.map(|value| value.clamp(1.0, 10.0)))
            .collect(),
        NormalizationPolicy::Percentile {
            descending_is_better,
        } => normalize(&raw, descending_is_better)
            .into_iter()
            .map(|score| score.map(f64::from))
            .collect(),
    }
}

/// Percentage desc, then aggregate desc, then id asc.
pub(crate) fn sort_ranked(matches: &mut [ScoredMatch]) {
    matches.sort_by(|left, right| {
        right
            .match_percentage
            .cmp(&left.match_percentage)
            .then_with(|| {
                right
                    .aggregate_score
                    .partial_cmp(&left.aggregate_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| left.candidate_id.cmp(&right.candidate_id))
    });
}

fn no_match_reason(preferences: &PreferenceSet) -> String {
    let mut reason = String::from("No active offerings match your criteria");
    if let Some(category) = preferences.category.as_deref() {
        reason.push_str(&format!(" for '{category}'"));
    }
    if preferences.amount > 0 {
        reason.push_str(&format!(" with an investment of {}", preferences.amount));
    }
    if preferences.bank_filter.is_some() {
        reason.push_str(" and your bank selection");
    }
    reason.push_str(". Try a different investment type or amount.");
    reason
}
