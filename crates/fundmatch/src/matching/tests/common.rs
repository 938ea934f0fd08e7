use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::catalog::{CandidateQuery, CatalogError, CatalogSource, InMemoryCatalog};
use crate::config::MatchingConfig;
use crate::matching::domain::{
    Candidate, CandidateId, CandidateMetrics, CandidateStatus, Criterion, ImportanceLabel,
    PreferenceSet, ScoredMatch,
};
use crate::matching::explain::{ExplanationContext, Highlights, NarrativeError, NarrativeGenerator};
use crate::matching::{matching_router, MatchingService};
use crate::refinement::{InterpretError, Interpretation, TextInterpreter};

pub(super) fn candidate(
    id: &str,
    provider: &str,
    category: &str,
    minimum_investment: Option<u64>,
) -> Candidate {
    Candidate {
        id: CandidateId::from(id),
        provider: provider.to_string(),
        category: category.to_string(),
        status: CandidateStatus::Active,
        minimum_investment,
        strengths: vec![format!("{provider} app")],
        weaknesses: Vec::new(),
    }
}

pub(super) fn cost_metrics(id: &str, total_cost_ratio: f64) -> CandidateMetrics {
    CandidateMetrics {
        total_cost_ratio: Some(total_cost_ratio),
        ..CandidateMetrics::empty(CandidateId::from(id))
    }
}

pub(super) fn full_metrics(
    id: &str,
    total_cost_ratio: f64,
    expected_return: f64,
    sustainability: f64,
    guidance: f64,
    features: f64,
) -> CandidateMetrics {
    CandidateMetrics {
        candidate_id: CandidateId::from(id),
        total_cost_ratio: Some(total_cost_ratio),
        expected_return: Some(expected_return),
        sustainability: Some(sustainability),
        guidance: Some(guidance),
        features: Some(features),
    }
}

/// Three brokers differing only in cost.
pub(super) fn cost_ranking_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(
        vec![
            candidate("c", "Gamma Invest", "broker", None),
            candidate("a", "Alpha Broker", "broker", None),
            candidate("b", "Beta Trade", "broker", None),
        ],
        vec![
            cost_metrics("a", 0.01),
            cost_metrics("b", 0.02),
            cost_metrics("c", 0.03),
        ],
    )
}

/// Cost very important, every other criterion in the lowest tier.
pub(super) fn cost_priority() -> PreferenceSet {
    Criterion::ALL
        .iter()
        .fold(PreferenceSet::default(), |preferences, criterion| {
            preferences.with_importance(*criterion, ImportanceLabel::NotImportant)
        })
        .with_importance(Criterion::Cost, ImportanceLabel::VeryImportant)
}

/// Mixed catalog covering every category cluster.
pub(super) fn sample_catalog() -> InMemoryCatalog {
    let mut inactive = candidate("retired", "Old Savings", "broker", None);
    inactive.status = CandidateStatus::Inactive;

    InMemoryCatalog::new(
        vec![
            candidate("bolero", "Bolero", "broker", None),
            candidate("keytrade", "Keytrade Bank", "execution_only", Some(250)),
            candidate("kbc-advice", "KBC Bank", "advisory", Some(5_000)),
            candidate("belfius-managed", "Belfius Bank", "discretionary", Some(25_000)),
            candidate("argenta-pension", "Argenta", "pension_savings", None),
            inactive,
        ],
        vec![
            full_metrics("bolero", 0.004, 0.061, 5.0, 3.0, 8.0),
            full_metrics("keytrade", 0.006, 0.058, 6.0, 2.0, 9.0),
            full_metrics("kbc-advice", 0.012, 0.055, 7.0, 9.0, 6.0),
            full_metrics("belfius-managed", 0.018, 0.063, 8.0, 8.0, 5.0),
            full_metrics("argenta-pension", 0.009, 0.045, 6.0, 5.0, 4.0),
            full_metrics("retired", 0.001, 0.090, 10.0, 10.0, 10.0),
        ],
    )
}

pub(super) fn scored(id: &str, provider: &str, match_percentage: u8) -> ScoredMatch {
    ScoredMatch {
        candidate_id: CandidateId::from(id),
        provider: provider.to_string(),
        category: "broker".to_string(),
        minimum_investment: None,
        strengths: vec![format!("{provider} platform")],
        weaknesses: Vec::new(),
        total_cost_ratio: None,
        scores: Criterion::ALL
            .iter()
            .map(|criterion| (*criterion, 5.0))
            .collect(),
        weights: BTreeMap::new(),
        aggregate_score: f64::from(match_percentage) / 100.0,
        match_percentage,
        boost_applied: false,
    }
}

pub(super) fn with_score(mut entry: ScoredMatch, criterion: Criterion, score: f64) -> ScoredMatch {
    entry.scores.insert(criterion, score);
    entry
}

pub(super) fn with_cost(mut entry: ScoredMatch, total_cost_ratio: f64) -> ScoredMatch {
    entry.total_cost_ratio = Some(total_cost_ratio);
    entry
}

pub(super) fn ids(matches: &[ScoredMatch]) -> Vec<&str> {
    matches
        .iter()
        .map(|entry| entry.candidate_id.0.as_str())
        .collect()
}

pub(super) fn percentages(matches: &[ScoredMatch]) -> Vec<u8> {
    matches.iter().map(|entry| entry.match_percentage).collect()
}

pub(super) struct UnavailableCatalog;

impl CatalogSource for UnavailableCatalog {
    fn fetch_candidates(&self, _query: &CandidateQuery) -> Result<Vec<Candidate>, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn fetch_metrics(
        &self,
        _ids: &BTreeSet<CandidateId>,
    ) -> Result<Vec<CandidateMetrics>, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }
}

pub(super) enum StubInterpreter {
    Returns(Interpretation),
    Fails,
    Slow(Duration),
}

impl TextInterpreter for StubInterpreter {
    fn interpret(
        &self,
        _text: &str,
        _current: &PreferenceSet,
    ) -> Result<Interpretation, InterpretError> {
        match self {
            StubInterpreter::Returns(interpretation) => Ok(interpretation.clone()),
            StubInterpreter::Fails => Err(InterpretError::Unavailable("quota".to_string())),
            StubInterpreter::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(Interpretation::default())
            }
        }
    }
}

#[derive(Default)]
pub(super) struct StubNarrator {
    pub(super) fail: bool,
    pub(super) delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubNarrator {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(super) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond<T>(&self, value: T) -> Result<T, NarrativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            Err(NarrativeError::Unavailable("model offline".to_string()))
        } else {
            Ok(value)
        }
    }
}

impl NarrativeGenerator for StubNarrator {
    fn summarize(&self, context: &ExplanationContext) -> Result<String, NarrativeError> {
        self.respond(format!("Generated report for {} matches", context.matches.len()))
    }

    fn highlights(&self, _context: &ExplanationContext) -> Result<Highlights, NarrativeError> {
        self.respond(Highlights {
            key_insight: "generated insight".to_string(),
            trade_offs: "generated trade-offs".to_string(),
            priority_analysis: "generated priorities".to_string(),
        })
    }
}

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        collaborator_timeout: Duration::from_millis(50),
        ..MatchingConfig::default()
    }
}

pub(super) fn build_service<C: CatalogSource + 'static>(
    catalog: C,
    interpreter: StubInterpreter,
    narrator: StubNarrator,
) -> MatchingService<C, StubInterpreter, StubNarrator> {
    MatchingService::new(
        Arc::new(catalog),
        Arc::new(interpreter),
        Arc::new(narrator),
        &matching_config(),
    )
}

pub(super) fn default_service() -> MatchingService<InMemoryCatalog, StubInterpreter, StubNarrator>
{
    build_service(
        sample_catalog(),
        StubInterpreter::Returns(Interpretation::default()),
        StubNarrator::default(),
    )
}

pub(super) fn router_with_service<C: CatalogSource + 'static>(
    service: MatchingService<C, StubInterpreter, StubNarrator>,
) -> axum::Router {
    matching_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
