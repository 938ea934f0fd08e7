//! Read-only access to the candidate population and its metrics.

mod loader;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::matching::domain::{Candidate, CandidateId, CandidateMetrics};

/// Tabular data source backing the matching pipeline.
///
/// Metrics are fetched in bulk for an id set so a ranking request issues
/// exactly two reads regardless of population size.
pub trait CatalogSource: Send + Sync {
    fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, CatalogError>;
    fn fetch_metrics(
        &self,
        ids: &BTreeSet<CandidateId>,
    ) -> Result<Vec<CandidateMetrics>, CatalogError>;
}

/// Candidate column a predicate can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateField {
    Status,
    Category,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOp {
    Eq(String),
    In(Vec<String>),
    NotIn(Vec<String>),
}

/// Single column constraint, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: PredicateField,
    pub op: PredicateOp,
}

impl Predicate {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        let value = match self.field {
            PredicateField::Status => candidate.status.label(),
            PredicateField::Category => candidate.category.as_str(),
            PredicateField::Provider => candidate.provider.as_str(),
        };

        match &self.op {
            PredicateOp::Eq(expected) => value.eq_ignore_ascii_case(expected),
            PredicateOp::In(options) => options
                .iter()
                .any(|option| value.eq_ignore_ascii_case(option)),
            PredicateOp::NotIn(options) => {
                !options.iter().any(|option| value.eq_ignore_ascii_case(option))
            }
        }
    }
}

/// Conjunction of predicates; an empty query selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub predicates: Vec<Predicate>,
}

impl CandidateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: PredicateField, op: PredicateOp) -> Self {
        self.predicates.push(Predicate { field, op });
        self
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(candidate))
    }
}

/// Catalog held entirely in memory, optionally loaded from CSV exports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    candidates: Vec<Candidate>,
    metrics: BTreeMap<CandidateId, CandidateMetrics>,
}

impl InMemoryCatalog {
    pub fn new(candidates: Vec<Candidate>, metrics: Vec<CandidateMetrics>) -> Self {
        let metrics = metrics
            .into_iter()
            .map(|record| (record.candidate_id.clone(), record))
            .collect();
        Self {
            candidates,
            metrics,
        }
    }

    /// Loads candidates and, when given, their metrics from CSV files.
    pub fn from_csv_paths(
        candidates_path: &Path,
        metrics_path: Option<&Path>,
    ) -> Result<Self, CatalogError> {
        let candidates = Self::read_candidates(File::open(candidates_path)?)?;
        let metrics = match metrics_path {
            Some(path) => Self::read_metrics(File::open(path)?)?,
            None => Vec::new(),
        };

        info!(
            candidates = candidates.len(),
            metrics = metrics.len(),
            path = %candidates_path.display(),
            "loaded candidate catalog"
        );

        Ok(Self::new(candidates, metrics))
    }

    pub fn read_candidates<R: std::io::Read>(reader: R) -> Result<Vec<Candidate>, CatalogError> {
        Ok(loader::parse_candidates(reader)?)
    }

    pub fn read_metrics<R: std::io::Read>(
        reader: R,
    ) -> Result<Vec<CandidateMetrics>, CatalogError> {
        Ok(loader::parse_metrics(reader)?)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl CatalogSource for InMemoryCatalog {
    fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, CatalogError> {
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| query.matches(candidate))
            .cloned()
            .collect())
    }

    fn fetch_metrics(
        &self,
        ids: &BTreeSet<CandidateId>,
    ) -> Result<Vec<CandidateMetrics>, CatalogError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.metrics.get(id).cloned())
            .collect())
    }
}

/// Error enumeration for catalog failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read catalog export: {0}")]
    Io(#[from] std::io::Error),
}
