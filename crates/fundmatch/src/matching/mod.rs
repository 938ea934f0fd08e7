//! Multi-criteria scoring and re-ranking of catalog offerings.
//!
//! The pipeline runs filter, bulk metric fetch, percentile normalization,
//! weighted aggregation and the percentage transform in that order, then
//! applies soft preferences. [`adjust`] re-ranks an existing list without
//! going back to the catalog, and [`explain`] turns a list into a structured
//! explanation.

pub mod adjust;
pub mod domain;
pub mod engine;
pub mod explain;
pub mod filter;
pub mod normalize;
pub mod router;
pub mod scoring;
pub mod service;
pub mod soft;
mod weights;

#[cfg(test)]
mod tests;

pub use adjust::{adjust, parse_impacts, recalculate, Impact, RecalculationOutcome};
pub use domain::{
    BankFilter, BankFilterMode, Candidate, CandidateId, CandidateMetrics, CandidateStatus,
    Criterion, FiltersApplied, ImportanceLabel, MatchOutcome, NormalizationPolicy, PreferenceSet,
    ScoredMatch, SoftAction, SoftPreference,
};
pub use engine::{MatchingEngine, NEUTRAL_SCORE};
pub use explain::{ExplanationContext, Highlights, NarrativeError, NarrativeGenerator};
pub use filter::{category_cluster, filter_candidates};
pub use normalize::normalize;
pub use router::matching_router;
pub use scoring::{aggregate, rescale, to_percentage};
pub use service::MatchingService;
pub use soft::apply_soft_preferences;
pub use weights::{resolve_weight, WeightTable};

use crate::catalog::CatalogError;

/// Error raised by the matching pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
