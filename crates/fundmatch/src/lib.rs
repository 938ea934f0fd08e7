//! Scoring and re-ranking backend for the investment partner matching quiz.
//!
//! The [`matching`] module holds the ranking pipeline (filtering, percentile
//! normalization, weighted aggregation, the percentage transform, soft
//! preferences and post-ranking adjustments) together with the explanation
//! builder. External collaborators are reached through traits: the candidate
//! catalog in [`catalog`] and the free-text interpreter in [`refinement`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod matching;
pub mod refinement;
pub mod telemetry;
