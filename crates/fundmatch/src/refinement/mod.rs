//! Free-text refinement of an existing preference set.

mod interpretation;

pub use interpretation::{
    parse_soft_preference, ClarificationAnswer, Confidence, InterpretError, Interpretation,
    TextInterpreter, Verdict,
};

use serde::Serialize;

use crate::matching::domain::{MatchOutcome, PreferenceSet};

/// Result of interpreting a free-text request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefinementOutcome {
    Rescored {
        preferences: PreferenceSet,
        outcome: MatchOutcome,
        reasoning: String,
        confidence: Confidence,
        preferences_changed: bool,
        soft_preferences_applied: bool,
    },
    /// The interpreter needs the user to disambiguate before re-scoring.
    NeedsClarification {
        questions: Vec<String>,
        reasoning: String,
    },
    Declined {
        message: String,
    },
    /// The interpreter failed; the ranking is for the unchanged preferences.
    InterpreterUnavailable {
        reason: String,
        outcome: MatchOutcome,
    },
}
