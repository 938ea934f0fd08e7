use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::CatalogSource;
use crate::config::MatchingConfig;
use crate::refinement::{
    ClarificationAnswer, InterpretError, RefinementOutcome, TextInterpreter, Verdict,
};

use super::adjust::{parse_impacts, recalculate, RecalculationOutcome};
use super::domain::{MatchOutcome, PreferenceSet, ScoredMatch};
use super::engine::MatchingEngine;
use super::explain::{
    fallback_highlights, fallback_summary, follow_up_questions, ExplanationContext,
    FollowUpQuestion, Highlights, NarrativeError, NarrativeGenerator, Scenario,
};
use super::MatchingError;

/// Service composing the catalog, the ranking engine and the text collaborators.
pub struct MatchingService<C, I, N> {
    catalog: Arc<C>,
    interpreter: Arc<I>,
    narrator: Arc<N>,
    engine: Arc<MatchingEngine>,
    collaborator_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecalculationRequest {
    #[serde(default)]
    pub preferences: PreferenceSet,
    pub matches: Vec<ScoredMatch>,
    #[serde(default)]
    pub impacts: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefinementRequest {
    #[serde(default)]
    pub preferences: PreferenceSet,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClarificationRequest {
    #[serde(default)]
    pub preferences: PreferenceSet,
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClarificationResponse {
    pub preferences: PreferenceSet,
    pub outcome: MatchOutcome,
}

/// Ranked list plus the preferences it was ranked for.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationRequest {
    pub matches: Vec<ScoredMatch>,
    #[serde(default)]
    pub preferences: PreferenceSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsResponse {
    pub highlights: Highlights,
    pub source: NarrativeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub summary: String,
    pub source: NarrativeSource,
    pub context: ExplanationContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResponse {
    pub scenario: Scenario,
    pub questions: Vec<FollowUpQuestion>,
}

impl<C, I, N> MatchingService<C, I, N>
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    pub fn new(
        catalog: Arc<C>,
        interpreter: Arc<I>,
        narrator: Arc<N>,
        config: &MatchingConfig,
    ) -> Self {
        Self {
            catalog,
            interpreter,
            narrator,
            engine: Arc::new(MatchingEngine::new(config.weights.clone(), config.top_n)),
            collaborator_timeout: config.collaborator_timeout,
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Rank the catalog for a preference set.
    pub fn rank(&self, preferences: &PreferenceSet) -> Result<MatchOutcome, MatchingError> {
        self.engine.rank(self.catalog.as_ref(), preferences)
    }

    /// Re-rank a previously returned list from follow-up answers.
    pub fn recalculate(
        &self,
        request: RecalculationRequest,
    ) -> Result<RecalculationOutcome, MatchingError> {
        let impacts = parse_impacts(&request.impacts);
        info!(
            impacts = impacts.len(),
            matches = request.matches.len(),
            "recalculating ranking"
        );

        recalculate(&request.preferences, request.matches, &impacts, |loosened| {
            self.rank(loosened).map(MatchOutcome::into_matches)
        })
    }

    /// Interpret free text and re-score when the interpretation allows it.
    pub async fn refine(
        &self,
        request: RefinementRequest,
    ) -> Result<RefinementOutcome, MatchingError> {
        let text = request.text.trim().to_string();
        if text.is_empty() {
            return Err(MatchingError::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }

        let interpreter = Arc::clone(&self.interpreter);
        let current = request.preferences.clone();
        let interpreted = bounded(
            self.collaborator_timeout,
            move || interpreter.interpret(&text, &current),
            InterpretError::TimedOut,
            InterpretError::Unavailable,
        )
        .await;

        let interpretation = match interpreted {
            Ok(interpretation) => interpretation,
            Err(err) => {
                warn!(error = %err, "text interpretation failed, ranking unchanged preferences");
                return Ok(RefinementOutcome::InterpreterUnavailable {
                    reason: err.to_string(),
                    outcome: self.rank(&request.preferences)?,
                });
            }
        };

        match interpretation.verdict(&request.preferences) {
            Verdict::Decline(message) => {
                info!("refinement declined on safety grounds");
                Ok(RefinementOutcome::Declined { message })
            }
            Verdict::Clarify(questions) => Ok(RefinementOutcome::NeedsClarification {
                questions,
                reasoning: interpretation.reasoning,
            }),
            Verdict::Proceed(preferences) => {
                let outcome = self.rank(&preferences)?;
                Ok(RefinementOutcome::Rescored {
                    preferences_changed: !interpretation.preference_updates.is_empty(),
                    soft_preferences_applied: !interpretation.soft_preferences.is_empty(),
                    reasoning: interpretation.reasoning,
                    confidence: interpretation.confidence,
                    preferences,
                    outcome,
                })
            }
        }
    }

    /// Apply a clarification answer and re-score.
    pub fn clarify(
        &self,
        request: ClarificationRequest,
    ) -> Result<ClarificationResponse, MatchingError> {
        let answer = ClarificationAnswer::from_value(&request.answer);
        let preferences = answer.apply_to(&request.preferences);
        let outcome = self.rank(&preferences)?;
        Ok(ClarificationResponse {
            preferences,
            outcome,
        })
    }

    /// Three highlights, generated or templated.
    pub async fn insights(&self, request: ExplanationRequest) -> InsightsResponse {
        let context = ExplanationContext::build(&request.matches, &request.preferences);
        let narrator = Arc::clone(&self.narrator);
        let shared = context.clone();
        let generated = bounded(
            self.collaborator_timeout,
            move || narrator.highlights(&shared),
            NarrativeError::TimedOut,
            NarrativeError::Unavailable,
        )
        .await;

        match generated {
            Ok(highlights) => InsightsResponse {
                highlights,
                source: NarrativeSource::Generated,
            },
            Err(err) => {
                warn!(error = %err, "using templated highlights");
                InsightsResponse {
                    highlights: fallback_highlights(&context),
                    source: NarrativeSource::Fallback,
                }
            }
        }
    }

    /// Full written report, generated or templated.
    pub async fn report(&self, request: ExplanationRequest) -> ReportResponse {
        let context = ExplanationContext::build(&request.matches, &request.preferences);
        let narrator = Arc::clone(&self.narrator);
        let shared = context.clone();
        let generated = bounded(
            self.collaborator_timeout,
            move || narrator.summarize(&shared),
            NarrativeError::TimedOut,
            NarrativeError::Unavailable,
        )
        .await;

        let (summary, source) = match generated {
            Ok(summary) if !summary.trim().is_empty() => (summary, NarrativeSource::Generated),
            Ok(_) => {
                warn!("narrative generator returned an empty report; using template");
                (fallback_summary(&context), NarrativeSource::Fallback)
            }
            Err(err) => {
                warn!(error = %err, "using templated report");
                (fallback_summary(&context), NarrativeSource::Fallback)
            }
        };

        ReportResponse {
            summary,
            source,
            context,
        }
    }

    pub fn scenario(&self, request: &ExplanationRequest) -> ScenarioResponse {
        let context = ExplanationContext::build(&request.matches, &request.preferences);
        let questions = follow_up_questions(&context.scenario, &request.matches);
        ScenarioResponse {
            scenario: context.scenario,
            questions,
        }
    }
}

/// Runs a blocking collaborator call on the blocking pool under a deadline.
async fn bounded<T, E, F>(
    limit: Duration,
    work: F,
    timed_out: E,
    failed: impl FnOnce(String) -> E,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(failed(join_error.to_string())),
        Err(_) => Err(timed_out),
    }
}
