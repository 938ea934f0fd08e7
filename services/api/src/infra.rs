use fundmatch::catalog::{CatalogError, InMemoryCatalog};
use fundmatch::config::CatalogConfig;
use fundmatch::matching::domain::{Criterion, ImportanceLabel, PreferenceSet};
use fundmatch::matching::{ExplanationContext, Highlights, NarrativeError, NarrativeGenerator};
use fundmatch::refinement::{InterpretError, Interpretation, TextInterpreter};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

use crate::demo::sample_catalog;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Interpreter used when no language model is wired in. Refinement requests
/// fall back to ranking the unchanged preferences.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineInterpreter;

impl TextInterpreter for OfflineInterpreter {
    fn interpret(
        &self,
        _text: &str,
        _current: &PreferenceSet,
    ) -> Result<Interpretation, InterpretError> {
        Err(InterpretError::Unavailable(
            "no text interpreter configured".to_string(),
        ))
    }
}

/// Narrator used when no language model is wired in; explanations use the templates.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineNarrator;

impl NarrativeGenerator for OfflineNarrator {
    fn summarize(&self, _context: &ExplanationContext) -> Result<String, NarrativeError> {
        Err(NarrativeError::Unavailable(
            "no narrative generator configured".to_string(),
        ))
    }

    fn highlights(&self, _context: &ExplanationContext) -> Result<Highlights, NarrativeError> {
        Err(NarrativeError::Unavailable(
            "no narrative generator configured".to_string(),
        ))
    }
}

/// Loads the configured CSV exports, or the bundled sample catalog when none is set.
pub(crate) fn load_catalog(config: &CatalogConfig) -> Result<InMemoryCatalog, CatalogError> {
    match config.candidates_path.as_deref() {
        Some(path) => InMemoryCatalog::from_csv_paths(path, config.metrics_path.as_deref()),
        None => {
            warn!("CATALOG_CANDIDATES_PATH not set, serving the bundled sample catalog");
            sample_catalog()
        }
    }
}

/// Parses `criterion=label` pairs such as `cost=very_important`.
pub(crate) fn parse_importance(raw: &str) -> Result<(Criterion, ImportanceLabel), String> {
    let (criterion, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CRITERION=LABEL, got '{raw}'"))?;
    let criterion =
        Criterion::parse(criterion).ok_or_else(|| format!("unknown criterion '{criterion}'"))?;
    Ok((criterion, ImportanceLabel::parse(label)))
}
