use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};

use crate::catalog::CatalogSource;
use crate::error::AppError;
use crate::refinement::TextInterpreter;

use super::domain::PreferenceSet;
use super::explain::NarrativeGenerator;
use super::service::{
    ClarificationRequest, ExplanationRequest, MatchingService, RecalculationRequest,
    RefinementRequest,
};
use super::MatchingError;

/// Router builder exposing ranking, re-ranking and explanation endpoints.
pub fn matching_router<C, I, N>(service: Arc<MatchingService<C, I, N>>) -> Router
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    Router::new()
        .route("/api/v1/matches", post(rank_handler::<C, I, N>))
        .route(
            "/api/v1/matches/recalculate",
            post(recalculate_handler::<C, I, N>),
        )
        .route("/api/v1/matches/refine", post(refine_handler::<C, I, N>))
        .route("/api/v1/matches/clarify", post(clarify_handler::<C, I, N>))
        .route("/api/v1/matches/insights", post(insights_handler::<C, I, N>))
        .route("/api/v1/matches/report", post(report_handler::<C, I, N>))
        .route("/api/v1/matches/scenario", post(scenario_handler::<C, I, N>))
        .with_state(service)
}

pub(crate) async fn rank_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(preferences): axum::Json<PreferenceSet>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.rank(&preferences) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recalculate_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<RecalculationRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.recalculate(request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn refine_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<RefinementRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.refine(request).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn clarify_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<ClarificationRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.clarify(request) {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn insights_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<ExplanationRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    let response = service.insights(request).await;
    (StatusCode::OK, axum::Json(response)).into_response()
}

pub(crate) async fn report_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<ExplanationRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    let response = service.report(request).await;
    (StatusCode::OK, axum::Json(response)).into_response()
}

pub(crate) async fn scenario_handler<C, I, N>(
    State(service): State<Arc<MatchingService<C, I, N>>>,
    axum::Json(request): axum::Json<ExplanationRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    let response = service.scenario(&request);
    (StatusCode::OK, axum::Json(response)).into_response()
}

fn error_response(error: MatchingError) -> Response {
    AppError::from(error).into_response()
}
