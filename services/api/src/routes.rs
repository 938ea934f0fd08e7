use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use fundmatch::catalog::CatalogSource;
use fundmatch::matching::{matching_router, MatchingService, NarrativeGenerator};
use fundmatch::refinement::TextInterpreter;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_matching_routes<C, I, N>(
    service: Arc<MatchingService<C, I, N>>,
) -> axum::Router
where
    C: CatalogSource + 'static,
    I: TextInterpreter + 'static,
    N: NarrativeGenerator + 'static,
{
    matching_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::sample_catalog;
    use crate::infra::{OfflineInterpreter, OfflineNarrator};
    use fundmatch::config::MatchingConfig;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let service = MatchingService::new(
            Arc::new(sample_catalog().expect("sample catalog parses")),
            Arc::new(OfflineInterpreter),
            Arc::new(OfflineNarrator),
            &MatchingConfig::default(),
        );
        with_matching_routes(Arc::new(service))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn matching_routes_are_mounted_next_to_health() {
        let response = app()
            .oneshot(
                axum::http::Request::post("/api/v1/matches")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(axum::body::Body::from(
                        r#"{"category": "self_directed", "amount": 1000}"#,
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["status"], json!("ranked"));

        let health = app()
            .oneshot(
                axum::http::Request::get("/health")
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);
    }
}
