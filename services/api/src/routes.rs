use crate::infra::AppState;
use aom_screening::screening::{
    screening_router, DrugCandidate, QuarantinedEntry, QuestionnaireRepository,
    ScreeningResultRepository, ScreeningService,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Serialize)]
pub(crate) struct CatalogView {
    pub(crate) version: String,
    pub(crate) drugs: Vec<DrugCandidate>,
    pub(crate) quarantined: Vec<QuarantinedEntry>,
}

pub(crate) fn with_screening_routes<Q, S>(service: Arc<ScreeningService<Q, S>>) -> axum::Router
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    screening_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/catalog", axum::routing::get(catalog_endpoint))
        .route(
            "/admin/catalog/reload",
            axum::routing::post(catalog_reload_endpoint),
        )
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

pub(crate) async fn catalog_endpoint(Extension(state): Extension<AppState>) -> Json<CatalogView> {
    let catalog = state.catalog.snapshot();
    Json(CatalogView {
        version: catalog.version().to_string(),
        drugs: catalog.drugs().to_vec(),
        quarantined: catalog.quarantined().to_vec(),
    })
}

/// Re-read the configured catalog file. Failed reloads leave the active catalog in place.
pub(crate) async fn catalog_reload_endpoint(
    Extension(state): Extension<AppState>,
) -> axum::response::Response {
    let Some(path) = state.catalog_path.as_ref() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "no catalog file is configured; the built-in catalog is active" })),
        )
            .into_response();
    };

    match state.catalog.reload_from_path(path) {
        Ok(catalog) => (
            StatusCode::OK,
            Json(json!({
                "version": catalog.version(),
                "drugs": catalog.drugs().len(),
                "quarantined": catalog.quarantined(),
            })),
        )
            .into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "catalog reload rejected");
            let active = state.catalog.snapshot();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": err.to_string(),
                    "active_version": active.version(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryQuestionnaireRepository, InMemoryScreeningResultRepository};
    use aom_screening::screening::{CatalogStore, DrugCatalog};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(catalog_path: Option<PathBuf>, ready: bool) -> (axum::Router, Arc<CatalogStore>) {
        let catalog = Arc::new(CatalogStore::default());
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            catalog: catalog.clone(),
            catalog_path,
        };
        let service = Arc::new(ScreeningService::new(
            Arc::new(InMemoryQuestionnaireRepository::default()),
            Arc::new(InMemoryScreeningResultRepository::default()),
            catalog.clone(),
        ));
        (with_screening_routes(service).layer(Extension(state)), catalog)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    fn temp_catalog(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "aom-screening-api-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("temp catalog written");
        path
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let (router, _) = app(None, false);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "initializing");
    }

    #[tokio::test]
    async fn catalog_endpoint_lists_active_catalog() {
        let (router, _) = app(None, true);
        let response = router
            .oneshot(
                Request::get("/api/v1/catalog")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["version"], "2024.1");
        assert_eq!(payload["drugs"].as_array().map(Vec::len), Some(9));
        assert_eq!(payload["drugs"][0]["name"], "Phentermine");
    }

    #[tokio::test]
    async fn reload_without_configured_path_conflicts() {
        let (router, _) = app(None, true);
        let response = router
            .oneshot(
                Request::post("/admin/catalog/reload")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reload_quarantines_bad_entries_and_swaps_catalog() {
        let path = temp_catalog(
            "lenient",
            r#"{
                "version": "clinic-7",
                "drugs": [
                    { "name": "Wegovy", "base_priority": 50, "absolute_contraindications": ["thyroid_cancer"] },
                    { "name": "Mystery", "base_priority": 50, "absolute_contraindications": ["not_a_condition"] }
                ]
            }"#,
        );
        let (router, catalog) = app(Some(path.clone()), true);

        let response = router
            .oneshot(
                Request::post("/admin/catalog/reload")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["version"], "clinic-7");
        assert_eq!(payload["drugs"], 1);
        assert_eq!(payload["quarantined"][0]["name"], "Mystery");
        assert_eq!(catalog.snapshot().version(), "clinic-7");

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_catalog() {
        let path = temp_catalog("broken", "{ not json");
        let (router, catalog) = app(Some(path.clone()), true);

        let response = router
            .oneshot(
                Request::post("/admin/catalog/reload")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["active_version"], "2024.1");
        assert_eq!(*catalog.snapshot(), DrugCatalog::standard());

        std::fs::remove_file(path).ok();
    }
}
