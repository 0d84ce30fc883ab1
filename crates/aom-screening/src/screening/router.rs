use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{QuestionnaireId, QuestionnaireSubmission};
use super::repository::{QuestionnaireRepository, RepositoryError, ScreeningResultRepository};
use super::service::{DoctorApproval, ScreeningService, ScreeningServiceError};

const DEFAULT_PENDING_LIMIT: usize = 100;

/// Router exposing the questionnaire lifecycle and screening endpoints.
pub fn screening_router<Q, S>(service: Arc<ScreeningService<Q, S>>) -> Router
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    Router::new()
        .route("/api/v1/questionnaires", post(create_handler::<Q, S>))
        .route(
            "/api/v1/questionnaires/:questionnaire_id",
            get(status_handler::<Q, S>)
                .put(update_handler::<Q, S>)
                .delete(delete_handler::<Q, S>),
        )
        .route(
            "/api/v1/questionnaires/:questionnaire_id/submit",
            post(submit_handler::<Q, S>),
        )
        .route(
            "/api/v1/screening/run/:questionnaire_id",
            post(run_handler::<Q, S>),
        )
        .route(
            "/api/v1/screening/results/:questionnaire_id",
            get(result_handler::<Q, S>),
        )
        .route("/api/v1/screening/pending", get(pending_handler::<Q, S>))
        .route(
            "/api/v1/screening/approve/:questionnaire_id",
            post(approve_handler::<Q, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PendingQuery {
    skip: Option<usize>,
    limit: Option<usize>,
}

pub(crate) async fn create_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Json(submission): Json<QuestionnaireSubmission>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.create(submission) {
        Ok(record) => (StatusCode::CREATED, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.get(&QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
    Json(submission): Json<QuestionnaireSubmission>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.update(&QuestionnaireId(questionnaire_id), submission) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.delete(&QuestionnaireId(questionnaire_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.submit(&QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn run_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.run(&QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn result_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.result(&QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn pending_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Query(query): Query<PendingQuery>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    match service.pending(skip, limit) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<Q, S>(
    State(service): State<Arc<ScreeningService<Q, S>>>,
    Path(questionnaire_id): Path<String>,
    Json(approval): Json<DoctorApproval>,
) -> Response
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    match service.approve(&QuestionnaireId(questionnaire_id), approval) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ScreeningServiceError) -> Response {
    match err {
        ScreeningServiceError::Validation(validation) => {
            let payload = json!({
                "error": validation.to_string(),
                "issues": validation.issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        ScreeningServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "questionnaire or screening result not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        err @ (ScreeningServiceError::NotDraft { .. }
        | ScreeningServiceError::NotSubmitted(_)
        | ScreeningServiceError::AlreadyScreened(_)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        err @ ScreeningServiceError::Repository(RepositoryError::Conflict) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        err @ ScreeningServiceError::MedicationNotRecommended { .. } => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "screening request failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
