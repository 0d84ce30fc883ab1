use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::screening::catalog::CatalogStore;
use crate::screening::router::run_handler;
use crate::screening::ScreeningService;

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("payload serializes")))
        .expect("request builds")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn create_route_returns_created_draft() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            "/api/v1/questionnaires",
            &serde_json::to_value(submission()).expect("submission serializes"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["questionnaire_id"], "q-000001");
    assert_eq!(payload["status"], "draft");
    assert!(payload.get("weight_lb").is_none());
}

#[tokio::test]
async fn submit_route_lists_every_issue() {
    let (service, _, _) = build_service();
    let mut invalid = submission();
    invalid.age = given(-3);
    invalid.health_conditions = keys(&["vertigo"]);
    let record = service.create(invalid).expect("create succeeds");
    let router = router_with_service(service);

    let response = router
        .oneshot(post_empty(&format!(
            "/api/v1/questionnaires/{}/submit",
            record.id
        )))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let fields: Vec<&str> = payload["issues"]
        .as_array()
        .expect("issues array")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert_eq!(fields, ["age", "health_conditions"]);
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let (service, _, _) = build_service();
    let record = service.create(submission()).expect("create succeeds");
    let router = router_with_service(service);
    let id = record.id.to_string();

    let submitted = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/questionnaires/{id}/submit")))
        .await
        .expect("route executes");
    assert_eq!(submitted.status(), StatusCode::OK);

    let run = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/screening/run/{id}")))
        .await
        .expect("route executes");
    assert_eq!(run.status(), StatusCode::CREATED);
    let payload = read_json_body(run).await;
    assert_eq!(payload["questionnaire_id"], id.as_str());
    assert_eq!(payload["is_eligible"], true);
    assert_eq!(payload["bmi_category"], "obese");
    assert!(payload["doctor_selected_medication"].is_null());

    let repeat = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/screening/run/{id}")))
        .await
        .expect("route executes");
    assert_eq!(repeat.status(), StatusCode::BAD_REQUEST);

    let pending = router
        .clone()
        .oneshot(
            Request::get("/api/v1/screening/pending?limit=5")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(pending.status(), StatusCode::OK);
    assert_eq!(read_json_body(pending).await.as_array().map(Vec::len), Some(1));

    let rejected = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/screening/approve/{id}"),
            &json!({ "selected_medication": "Orlistat" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let approved = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/screening/approve/{id}"),
            &json!({ "selected_medication": "Phentermine", "notes": "monthly BP checks" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(approved.status(), StatusCode::OK);

    let result = router
        .oneshot(
            Request::get(format!("/api/v1/screening/results/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(result.status(), StatusCode::OK);
    let payload = read_json_body(result).await;
    assert_eq!(payload["doctor_selected_medication"], "Phentermine");
}

#[tokio::test]
async fn run_route_distinguishes_missing_and_unsubmitted() {
    let (service, _, _) = build_service();
    let draft = service.create(submission()).expect("create succeeds");
    let router = router_with_service(service);

    let missing = router
        .clone()
        .oneshot(post_empty("/api/v1/screening/run/q-424242"))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let unsubmitted = router
        .oneshot(post_empty(&format!("/api/v1/screening/run/{}", draft.id)))
        .await
        .expect("route executes");
    assert_eq!(unsubmitted.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_handler_returns_internal_error_on_repository_failure() {
    let service = ScreeningService::new(
        Arc::new(MemoryQuestionnaires::default()),
        Arc::new(UnavailableResults),
        Arc::new(CatalogStore::default()),
    );
    let record = service.create(submission()).expect("create succeeds");
    service.submit(&record.id).expect("submit succeeds");

    let response = run_handler::<MemoryQuestionnaires, UnavailableResults>(
        State(Arc::new(service)),
        Path(record.id.0.clone()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn delete_route_returns_no_content_for_drafts() {
    let (service, _, _) = build_service();
    let draft = service.create(submission()).expect("create succeeds");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::delete(format!("/api/v1/questionnaires/{}", draft.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let lookup = router
        .oneshot(
            Request::get(format!("/api/v1/questionnaires/{}", draft.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(lookup.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_route_reports_mistyped_answers_alongside_other_issues() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let mut payload = serde_json::to_value(submission()).expect("submission serializes");
    payload["age"] = json!("abc");
    payload["weight_lb"] = json!("heavy");
    let created = router
        .clone()
        .oneshot(post_json("/api/v1/questionnaires", &payload))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = read_json_body(created).await["questionnaire_id"]
        .as_str()
        .expect("id is a string")
        .to_string();

    let response = router
        .oneshot(post_empty(&format!("/api/v1/questionnaires/{id}/submit")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    let fields: Vec<&str> = body["issues"]
        .as_array()
        .expect("issues listed")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert_eq!(fields, ["age", "weight_lb"]);
}

#[tokio::test]
async fn pending_route_pages_with_skip_and_limit() {
    let (service, _, _) = build_service();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let record = service.create(submission()).expect("create succeeds");
        service.submit(&record.id).expect("submit succeeds");
        service.run(&record.id).expect("run succeeds");
        ids.push(record.id.0);
    }
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/screening/pending?skip=1&limit=1")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let page = read_json_body(response).await;
    let listed: Vec<&str> = page
        .as_array()
        .expect("pending is a list")
        .iter()
        .filter_map(|record| record["questionnaire_id"].as_str())
        .collect();
    assert_eq!(listed, [ids[1].as_str()]);
}
