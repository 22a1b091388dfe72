#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use template_schedule::{ExpansionConfig, TemplateGraph, WorkCalendar, http_api};
use tower::util::ServiceExt;

fn new_router() -> axum::Router {
    let state = http_api::AppState::new(TemplateGraph::new("HTTP"), ExpansionConfig::default());
    http_api::router(state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn template_lifecycle_via_http_api() {
    let app = new_router();

    let (status, milestone) = send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "Milestone A", "start_offset": "1 week", "due_offset": "3 weeks"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ms_id = milestone["id"].as_u64().unwrap();
    assert_eq!(milestone["position"], 0);

    let (status, task) = send(
        &app,
        "POST",
        &format!("/milestones/{ms_id}/tasks"),
        Some(json!({"title": "Kickoff", "due_offset": "next day", "priority": "high"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_u64().unwrap();
    assert_eq!(task["priority"], "high");

    let (status, schedule) = send(&app, "POST", "/preview", Some(json!({"anchor": "2025-09-01"}))).await;
    assert_eq!(status, StatusCode::OK);
    let dates = &schedule["milestones"][ms_id.to_string()];
    assert_eq!(dates["start_date"], "2025-09-08");
    assert_eq!(dates["due_date"], "2025-09-29");
    assert_eq!(schedule["tasks"][task_id.to_string()]["due_date"], "2025-09-09");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/milestones/{ms_id}/tasks/{task_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &format!("/milestones/{ms_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, template) = send(&app, "GET", "/template", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(template["milestones"], json!([]));
}

#[tokio::test]
async fn preview_with_bad_offset_is_unprocessable() {
    let app = new_router();
    let (_, milestone) = send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "Draft", "start_offset": "same day", "due_offset": "invalid"})),
    )
    .await;
    let ms_id = milestone["id"].as_u64().unwrap();

    let (status, body) = send(&app, "POST", "/preview", Some(json!({"anchor": "2025-09-01"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "not_computable");
    assert_eq!(body["issue"]["field"], "due_offset");
    assert_eq!(body["issue"]["node"]["kind"], "milestone");
    assert_eq!(body["issue"]["node"]["id"], ms_id);

    let (status, issues) = send(&app, "GET", "/preview/issues", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issues.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/milestones/{ms_id}"),
        Some(json!({"due_offset": "2 weeks"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["due_offset"], "2 weeks");

    let (status, _) = send(&app, "POST", "/preview", Some(json!({"anchor": "2025-09-01"}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn parse_endpoint_reports_days_or_error() {
    let app = new_router();
    let (status, body) = send(&app, "POST", "/parse", Some(json!({"text": "2 Weeks"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 14);
    assert_eq!(body["description"], "2 weeks");

    let (status, body) = send(&app, "POST", "/parse", Some(json!({"text": "999 years"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("3650"));
}

#[tokio::test]
async fn reorder_milestones_via_http_api() {
    let app = new_router();
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let (_, milestone) = send(
            &app,
            "POST",
            "/milestones",
            Some(json!({"name": name, "start_offset": "same day", "due_offset": "1 day"})),
        )
        .await;
        ids.push(milestone["id"].as_u64().unwrap());
    }

    let (status, _) = send(
        &app,
        "POST",
        "/milestones/reorder",
        Some(json!({"order": [ids[2], ids[0]]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, milestones) = send(
        &app,
        "POST",
        "/milestones/reorder",
        Some(json!({"order": [ids[2], ids[0], ids[1]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = milestones
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["C", "A", "B"]);
    assert_eq!(milestones[0]["position"], 0);
}

#[tokio::test]
async fn unknown_nodes_are_not_found() {
    let app = new_router();
    let (status, body) = send(
        &app,
        "POST",
        "/milestones/42/tasks",
        Some(json!({"title": "Orphan", "due_offset": "1 day"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, "DELETE", "/milestones/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_milestone_name_is_rejected() {
    let app = new_router();
    let (status, body) = send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "  ", "start_offset": "same day", "due_offset": "1 day"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn replace_template_rejects_duplicate_ids() {
    let app = new_router();
    let replacement = json!({
        "name": "Imported",
        "milestones": [
            {"id": 1, "name": "A", "position": 0, "start_offset": "same day", "due_offset": "1 day"},
            {"id": 1, "name": "B", "position": 1, "start_offset": "same day", "due_offset": "1 day"}
        ]
    });
    let (status, _) = send(&app, "PUT", "/template", Some(replacement)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn working_day_state_skips_weekends() {
    let state = http_api::AppState::new(
        TemplateGraph::new("Workdays"),
        ExpansionConfig::working_days(WorkCalendar::default()),
    );
    let app = http_api::router(state);
    let (_, milestone) = send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "A", "start_offset": "next day", "due_offset": "same day"})),
    )
    .await;
    let ms_id = milestone["id"].as_u64().unwrap();

    let (status, schedule) = send(&app, "POST", "/preview", Some(json!({"anchor": "2025-09-05"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schedule["milestones"][ms_id.to_string()]["start_date"], "2025-09-08");
}

#[tokio::test]
async fn parse_uses_the_configured_limit() {
    let config = ExpansionConfig {
        max_offset_days: 30,
        ..ExpansionConfig::default()
    };
    let app = http_api::router(http_api::AppState::new(TemplateGraph::new("Short"), config));

    let (status, body) = send(&app, "POST", "/parse", Some(json!({"text": "5 weeks"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("30-day limit"));

    let (status, body) = send(&app, "POST", "/parse", Some(json!({"text": "4 weeks"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 28);

    send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "Far", "start_offset": "5 weeks", "due_offset": "same day"})),
    )
    .await;
    let (status, _) = send(&app, "POST", "/preview", Some(json!({"anchor": "2025-09-01"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn insert_after_huge_position_appends() {
    let app = new_router();
    send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "First", "start_offset": "same day", "due_offset": "1 day"})),
    )
    .await;
    let (status, milestone) = send(
        &app,
        "POST",
        "/milestones",
        Some(json!({"name": "Second", "start_offset": "same day", "due_offset": "1 day",
                    "after_position": u64::MAX})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(milestone["position"], 1);
}
