// docshield/tests/http_api_tests.rs
//! HTTP API tests. The router is driven in-process with `tower::ServiceExt::oneshot`
//! over a `MemoryStore`, so no socket is bound.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_log::test;
use tower::ServiceExt;

use docshield::{AppState, router};
use docshield_core::{
    Document, DocumentStatus, EngineConfig, MemoryStore, RedactionService, Rule, RuleCategory, Severity, Template,
};

const SOURCE: &str = "Name: Jane Roe\nSSN 123-45-6789\n";

fn ssn_rule() -> Rule {
    Rule {
        id: "ssn".to_string(),
        name: "US SSN".to_string(),
        pattern: r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
        category: RuleCategory::Pii,
        severity: Severity::High,
        entity_type: Some("ssn".to_string()),
        ..Default::default()
    }
}

async fn seeded() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_template(Template::inline("t1", "u1", "Identity", vec![ssn_rule()]))
        .await;
    store
        .insert_document(Document::new("d1", "u1", "memory://sources/d1"), SOURCE)
        .await;
    let service = RedactionService::from_store(Arc::clone(&store), EngineConfig::default()).unwrap();
    (store, router(Arc::new(AppState::new(service))))
}

async fn call(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[test(tokio::test)]
async fn enrich_then_redact_then_review() {
    let (store, app) = seeded().await;

    let (status, body) = call(&app, Method::POST, "/api/rules/enrich?template=t1", Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedCount"], 1);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/documents/d1/redact",
        Some("u1"),
        Some(json!({ "templateId": "t1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["redactedUrl"], "memory://artifacts/d1");
    assert_eq!(
        store.blob("memory://artifacts/d1").await.unwrap(),
        "Name: Jane Roe\nSSN ███████████\n".as_bytes()
    );

    let (status, report) = call(&app, Method::GET, "/api/documents/d1/report", Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let entity = &report["redactedEntities"][0];
    assert_eq!(entity["type"], "ssn");
    assert_eq!(entity["category"], "Personal");
    assert_eq!(entity["redactionMethod"], "rule");
    let entity_id = entity["id"].as_str().unwrap().to_string();

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/api/documents/d1/entities/{entity_id}"),
        Some("u1"),
        Some(json!({ "confirmed": false, "feedback": "test data" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["confirmed"], false);
    assert_eq!(updated["feedback"], "test data");

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.documents["d1"].status, DocumentStatus::Redacted);
    assert!(!snapshot.reports["d1"].redacted_entities[0].confirmed);
}

#[test(tokio::test)]
async fn enrich_all_returns_the_summary_shape() {
    let (_store, app) = seeded().await;
    let (status, body) = call(&app, Method::POST, "/api/rules/enrich?all=true", Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalTemplates"], 1);
    assert_eq!(body["updatedTemplates"], 1);
    assert_eq!(body["updatedRules"], 1);
    assert_eq!(body["errors"], json!([]));
}

#[test(tokio::test)]
async fn enrich_needs_exactly_one_target() {
    let (_store, app) = seeded().await;
    for uri in ["/api/rules/enrich", "/api/rules/enrich?template=t1&all=true", "/api/rules/enrich?all=false"] {
        let (status, body) = call(&app, Method::POST, uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "invalid_input");
    }
}

#[test(tokio::test)]
async fn missing_metadata_is_a_conflict_naming_the_rule() {
    let (store, app) = seeded().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/documents/d1/redact",
        Some("u1"),
        Some(json!({ "templateId": "t1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "missing_metadata");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("'US SSN' (ssn)"), "{message}");
    assert!(message.contains("'t1'"), "{message}");

    // The gate runs before the document is touched.
    assert_eq!(store.snapshot().await.documents["d1"].status, DocumentStatus::Pending);
}

#[test(tokio::test)]
async fn report_is_null_before_the_first_run() {
    let (_store, app) = seeded().await;
    let (status, body) = call(&app, Method::GET, "/api/documents/d1/report", Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[test(tokio::test)]
async fn errors_map_to_distinct_statuses() {
    let (_store, app) = seeded().await;

    let (status, body) = call(&app, Method::GET, "/api/documents/nope/report", Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = call(&app, Method::GET, "/api/documents/d1/report", Some("u2"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission");

    let (status, body) = call(&app, Method::GET, "/api/documents/d1/report", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, body) = call(
        &app,
        Method::PATCH,
        "/api/documents/d1/entities/e1",
        Some("u1"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
}

#[test(tokio::test)]
async fn malformed_body_uses_the_error_shape() {
    let (_store, app) = seeded().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/documents/d1/redact",
        Some("u1"),
        Some(json!({ "template": "t1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "invalid_input");
}

#[test(tokio::test)]
async fn unreadable_document_is_unprocessable_and_marked_failed() {
    let (store, app) = seeded().await;
    store
        .insert_document(Document::new("d2", "u1", "memory://sources/d2"), vec![0xff, 0xfe, 0x00])
        .await;
    call(&app, Method::POST, "/api/rules/enrich?all=true", Some("u1"), None).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/documents/d2/redact",
        Some("u1"),
        Some(json!({ "templateId": "t1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "processing");

    let doc = &store.snapshot().await.documents["d2"];
    assert_eq!(doc.status, DocumentStatus::Failed);
    assert!(doc.error.is_some());
}

#[test(tokio::test)]
async fn health_is_ok() {
    let (_store, app) = seeded().await;
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
