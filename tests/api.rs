mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{json, Value};
use smart_scraper_agent::api::routes::create_router;
use smart_scraper_agent::extract::Pacing;
use smart_scraper_agent::llm::ChatMessage;
use smart_scraper_agent::AppState;
use tower::ServiceExt;

async fn app(dir: &std::path::Path, model: Arc<ScriptedModel>, launcher: Arc<FakeLauncher>) -> Router {
    let state = AppState::with_components(test_config(dir), model, launcher, Pacing::none())
        .await
        .unwrap();
    create_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec(), headers)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes, _) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn query_returns_url_text_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![
        Ok(url_reply("https://www.notion.so/pricing")),
        Ok(ChatMessage::assistant("Plus $10/mo")),
        Ok(ChatMessage::assistant("Notion Plus costs $10/mo.")),
    ]);
    let app = app(dir.path(), model, FakeLauncher::page("Menu Plus $10/mo", "Notion Pricing")).await;

    let (status, body) = post_json(&app, "/api/query", json!({ "query": "What does Notion cost?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["status"], "success");
    let data = &body["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["url"], "https://www.notion.so/pricing");
    assert_eq!(data["query"], "What does Notion cost?");
    assert_eq!(data["title"], "Notion Pricing");
    assert_eq!(data["scraped_text"], "Menu Plus $10/mo");
    assert_eq!(data["cleaned_text"], "Plus $10/mo");
    assert_eq!(data["summary"], "Notion Plus costs $10/mo.");
    assert!(data["summary_artifact"].as_str().unwrap().starts_with("summary_"));
    assert!(data["timestamp"].as_str().unwrap().parse::<chrono::DateTime<chrono::Utc>>().is_ok());
    let mut keys: Vec<&str> = data.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        [
            "artifact",
            "cleaned_text",
            "query",
            "scraped_text",
            "status",
            "summary",
            "summary_artifact",
            "timestamp",
            "title",
            "url",
        ]
    );

    // The scraped text is downloadable.
    let artifact = data["artifact"].as_str().unwrap().to_string();
    assert!(artifact.starts_with("Notion Pricing_"));
    let (status, bytes, headers) = send(
        &app,
        Request::get(format!("/api/artifacts/{}", artifact.replace(' ', "%20")))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().starts_with("attachment"));
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "[URL]: https://www.notion.so/pricing\n\nMenu Plus $10/mo"
    );
}

#[tokio::test]
async fn declined_query_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![Ok(ChatMessage::assistant("I can answer that directly."))]);
    let launcher = FakeLauncher::page("", "");
    let app = app(dir.path(), model, launcher.clone()).await;

    let (status, body) = post_json(&app, "/api/query", json!({ "query": "hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["status"], "warning");
    assert_eq!(body["data"]["status"], "declined");
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn extraction_errors_surface_the_cause() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![Ok(url_reply("https://down.example"))]);
    let app = app(
        dir.path(),
        model,
        FakeLauncher::new(NavBehavior::Fail("net::ERR_CONNECTION_REFUSED".to_string())),
    )
    .await;

    let (status, body) = post_json(&app, "/api/query", json!({ "query": "is it up?" })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["meta"]["status"], "error");
    assert!(body["meta"]["message"].as_str().unwrap().contains("ERR_CONNECTION_REFUSED"));
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn follow_up_needs_a_completed_query() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), ScriptedModel::new(vec![]), FakeLauncher::page("", "")).await;

    let (status, body) = post_json(&app, "/api/follow-up", json!({ "question": "and then?" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["meta"]["status"], "error");
}

#[tokio::test]
async fn scrape_then_follow_up_then_history() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![
        Ok(ChatMessage::assistant("cleaned docs")),
        Ok(ChatMessage::assistant("The docs describe crates.")),
        Ok(ChatMessage::assistant("Yes, search is supported.")),
    ]);
    let app = app(dir.path(), model, FakeLauncher::page("docs text", "Docs")).await;

    let (status, body) = post_json(&app, "/api/scrape", json!({ "url": "https://docs.rs" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["query"], "Summarize this page");

    let (status, body) = post_json(&app, "/api/follow-up", json!({ "question": "Can I search?" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["answer"], "Yes, search is supported.");

    let (status, body) = get_json(&app, "/api/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["entries"][0]["url"], "https://docs.rs");
    assert_eq!(body["data"]["entries"][0]["summary"], "The docs describe crates.");
}

#[tokio::test]
async fn artifact_names_cannot_escape_the_scrapes_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("history.json"), "[]").unwrap();
    let app = app(dir.path(), ScriptedModel::new(vec![]), FakeLauncher::page("", "")).await;

    let (status, _, _) = send(
        &app,
        Request::get("/api/artifacts/..%2Fhistory.json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        Request::get("/api/artifacts/missing.txt").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
