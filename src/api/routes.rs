use axum::{
    routing::{get, post},
    Router,
    extract::{Json, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api::models::{
    DeclinedResponse, FollowUpRequest, FollowUpResponse, HistoryResponse, QueryRequest,
    RunResponse, ScrapeRequest, DEFAULT_SCRAPE_QUERY,
};
use crate::api::response;
use crate::artifacts;
use crate::error::{AppError, Result};
use crate::history::DISPLAY_WINDOW;
use crate::pipeline::RunOutcome;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(query_handler))
        .route("/api/scrape", post(scrape_handler))
        .route("/api/follow-up", post(follow_up_handler))
        .route("/api/history", get(history_handler))
        .route("/api/artifacts/:name", get(artifact_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn query_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Response> {
    let start_time = std::time::Instant::now();
    // One query at a time: later requests wait here.
    let mut pipeline = state.pipeline.lock().await;
    let outcome = pipeline.run(&req.query).await?;
    info!(elapsed = ?start_time.elapsed(), "query processed");

    Ok(match outcome {
        RunOutcome::Completed(report) => response::success(RunResponse::from(report)).into_response(),
        RunOutcome::Declined => response::warning(
            DeclinedResponse {
                status: "declined".to_string(),
                query: req.query,
            },
            "The model did not choose a page to scrape".to_string(),
        )
        .into_response(),
    })
}

async fn scrape_handler(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Response> {
    let query = req
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SCRAPE_QUERY.to_string());

    let mut pipeline = state.pipeline.lock().await;
    let report = pipeline.run_url(&query, &req.url).await?;
    Ok(response::success(RunResponse::from(report)).into_response())
}

async fn follow_up_handler(
    State(state): State<AppState>,
    Json(req): Json<FollowUpRequest>,
) -> Result<Response> {
    let pipeline = state.pipeline.lock().await;
    let answer = pipeline.follow_up(&req.question).await?;
    Ok(response::success(FollowUpResponse {
        question: req.question,
        answer,
    })
    .into_response())
}

async fn history_handler(State(state): State<AppState>) -> Result<Response> {
    let pipeline = state.pipeline.lock().await;
    let history = pipeline.history();
    Ok(response::success(HistoryResponse {
        total: history.len(),
        entries: history.recent(DISPLAY_WINDOW),
    })
    .into_response())
}

async fn artifact_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let path = artifacts::resolve_in(&state.config.scrapes_dir(), &name)
        .ok_or_else(|| AppError::BadRequest(format!("invalid artifact name: {}", name)))?;
    let body = match tokio::fs::read_to_string(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("artifact {}", name)));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
        ],
        body,
    )
        .into_response())
}
