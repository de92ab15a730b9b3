//! HTTP API server for integration with other systems.
//!
//! Exposes the pipeline and the fact checker as JSON endpoints.

use crate::cli::Output;
use crate::config::Settings;
use crate::fact_check::{Claim, FactChecker, OpenAIFactChecker};
use crate::openai::OPENAI_API_KEY_ENV;
use crate::orchestrator::{Orchestrator, PipelineResult, PipelineStatus, RunOptions};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    fact_checker: Arc<dyn FactChecker>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(&settings)?.require_credentials([OPENAI_API_KEY_ENV]);
    let fact_checker = Arc::new(OpenAIFactChecker::from_settings(&settings.fact_check)?);

    let state = Arc::new(AppState {
        orchestrator,
        fact_checker,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/transcript", post(transcript))
        .route("/check", post(check))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Faktum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /healthz");
    Output::kv("Transcript", "POST /transcript");
    Output::kv("Fact check", "POST /check");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct PipelineRequest {
    url: String,
    #[serde(default)]
    force: bool,
    #[serde(default)]
    skip_captions: bool,
}

impl PipelineRequest {
    fn options(&self) -> RunOptions {
        RunOptions {
            force: self.force,
            skip_captions: self.skip_captions,
        }
    }
}

#[derive(Serialize)]
struct PipelineResponse {
    #[serde(flatten)]
    result: PipelineResult,
    message: &'static str,
}

#[derive(Serialize)]
struct CheckResponse {
    #[serde(flatten)]
    result: PipelineResult,
    message: &'static str,
    claims: Vec<Claim>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    "ok"
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PipelineRequest>,
) -> impl IntoResponse {
    let result = state.orchestrator.run_with(&req.url, req.options()).await;
    let code = status_code(result.status);
    let message = result.message();

    (code, Json(PipelineResponse { result, message })).into_response()
}

async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PipelineRequest>,
) -> impl IntoResponse {
    let result = state.orchestrator.run_with(&req.url, req.options()).await;
    let message = result.message();

    if !result.is_ok() {
        let code = status_code(result.status);
        let body = CheckResponse {
            result,
            message,
            claims: Vec::new(),
            error: None,
        };
        return (code, Json(body)).into_response();
    }

    let lang_hint = result.language.clone().unwrap_or_else(|| "auto".to_string());
    match state.fact_checker.fact_check(&result.text, &lang_hint).await {
        Ok(claims) => Json(CheckResponse {
            result,
            message,
            claims,
            error: None,
        })
        .into_response(),
        Err(e) => {
            warn!("Fact check failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(CheckResponse {
                    result,
                    message,
                    claims: Vec::new(),
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// HTTP status for a pipeline outcome.
fn status_code(status: PipelineStatus) -> StatusCode {
    match status {
        PipelineStatus::Ok => StatusCode::OK,
        PipelineStatus::InvalidUrl => StatusCode::BAD_REQUEST,
        PipelineStatus::MissingCredentials => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineStatus::NoCaptions => StatusCode::NOT_FOUND,
        PipelineStatus::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
        PipelineStatus::TransientError => StatusCode::BAD_GATEWAY,
        PipelineStatus::Locked => StatusCode::CONFLICT,
    }
}
