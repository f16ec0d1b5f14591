//! HTTP trigger for ingestion runs
//!
//! `/scrape` and `/products` sit behind a bearer-token layer; `/health` is open.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::commands::{self, AppContext, CommandError, ScrapeCommand};

/// Expected bearer token for protected routes
#[derive(Clone)]
pub struct AuthState {
    token: String,
}

impl AuthState {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Unauthorized"}))).into_response()
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn auth_middleware(
    State(auth): State<AuthState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // an unset server token rejects everyone
    let authorized = !auth.token.is_empty()
        && extract_bearer(req.headers()).is_some_and(|token| token == auth.token);

    if !authorized {
        warn!("🔒 Rejected unauthenticated request to {}", req.uri().path());
        return unauthorized();
    }
    next.run(req).await
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("❌ Command failed: {}", self);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

async fn scrape(
    State(ctx): State<AppContext>,
    Query(command): Query<ScrapeCommand>,
) -> Result<Response, CommandError> {
    let response = commands::execute_scrape(&ctx, &command).await?;
    Ok(Json(response).into_response())
}

async fn products(State(ctx): State<AppContext>) -> Result<Response, CommandError> {
    Ok(Json(commands::list_products(&ctx).await?).into_response())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

pub fn router(ctx: AppContext) -> Router {
    let auth = AuthState::new(ctx.config.token.clone());

    let protected = Router::new()
        .route("/scrape", get(scrape))
        .route("/products", get(products))
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(ctx)
}

pub async fn serve(ctx: AppContext, bind_addr: &str) -> Result<()> {
    if ctx.config.token.is_empty() {
        warn!("⚠️ No token configured; protected routes will reject every request");
    }

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("🌐 Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")
}
