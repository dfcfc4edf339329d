use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::app_state::{SubtitleUrlState, TranscriptState};

pub mod subtitle_url_api;
pub mod transcript_api;

/// One of required query parameters is absent or empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingParameters;

/// Take two required non empty query parameters
pub fn required_params<'a>(
    params: &'a HashMap<String, String>,
    [first, second]: [&str; 2],
) -> Result<(&'a str, &'a str), MissingParameters> {
    let get = |key: &str| {
        params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    };
    match (get(first), get(second)) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(MissingParameters),
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    ),
    tag = "Health",
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(transcript_api::home, transcript_api::get_subtitle, health),
    components(schemas(
        transcript_api::HomeResponse,
        transcript_api::TranscriptResponse,
        transcript_api::ErrorBody,
        HealthResponse,
    )),
    tags((name = "Transcripts", description = "Timed transcripts of youtube videos")),
)]
pub struct TranscriptApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(subtitle_url_api::get_subtitle_url, health),
    components(schemas(subtitle_url_api::SubtitleUrlResponse, HealthResponse)),
    tags((name = "Subtitles", description = "Subtitle download urls resolved by yt-dlp")),
)]
pub struct SubtitleUrlApiDoc;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any)
}

pub fn transcript_router(state: TranscriptState) -> Router {
    Router::new()
        .route("/", get(transcript_api::home))
        .route("/get_subtitle", get(transcript_api::get_subtitle))
        .route("/health", get(health))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(TranscriptApiDoc::openapi()) }),
        )
        .layer(cors())
        .with_state(state)
}

pub fn subtitle_url_router(state: SubtitleUrlState) -> Router {
    Router::new()
        .route("/get_subtitle_url", get(subtitle_url_api::get_subtitle_url))
        .route("/health", get(health))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(SubtitleUrlApiDoc::openapi()) }),
        )
        .layer(cors())
        .with_state(state)
}

/// Serve the app on all interfaces until cancellation token is cancelled
pub async fn serve(
    app: Router,
    port: u16,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to start server on port {port}"))?;
    tracing::info!("Starting server on port {port}");
    serve_listener(listener, app, cancellation_token).await
}

pub async fn serve_listener(
    listener: TcpListener,
    app: Router,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    axum::serve(listener, app)
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await
        .context("Server error")
}
