use std::sync::Arc;

use axum::Router;
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use transcript::TranscriptApi;
use youtube_subtitle_api::app_state::{SubtitleUrlState, TranscriptState};
use youtube_subtitle_api::config::{Args, ServerConfiguration, Service};
use youtube_subtitle_api::server;
use youtube_subtitle_api::tracing::init_tracer;
use youtube_subtitle_api::ytdlp::YtDlp;

async fn build_app(service: Service, config: &ServerConfiguration) -> Result<Router, anyhow::Error> {
    match service {
        Service::Transcript => {
            let api = TranscriptApi::with_timeout(config.request_timeout)?;
            let state = TranscriptState::new(Arc::new(api), config.public_url());
            Ok(server::transcript_router(state))
        }
        Service::SubtitleUrl => {
            let ytdlp = YtDlp::from_config(config);
            match ytdlp.version().await {
                Ok(version) => tracing::info!("Using yt-dlp {version} at {}", ytdlp.path().display()),
                Err(e) => tracing::warn!("yt-dlp is not usable, requests will fail: {e}"),
            }
            Ok(server::subtitle_url_router(SubtitleUrlState { ytdlp }))
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let dotenv_result = dotenv();
    let tracer = init_tracer(args.log_level.unwrap_or(tracing::Level::INFO));

    match dotenv_result {
        Ok(path) => tracing::info!("Loaded env variables from: {}", path.display()),
        Err(_) => tracing::debug!("Could not load env variables from dotfile"),
    }

    let config = match ServerConfiguration::load(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };
    tracer.set_max_level(config.log_level.into());
    tracing::debug!(?config, "Resolved configuration");

    let app = match build_app(args.service, &config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Failed to initiate {:?} service: {e:#}", args.service);
            std::process::exit(1);
        }
    };

    let cancellation_token = CancellationToken::new();
    {
        let cancellation_token = cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    cancellation_token.cancel();
                }
                _ = cancellation_token.cancelled() => {}
            }
        });
    }

    tracing::info!("Serving {:?} service", args.service);
    if let Err(e) = server::serve(app, config.port, cancellation_token.clone()).await {
        tracing::error!("{e:#}");
        cancellation_token.cancel();
        std::process::exit(1);
    }
    tracing::info!("Gracefully shut down");
}
