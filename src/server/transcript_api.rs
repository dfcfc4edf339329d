use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use transcript::{TranscriptError, TranscriptSnippet};

use crate::app_state::TranscriptState;
use crate::transcript_source::TranscriptSource;
use crate::video_id::normalize_video_id;

use super::{required_params, MissingParameters};

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Failed transcript request
#[derive(Debug)]
pub enum TranscriptResponseError {
    MissingParameters,
    InvalidVideoId(String),
    TranscriptsDisabled,
    NoTranscriptFound { lang: String },
    Internal(String),
}

impl TranscriptResponseError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters | Self::InvalidVideoId(_) => StatusCode::BAD_REQUEST,
            Self::TranscriptsDisabled | Self::NoTranscriptFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            Self::MissingParameters => (
                "Missing parameters. Required: video_id and lang.".to_owned(),
                None,
            ),
            Self::InvalidVideoId(input) => (
                "InvalidVideoId".to_owned(),
                Some(format!(
                    "{input} is neither a youtube video id nor a youtube video url"
                )),
            ),
            Self::TranscriptsDisabled => (
                "TranscriptsDisabled".to_owned(),
                Some("The YouTube video has transcripts disabled.".to_owned()),
            ),
            Self::NoTranscriptFound { lang } => (
                "NoTranscriptFound".to_owned(),
                Some(format!("No transcript found for language code: {lang}")),
            ),
            Self::Internal(details) => (
                "InternalServerError".to_owned(),
                Some(format!(
                    "An internal server error occurred. Error details: {details}"
                )),
            ),
        };
        ErrorBody { error, message }
    }
}

impl From<MissingParameters> for TranscriptResponseError {
    fn from(_: MissingParameters) -> Self {
        Self::MissingParameters
    }
}

impl IntoResponse for TranscriptResponseError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TranscriptResponse {
    pub status: String,
    pub video_id: String,
    pub lang: String,
    /// Timed transcript lines: `{ text, start, duration }`, times in seconds
    #[schema(value_type = Vec<Object>)]
    pub subtitles: Vec<TranscriptSnippet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct HomeResponse {
    pub message: String,
    pub app_api_link_example: String,
    pub required_parameters: Vec<String>,
    pub status: String,
}

/// Api status and usage example
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, body = HomeResponse),
    ),
    tag = "Transcripts",
)]
pub async fn home(State(state): State<TranscriptState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Youtube Subtitle API is ready. Use the following link format in your Android App:"
            .into(),
        app_api_link_example: format!(
            "{}/get_subtitle?video_id=VIDEO_ID&lang=LANG_CODE",
            state.public_url
        ),
        required_parameters: vec!["video_id".into(), "lang".into()],
        status: "running".into(),
    })
}

/// Get transcript of the video in requested language
#[utoipa::path(
    get,
    path = "/get_subtitle",
    params(
        ("video_id" = String, Query, description = "Youtube video id or video url"),
        ("lang" = String, Query, description = "Transcript language code"),
    ),
    responses(
        (status = 200, body = TranscriptResponse),
        (status = 400, body = ErrorBody, description = "Missing parameters or invalid video id"),
        (status = 404, body = ErrorBody, description = "Transcripts are disabled or language is not available"),
        (status = 500, body = ErrorBody),
    ),
    tag = "Transcripts",
)]
pub async fn get_subtitle(
    State(source): State<Arc<dyn TranscriptSource>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<TranscriptResponse>, TranscriptResponseError> {
    let (video_input, lang) = required_params(&params, ["video_id", "lang"])?;
    let video_id = normalize_video_id(video_input)
        .ok_or_else(|| TranscriptResponseError::InvalidVideoId(video_input.to_owned()))?;
    tracing::debug!(%video_id, lang, "Transcript requested");

    match source.fetch_transcript(&video_id, &[lang]).await {
        Ok(subtitles) => {
            tracing::info!(%video_id, lang, lines = subtitles.len(), "Fetched transcript");
            Ok(Json(TranscriptResponse {
                status: "success".into(),
                video_id: video_input.to_owned(),
                lang: lang.to_owned(),
                subtitles,
            }))
        }
        Err(TranscriptError::TranscriptsDisabled { .. }) => {
            tracing::info!(%video_id, "Video has transcripts disabled");
            Err(TranscriptResponseError::TranscriptsDisabled)
        }
        Err(TranscriptError::NoTranscriptFound { available, .. }) => {
            tracing::info!(%video_id, lang, ?available, "No transcript in requested language");
            Err(TranscriptResponseError::NoTranscriptFound {
                lang: lang.to_owned(),
            })
        }
        Err(err) => {
            tracing::error!("Error processing video {video_id}: {err}");
            Err(TranscriptResponseError::Internal(err.to_string()))
        }
    }
}
