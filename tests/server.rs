use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use transcript::{TranscriptError, TranscriptSnippet};
use youtube_subtitle_api::app_state::{SubtitleUrlState, TranscriptState};
use youtube_subtitle_api::server::{self, subtitle_url_api::SubtitleUrlResponse};
use youtube_subtitle_api::transcript_source::TranscriptSource;
use youtube_subtitle_api::ytdlp::YtDlp;

struct StaticTranscript;

#[async_trait::async_trait]
impl TranscriptSource for StaticTranscript {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language_codes: &[&str],
    ) -> Result<Vec<TranscriptSnippet>, TranscriptError> {
        match language_codes {
            ["en"] => Ok(vec![TranscriptSnippet {
                text: "hello".into(),
                start: 0.0,
                duration: 1.5,
            }]),
            _ => Err(TranscriptError::NoTranscriptFound {
                video_id: video_id.to_owned(),
                requested: language_codes.iter().map(|c| c.to_string()).collect(),
                available: vec!["en".into()],
            }),
        }
    }
}

/// Running server that is shut down on drop
struct TestServer {
    addr: SocketAddr,
    cancellation_token: CancellationToken,
}

impl TestServer {
    async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancellation_token = CancellationToken::new();
        tokio::spawn(server::serve_listener(
            listener,
            app,
            cancellation_token.clone(),
        ));
        Self {
            addr,
            cancellation_token,
        }
    }

    async fn get(&self, path_and_query: &str) -> (u16, Value) {
        let response = reqwest::Client::new()
            .get(format!("http://{}{}", self.addr, path_and_query))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn transcript_app() -> Router {
    server::transcript_router(TranscriptState::new(
        Arc::new(StaticTranscript),
        "https://subs.example.com",
    ))
}

#[tokio::test]
async fn transcript_service_routes() {
    let server = TestServer::start(transcript_app()).await;

    let (status, body) = server.get("/").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "running");
    assert_eq!(
        body["app_api_link_example"],
        "https://subs.example.com/get_subtitle?video_id=VIDEO_ID&lang=LANG_CODE"
    );
    assert_eq!(body["required_parameters"], json!(["video_id", "lang"]));

    let (status, body) = server.get("/get_subtitle?video_id=dQw4w9WgXcQ&lang=en").await;
    assert_eq!(status, 200);
    assert_eq!(
        body["subtitles"],
        json!([{ "text": "hello", "start": 0.0, "duration": 1.5 }])
    );

    let (status, body) = server.get("/get_subtitle?video_id=dQw4w9WgXcQ&lang=ja").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NoTranscriptFound");

    let (status, body) = server.get("/get_subtitle?lang=en").await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());

    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = server.get("/api-docs/openapi.json").await;
    assert_eq!(status, 200);
    assert!(body["paths"]["/get_subtitle"].is_object());
    assert!(body["paths"]["/get_subtitle_url"].is_null());
}

#[tokio::test]
async fn subtitle_url_service_routes() {
    let ytdlp = YtDlp::new("/nonexistent/yt-dlp", Duration::from_secs(1));
    let server = TestServer::start(server::subtitle_url_router(SubtitleUrlState { ytdlp })).await;

    let (status, body) = server.get("/get_subtitle_url?lang=en").await;
    assert_eq!(status, 400);
    let body: SubtitleUrlResponse = serde_json::from_value(body).unwrap();
    assert!(!body.success);
    assert_eq!(body.subtitle_url, None);

    let (status, body) = server
        .get("/get_subtitle_url?url=https%3A%2F%2Fyoutu.be%2FdQw4w9WgXcQ&lang=en")
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("internal server error: "));

    // transcript routes are not served by this service
    let response = reqwest::get(format!("http://{}/get_subtitle?video_id=x&lang=en", server.addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let (status, body) = server.get("/api-docs/openapi.json").await;
    assert_eq!(status, 200);
    assert!(body["paths"]["/get_subtitle_url"].is_object());
}
