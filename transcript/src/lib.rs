//! YouTube transcript client.
//!
//! Lists caption tracks of a video through the innertube player api and fetches
//! timed text of a chosen track.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};

mod error;
mod innertube;
mod timed_text;
mod transcripts;

pub use error::TranscriptError;
pub use timed_text::TranscriptSnippet;
pub use transcripts::{Transcript, TranscriptList};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TranscriptApi {
    client: Client,
    base_url: String,
}

impl TranscriptApi {
    pub fn new() -> Result<Self, TranscriptError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Timeout is applied to every request made by the client
    pub fn with_timeout(timeout: Duration) -> Result<Self, TranscriptError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: innertube::YOUTUBE_URL.to_owned(),
        }
    }

    /// Send watch page and player requests to another host, e.g. a local mirror
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch transcript in the first available language of `language_codes`
    pub async fn fetch(
        &self,
        video_id: &str,
        language_codes: &[impl AsRef<str>],
    ) -> Result<Vec<TranscriptSnippet>, TranscriptError> {
        let list = self.list(video_id).await?;
        let transcript = list.find_transcript(language_codes)?;
        tracing::debug!(
            video_id,
            language_code = %transcript.language_code,
            is_generated = transcript.is_generated,
            "Selected transcript"
        );
        transcript.fetch(&self.client).await
    }

    /// List all caption tracks of the video
    pub async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError> {
        let (html, consent_cookie) = self.fetch_video_html(video_id).await?;
        let api_key = innertube::extract_api_key(&html, video_id)?;
        let mut request = self
            .client
            .post(format!("{}{}{}", self.base_url, innertube::PLAYER_PATH, api_key))
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .json(&innertube::player_request(video_id));
        if let Some(cookie) = &consent_cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = check_status(request.send().await?)?;
        let player: innertube::PlayerResponse = response.json().await?;
        let tracks = player.into_caption_tracks(video_id)?;
        Ok(TranscriptList::from_tracks(video_id, tracks))
    }

    async fn fetch_video_html(
        &self,
        video_id: &str,
    ) -> Result<(String, Option<String>), TranscriptError> {
        let html = self.fetch_html(video_id, None).await?;
        if !innertube::is_consent_page(&html) {
            return Ok((html, None));
        }
        tracing::trace!(video_id, "Got consent page, retrying with consent cookie");
        let cookie = innertube::consent_value(&html)
            .map(|v| format!("CONSENT=YES+{v}"))
            .ok_or_else(|| TranscriptError::FailedToCreateConsentCookie {
                video_id: video_id.to_owned(),
            })?;
        let html = self.fetch_html(video_id, Some(&cookie)).await?;
        if innertube::is_consent_page(&html) {
            return Err(TranscriptError::FailedToCreateConsentCookie {
                video_id: video_id.to_owned(),
            });
        }
        Ok((html, Some(cookie)))
    }

    async fn fetch_html(&self, video_id: &str, cookie: Option<&str>) -> Result<String, TranscriptError> {
        let mut request = self
            .client
            .get(format!("{}{}{}", self.base_url, innertube::WATCH_PATH, video_id))
            .header(header::ACCEPT_LANGUAGE, "en-US");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = check_status(request.send().await?)?;
        Ok(response.text().await?)
    }
}

pub(crate) fn check_status(response: Response) -> Result<Response, TranscriptError> {
    let status = response.status();
    tracing::trace!(status = status.as_u16(), url = %response.url(), "YouTube response");
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(TranscriptError::IpBlocked),
        status if status.is_success() => Ok(response),
        status => Err(TranscriptError::Http {
            status: status.as_u16(),
        }),
    }
}
