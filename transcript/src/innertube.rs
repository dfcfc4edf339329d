use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::TranscriptError;

pub(crate) const YOUTUBE_URL: &str = "https://www.youtube.com";
pub(crate) const WATCH_PATH: &str = "/watch?v=";
pub(crate) const PLAYER_PATH: &str = "/youtubei/v1/player?key=";

const CONSENT_FORM_ACTION: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";

const BOT_DETECTED_REASON: &str = "Sign in to confirm you\u{2019}re not a bot";
const AGE_RESTRICTED_REASON: &str = "This video may be inappropriate for some users.";
const VIDEO_UNAVAILABLE_REASON: &str = "This video is unavailable";

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());
static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).unwrap());

pub(crate) fn is_consent_page(html: &str) -> bool {
    html.contains(CONSENT_FORM_ACTION)
}

/// Value that has to be placed into `CONSENT=YES+{value}` cookie
pub(crate) fn consent_value(html: &str) -> Option<&str> {
    CONSENT_VALUE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn extract_api_key<'a>(html: &'a str, video_id: &str) -> Result<&'a str, TranscriptError> {
    if let Some(key) = API_KEY_RE.captures(html).and_then(|c| c.get(1)) {
        return Ok(key.as_str());
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(TranscriptError::IpBlocked);
    }
    Err(TranscriptError::DataUnparsable {
        video_id: video_id.to_owned(),
    })
}

/// Body of the innertube player request. Android client still gets caption tracks without PO token.
pub(crate) fn player_request(video_id: &str) -> serde_json::Value {
    serde_json::json!({
        "context": {
            "client": {
                "clientName": "ANDROID",
                "clientVersion": "20.10.38",
            }
        },
        "videoId": video_id,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Captions {
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TracklistRenderer {
    pub caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub name: CaptionName,
    pub language_code: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub is_translatable: bool,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptionName {
    pub runs: Option<Vec<TextRun>>,
    pub simple_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TextRun {
    pub text: String,
}

impl CaptionName {
    pub fn text(&self) -> String {
        if let Some(runs) = &self.runs {
            return runs.iter().map(|r| r.text.as_str()).collect();
        }
        self.simple_text.clone().unwrap_or_default()
    }
}

impl PlayerResponse {
    /// Validate playability and hand out caption tracks of the video
    pub fn into_caption_tracks(self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        if let Some(status) = &self.playability_status {
            check_playability(status, video_id)?;
        }
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .ok_or_else(|| TranscriptError::TranscriptsDisabled {
                video_id: video_id.to_owned(),
            })
    }
}

fn check_playability(status: &PlayabilityStatus, video_id: &str) -> Result<(), TranscriptError> {
    let video_id = video_id.to_owned();
    let reason = status.reason.clone().unwrap_or_default();
    match status.status.as_deref() {
        None | Some("OK") => Ok(()),
        Some("LOGIN_REQUIRED") if reason == BOT_DETECTED_REASON => {
            Err(TranscriptError::RequestBlocked { video_id })
        }
        Some("LOGIN_REQUIRED") if reason == AGE_RESTRICTED_REASON => {
            Err(TranscriptError::AgeRestricted { video_id })
        }
        Some("ERROR") if reason == VIDEO_UNAVAILABLE_REASON => {
            Err(TranscriptError::VideoUnavailable { video_id })
        }
        Some(_) => Err(TranscriptError::VideoUnplayable { video_id, reason }),
    }
}
