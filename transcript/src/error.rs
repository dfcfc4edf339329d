/// Everything that can go wrong while listing or fetching a transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },
    #[error(
        "No transcript found for video {video_id} in any of the requested languages {requested:?}, available languages: {available:?}"
    )]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },
    #[error("Video {video_id} is no longer available")]
    VideoUnavailable { video_id: String },
    #[error("Video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },
    #[error("Video {video_id} is age restricted and requires authentication")]
    AgeRestricted { video_id: String },
    #[error("YouTube is blocking requests for video {video_id}: bot check required")]
    RequestBlocked { video_id: String },
    #[error("YouTube is blocking requests from this IP address")]
    IpBlocked,
    #[error("Failed to create consent cookie for video {video_id}")]
    FailedToCreateConsentCookie { video_id: String },
    #[error("Transcript for video {video_id} requires a PO token")]
    PoTokenRequired { video_id: String },
    #[error("Failed to parse YouTube data for video {video_id}")]
    DataUnparsable { video_id: String },
    #[error("YouTube responded with status {status}")]
    Http { status: u16 },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to parse timed text: {0}")]
    TimedText(#[from] quick_xml::DeError),
}
