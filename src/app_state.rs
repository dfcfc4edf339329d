use std::sync::Arc;

use axum::extract::FromRef;

use crate::{transcript_source::TranscriptSource, ytdlp::YtDlp};

/// State of the transcript service
#[derive(Clone)]
pub struct TranscriptState {
    pub source: Arc<dyn TranscriptSource>,
    pub public_url: Arc<str>,
}

impl TranscriptState {
    pub fn new(source: Arc<dyn TranscriptSource>, public_url: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            public_url: public_url.into(),
        }
    }
}

impl std::fmt::Debug for TranscriptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptState")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl FromRef<TranscriptState> for Arc<dyn TranscriptSource> {
    fn from_ref(state: &TranscriptState) -> Arc<dyn TranscriptSource> {
        state.source.clone()
    }
}

/// State of the subtitle url service
#[derive(Debug, Clone)]
pub struct SubtitleUrlState {
    pub ytdlp: YtDlp,
}

impl FromRef<SubtitleUrlState> for YtDlp {
    fn from_ref(state: &SubtitleUrlState) -> YtDlp {
        state.ytdlp.clone()
    }
}
