use transcript::{TranscriptApi, TranscriptError, TranscriptSnippet};

/// Anything that can fetch a timed transcript of a youtube video
#[async_trait::async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch transcript in the first available language of `language_codes`
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language_codes: &[&str],
    ) -> Result<Vec<TranscriptSnippet>, TranscriptError>;
}

#[async_trait::async_trait]
impl TranscriptSource for TranscriptApi {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language_codes: &[&str],
    ) -> Result<Vec<TranscriptSnippet>, TranscriptError> {
        self.fetch(video_id, language_codes).await
    }
}
