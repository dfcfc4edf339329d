use reqwest::Client;
use serde::Serialize;

use crate::innertube::CaptionTrack;
use crate::timed_text::{parse_timed_text, TranscriptSnippet};
use crate::{check_status, TranscriptError};

/// Caption track of a video in one language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    #[serde(skip)]
    url: String,
}

impl Transcript {
    pub(crate) fn from_track(video_id: &str, track: CaptionTrack) -> Self {
        Self {
            video_id: video_id.to_owned(),
            language: track.name.text(),
            is_generated: track.is_generated(),
            is_translatable: track.is_translatable,
            language_code: track.language_code,
            url: track.base_url.replace("&fmt=srv3", ""),
        }
    }

    /// Download and parse timed text of this track
    pub async fn fetch(&self, client: &Client) -> Result<Vec<TranscriptSnippet>, TranscriptError> {
        if self.url.contains("&exp=xpe") {
            return Err(TranscriptError::PoTokenRequired {
                video_id: self.video_id.clone(),
            });
        }
        tracing::trace!(
            video_id = %self.video_id,
            language_code = %self.language_code,
            "Fetching timed text"
        );
        let response = client
            .get(&self.url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;
        let xml = check_status(response)?.text().await?;
        Ok(parse_timed_text(&xml)?)
    }
}

/// All caption tracks of one video
#[derive(Debug, Clone, Default)]
pub struct TranscriptList {
    pub video_id: String,
    manually_created: Vec<Transcript>,
    generated: Vec<Transcript>,
}

impl TranscriptList {
    pub(crate) fn from_tracks(video_id: &str, tracks: Vec<CaptionTrack>) -> Self {
        let (generated, manually_created) = tracks
            .into_iter()
            .map(|t| Transcript::from_track(video_id, t))
            .partition(|t| t.is_generated);
        Self {
            video_id: video_id.to_owned(),
            manually_created,
            generated,
        }
    }

    /// Find transcript for the first language code that has one.
    ///
    /// Language codes are tried in order. Manually created transcripts win over generated ones of the same language.
    pub fn find_transcript(
        &self,
        language_codes: &[impl AsRef<str>],
    ) -> Result<&Transcript, TranscriptError> {
        self.find(language_codes, [&self.manually_created, &self.generated])
    }

    pub fn find_manually_created_transcript(
        &self,
        language_codes: &[impl AsRef<str>],
    ) -> Result<&Transcript, TranscriptError> {
        self.find(language_codes, [&self.manually_created])
    }

    pub fn find_generated_transcript(
        &self,
        language_codes: &[impl AsRef<str>],
    ) -> Result<&Transcript, TranscriptError> {
        self.find(language_codes, [&self.generated])
    }

    fn find<'a, const N: usize>(
        &'a self,
        language_codes: &[impl AsRef<str>],
        groups: [&'a Vec<Transcript>; N],
    ) -> Result<&'a Transcript, TranscriptError> {
        language_codes
            .iter()
            .find_map(|code| {
                groups
                    .iter()
                    .find_map(|group| group.iter().find(|t| t.language_code == code.as_ref()))
            })
            .ok_or_else(|| TranscriptError::NoTranscriptFound {
                video_id: self.video_id.clone(),
                requested: language_codes
                    .iter()
                    .map(|c| c.as_ref().to_owned())
                    .collect(),
                available: self.available_languages(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transcript> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    pub fn available_languages(&self) -> Vec<String> {
        self.iter().map(|t| t.language_code.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.manually_created.is_empty() && self.generated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innertube::{CaptionName, CaptionTrack};

    fn track(code: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?v=id&lang={code}&fmt=srv3"),
            name: CaptionName {
                runs: None,
                simple_text: Some(code.to_uppercase()),
            },
            language_code: code.to_owned(),
            kind: generated.then(|| "asr".to_owned()),
            is_translatable: false,
        }
    }

    #[test]
    fn prefers_manual_transcript() {
        let list = TranscriptList::from_tracks(
            "id",
            vec![track("en", true), track("de", false), track("en", false)],
        );
        let found = list.find_transcript(&["en"]).unwrap();
        assert!(!found.is_generated);
        assert_eq!(found.url, "https://www.youtube.com/api/timedtext?v=id&lang=en");
    }

    #[test]
    fn language_order_wins_over_kind() {
        let list = TranscriptList::from_tracks("id", vec![track("fr", true), track("de", false)]);
        let found = list.find_transcript(&["fr", "de"]).unwrap();
        assert_eq!(found.language_code, "fr");
        assert!(found.is_generated);
        assert!(list.find_manually_created_transcript(&["fr"]).is_err());
        assert!(list.find_generated_transcript(&["fr"]).is_ok());
    }

    #[test]
    fn found_transcript_outlives_lookup() {
        let list = TranscriptList::from_tracks("id", vec![track("en", false), track("de", true)]);
        assert!(!list.is_empty());
        let found: Vec<&Transcript> = [&["de"][..], &["en"][..]]
            .into_iter()
            .map(|codes| list.find_transcript(codes).unwrap())
            .collect();
        assert_eq!(found[0].language_code, "de");
        assert_eq!(found[1].language_code, "en");
        assert_eq!(found.len(), list.iter().count());
    }

    #[test]
    fn video_without_tracks() {
        let list = TranscriptList::from_tracks("id", Vec::new());
        assert!(list.is_empty());
        assert!(list.available_languages().is_empty());
        assert!(matches!(
            list.find_transcript(&["en"]),
            Err(TranscriptError::NoTranscriptFound { .. })
        ));
    }

    #[test]
    fn missing_language() {
        let list = TranscriptList::from_tracks("id", vec![track("en", false), track("de", true)]);
        match list.find_transcript(&["ja"]) {
            Err(TranscriptError::NoTranscriptFound {
                video_id,
                requested,
                available,
            }) => {
                assert_eq!(video_id, "id");
                assert_eq!(requested, vec!["ja"]);
                assert_eq!(available, vec!["en", "de"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
