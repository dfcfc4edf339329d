use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Single timed line of a transcript. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(rename = "text", default)]
    entries: Vec<TimedTextEntry>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEntry {
    #[serde(rename = "@start")]
    start: f64,
    #[serde(rename = "@dur", default)]
    duration: f64,
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static HTML_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

/// Parse youtube timed text document.
///
/// ```xml
/// <transcript>
///   <text start="0.0" dur="1.54">Hey there</text>
/// </transcript>
/// ```
pub(crate) fn parse_timed_text(xml: &str) -> Result<Vec<TranscriptSnippet>, quick_xml::DeError> {
    let document: TimedText = quick_xml::de::from_str(xml)?;
    Ok(document
        .entries
        .into_iter()
        .filter_map(|entry| {
            let text = entry.text.filter(|t| !t.is_empty())?;
            Some(TranscriptSnippet {
                text: clean_text(&text),
                start: entry.start,
                duration: entry.duration,
            })
        })
        .collect())
}

fn clean_text(raw: &str) -> String {
    let unescaped = unescape_html(raw);
    HTML_TAG_RE.replace_all(&unescaped, "").into_owned()
}

fn unescape_html(raw: &str) -> String {
    HTML_ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|code| {
                    let code = match code.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => code.parse().ok()?,
                    };
                    char::from_u32(code)
                }),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
