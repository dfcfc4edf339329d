//! Normalization of user provided youtube video references.

const VIDEO_ID_LENGTH: usize = 11;

/// Bare youtube video id: 11 characters of url safe base64 alphabet
pub fn is_video_id(input: &str) -> bool {
    input.len() == VIDEO_ID_LENGTH
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com"
        || host == "youtu.be"
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube.com")
        || host.ends_with(".youtube-nocookie.com")
}

/// Extract video id out of bare id or one of youtube url forms.
///
/// Supported urls: `/watch?v=`, `youtu.be/<id>`, `/shorts/<id>`, `/embed/<id>`, `/live/<id>`, `/v/<id>`
pub fn normalize_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_owned());
    }
    let url = url::Url::parse(input)
        .or_else(|_| url::Url::parse(&format!("https://{input}")))
        .ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let candidate = if host.eq_ignore_ascii_case("youtu.be") {
        segments.next().map(str::to_owned)
    } else {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_owned),
            _ => None,
        }
    }?;
    is_video_id(&candidate).then_some(candidate)
}
