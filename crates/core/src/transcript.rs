//! Transcript extraction from a loaded video page.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    browser::Page,
    config::Config,
    error::{ExtractError, Result},
    retry::{RetryPolicy, retry_until_some},
    types::{CaptionTrack, PlayerResponse, VideoData},
};

/// Global the watch page assigns its player state to.
pub const CONFIG_MARKER: &str = "ytInitialPlayerResponse";

pub const DEFAULT_CAPTION_LANGUAGE: &str = "en";

const INLINE_SCRIPTS_JS: &str =
    "Array.from(document.querySelectorAll('script')).map(s => s.textContent || '')";

static CONFIG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ytInitialPlayerResponse\s*=\s*(\{.+?\});").expect("config pattern must compile")
});

/// Find and parse the embedded player response among inline script bodies.
pub fn locate_config<S: AsRef<str>>(scripts: &[S]) -> Option<PlayerResponse> {
    for script in scripts.iter().map(AsRef::as_ref) {
        if !script.contains(CONFIG_MARKER) {
            continue;
        }
        let Some(captures) = CONFIG_PATTERN.captures(script) else {
            continue;
        };
        match serde_json::from_str::<PlayerResponse>(&captures[1]) {
            Ok(config) => return Some(config),
            Err(e) => debug!(err = %e, "marker script did not parse, skipping"),
        }
    }
    None
}

pub async fn read_inline_scripts(page: &Page) -> Result<Vec<String>> {
    Ok(page.evaluate_as(INLINE_SCRIPTS_JS).await?)
}

/// The page may not have its state script yet right after a reload, so look
/// again on a backoff schedule.
pub async fn locate_config_with_retry(page: &Page, policy: RetryPolicy) -> Option<PlayerResponse> {
    retry_until_some(policy, |attempt| async move {
        match read_inline_scripts(page).await {
            Ok(scripts) => {
                let found = locate_config(&scripts);
                if found.is_none() {
                    info!(attempt, "player config not found yet");
                }
                found
            }
            Err(e) => {
                warn!(attempt, err = %e, "could not read page scripts");
                None
            }
        }
    })
    .await
}

/// Exact language-code match, no fallback.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    tracks.iter().find(|t| t.language_code == language)
}

/// Text content of every `<text>` element in document order, joined with
/// single spaces. A bare run of `<text>` elements with no wrapper is accepted.
pub fn parse_timed_text(payload: &str) -> std::result::Result<String, roxmltree::Error> {
    let wrapped = format!("<timedtext>{}</timedtext>", strip_xml_declaration(payload));
    let document = roxmltree::Document::parse(&wrapped)?;
    Ok(document
        .descendants()
        .filter(|node| node.has_tag_name("text"))
        .map(|node| {
            node.descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" "))
}

fn strip_xml_declaration(payload: &str) -> &str {
    let body = payload.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    match body.strip_prefix("<?xml") {
        Some(rest) => rest.split_once("?>").map_or(body, |(_, after)| after),
        None => body,
    }
}

pub struct TranscriptExtractor {
    http: reqwest::Client,
    language: String,
    retry: RetryPolicy,
}

impl Default for TranscriptExtractor {
    fn default() -> Self {
        Self::new(
            reqwest::Client::new(),
            DEFAULT_CAPTION_LANGUAGE,
            RetryPolicy::default(),
        )
    }
}

impl TranscriptExtractor {
    pub fn new(http: reqwest::Client, language: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            language: language.to_string(),
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            reqwest::Client::new(),
            &config.caption_language,
            config.retry_policy(),
        )
    }

    /// Fetch and flatten the caption track in our language.
    ///
    /// `Ok(None)` means there is no such track and nothing was requested.
    pub async fn fetch_transcript(&self, tracks: &[CaptionTrack]) -> Result<Option<String>> {
        let Some(track) = select_track(tracks, &self.language) else {
            info!(language = %self.language, "no caption track in requested language");
            return Ok(None);
        };

        debug!(url = %track.base_url, "fetching caption track");
        let payload = self
            .http
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(Some(parse_timed_text(&payload)?))
    }

    /// Run the whole extraction against a freshly loaded video page.
    pub async fn extract(&self, page: &Page) -> std::result::Result<VideoData, ExtractError> {
        let config = locate_config_with_retry(page, self.retry)
            .await
            .ok_or(ExtractError::ConfigUnavailable)?;

        let tracks = config.caption_tracks();
        if tracks.is_empty() {
            return Err(ExtractError::NoCaptions);
        }

        let transcript = match self.fetch_transcript(tracks).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => return Err(ExtractError::TranscriptUnavailable),
            Err(e) => {
                warn!(err = %e, "caption fetch failed");
                return Err(ExtractError::TranscriptUnavailable);
            }
        };

        let video = VideoData {
            title: config.title().to_string(),
            author: config.author().to_string(),
            transcript,
        };
        info!(
            title = %video.title,
            chars = video.transcript.chars().count(),
            "transcript extracted"
        );
        Ok(video)
    }
}
