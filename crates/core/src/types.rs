use serde::{Deserialize, Serialize};

/// The subset of `ytInitialPlayerResponse` this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub captions: Option<Captions>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    pub player_captions_tracklist_renderer: Option<CaptionTracklist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTracklist {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// "asr" for auto-generated tracks.
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub title: Option<String>,
    pub author: Option<String>,
    pub video_id: Option<String>,
}

impl PlayerResponse {
    pub fn caption_tracks(&self) -> &[CaptionTrack] {
        self.captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .map(|r| r.caption_tracks.as_slice())
            .unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.video_details
            .as_ref()
            .and_then(|d| d.title.as_deref())
            .unwrap_or_default()
    }

    pub fn author(&self) -> &str {
        self.video_details
            .as_ref()
            .and_then(|d| d.author.as_deref())
            .unwrap_or_default()
    }
}

/// What gets carried from the video page to the chat page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub title: String,
    pub author: String,
    pub transcript: String,
}

/// Message relayed from the video tab stage to the tab opener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RelayMessage {
    #[serde(rename = "openNewTab")]
    OpenNewTab {
        #[serde(rename = "videoData")]
        video_data: VideoData,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_response_reads_tracks_and_details() {
        let json = r#"{
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://example.com/fr", "languageCode": "fr"},
                        {"baseUrl": "https://example.com/en", "languageCode": "en", "kind": "asr"}
                    ]
                }
            },
            "videoDetails": {"title": "Intro", "author": "Someone", "lengthSeconds": "61"},
            "playabilityStatus": {"status": "OK"}
        }"#;
        let resp: PlayerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.caption_tracks().len(), 2);
        assert_eq!(resp.caption_tracks()[1].kind.as_deref(), Some("asr"));
        assert_eq!(resp.title(), "Intro");
        assert_eq!(resp.author(), "Someone");
    }

    #[test]
    fn missing_captions_yield_no_tracks() {
        let resp: PlayerResponse = serde_json::from_str(r#"{"videoDetails": {}}"#).unwrap();
        assert!(resp.caption_tracks().is_empty());
        assert_eq!(resp.title(), "");
    }

    #[test]
    fn relay_message_has_extension_shape() {
        let msg = RelayMessage::OpenNewTab {
            video_data: VideoData {
                title: "T".into(),
                author: "A".into(),
                transcript: "x y".into(),
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "action": "openNewTab",
                "videoData": {"title": "T", "author": "A", "transcript": "x y"}
            })
        );
    }
}
