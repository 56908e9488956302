use tubesum_core::{RelayMessage, events::Event};

use crate::workers::events::EventHeader;

/// Relay from the video tab to whoever opens the chat tab. Serializes as
/// `{"action":"openNewTab","videoData":{...}}` under `message`.
#[derive(serde::Serialize)]
pub struct VideoDataExtracted {
    pub header: EventHeader,
    pub message: RelayMessage,
}

impl VideoDataExtracted {
    pub const EVENT_TYPE: &'static str = "video.data_extracted";

    pub fn new(parent_event_id: uuid::Uuid, message: RelayMessage) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            message,
        }
    }
}

impl Event for VideoDataExtracted {
    fn event_id(&self) -> uuid::Uuid {
        self.header.event_id
    }

    fn parent_ids(&self) -> &[uuid::Uuid] {
        &self.header.parent_ids
    }

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> std::time::SystemTime {
        self.header.timestamp
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self as &dyn std::any::Any
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tubesum_core::VideoData;

    use super::*;

    #[test]
    fn message_keeps_the_open_new_tab_shape() {
        let event = VideoDataExtracted::new(
            uuid::Uuid::new_v4(),
            RelayMessage::OpenNewTab {
                video_data: VideoData {
                    title: "Demo".into(),
                    author: "Chan".into(),
                    transcript: "A B C D".into(),
                },
            },
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value["message"],
            json!({
                "action": "openNewTab",
                "videoData": {"title": "Demo", "author": "Chan", "transcript": "A B C D"}
            })
        );
        assert_eq!(event.parent_ids().len(), 1);
    }
}
