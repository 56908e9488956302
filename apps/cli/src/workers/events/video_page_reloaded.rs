use tubesum_core::{TabId, events::Event};

use crate::workers::events::EventHeader;

#[derive(serde::Serialize)]
pub struct VideoPageReloaded {
    pub header: EventHeader,
    pub tab_id: TabId,
}

impl VideoPageReloaded {
    pub const EVENT_TYPE: &'static str = "video.page_reloaded";

    pub fn new(parent_event_id: uuid::Uuid, tab_id: TabId) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            tab_id,
        }
    }
}

impl Event for VideoPageReloaded {
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
