use std::time::SystemTime;

use tubesum_core::{Tab, events::Event};
use uuid::Uuid;

use crate::workers::events::EventHeader;

/// The user asked for a summary of this tab.
#[derive(serde::Serialize)]
pub struct VideoTabRequested {
    pub header: EventHeader,
    pub tab: Tab,
}

impl VideoTabRequested {
    pub const EVENT_TYPE: &'static str = "video.tab_requested";

    pub fn new(tab: Tab) -> Self {
        Self {
            header: EventHeader::root(),
            tab,
        }
    }
}

impl Event for VideoTabRequested {
    fn event_id(&self) -> Uuid {
        self.header.event_id
    }

    fn parent_ids(&self) -> &[Uuid] {
        &self.header.parent_ids
    }

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> SystemTime {
        self.header.timestamp
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self as &dyn std::any::Any
    }
}
