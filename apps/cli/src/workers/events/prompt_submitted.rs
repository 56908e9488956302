use tubesum_core::{InjectOutcome, TabId, events::Event};

use crate::workers::events::EventHeader;

/// Last event of a successful run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PromptSubmitted {
    pub header: EventHeader,
    pub tab_id: TabId,
    pub outcome: InjectOutcome,
}

impl PromptSubmitted {
    pub const EVENT_TYPE: &'static str = "chat.prompt_submitted";

    pub fn new(parent_event_id: uuid::Uuid, tab_id: TabId, outcome: InjectOutcome) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            tab_id,
            outcome,
        }
    }
}

impl Event for PromptSubmitted {
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
