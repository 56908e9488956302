pub mod chat_tab_opened;
pub mod prompt_submitted;
pub mod video_data_extracted;
pub mod video_page_reloaded;
pub mod video_tab_requested;

use std::time::SystemTime;

pub use chat_tab_opened::*;
pub use prompt_submitted::*;
pub use video_data_extracted::*;
pub use video_page_reloaded::*;
pub use video_tab_requested::*;

#[derive(Clone, Debug, serde::Serialize)]
pub struct EventHeader {
    pub event_id: uuid::Uuid,
    pub parent_ids: Vec<uuid::Uuid>,
    pub timestamp: SystemTime,
}

impl EventHeader {
    pub fn root() -> Self {
        Self {
            event_id: uuid::Uuid::new_v4(),
            parent_ids: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn child_of(parent_event_id: uuid::Uuid) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4(),
            parent_ids: vec![parent_event_id],
            timestamp: SystemTime::now(),
        }
    }
}
