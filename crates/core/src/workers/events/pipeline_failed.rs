use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{error::ExtractError, events::Event};

/// Terminal failure of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineFailed {
    pub event_id: Uuid,
    pub ts: SystemTime,
    pub parents: [Uuid; 1],
    pub stage: &'static str,
    pub message: String,
    /// User-facing alert text, for failures the user is meant to see.
    pub alert: Option<String>,
}

impl PipelineFailed {
    pub const EVENT_TYPE: &'static str = "pipeline.failed";

    pub fn new(parent: &dyn Event, stage: &'static str, error: &anyhow::Error) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            ts: SystemTime::now(),
            parents: [parent.event_id()],
            stage,
            message: format!("{error:#}"),
            alert: error.downcast_ref::<ExtractError>().map(ToString::to_string),
        }
    }
}

impl Event for PipelineFailed {
    fn event_id(&self) -> Uuid {
        self.event_id
    }

    fn parent_ids(&self) -> &[Uuid] {
        &self.parents
    }

    fn event_type(&self) -> &'static str {
        PipelineFailed::EVENT_TYPE
    }

    fn timestamp(&self) -> SystemTime {
        self.ts
    }

    fn as_any(&self) -> &dyn Any {
        self as &dyn Any
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    fn parent() -> PipelineFailed {
        PipelineFailed::new_detached("root")
    }

    impl PipelineFailed {
        fn new_detached(stage: &'static str) -> Self {
            Self {
                event_id: Uuid::new_v4(),
                ts: SystemTime::now(),
                parents: [Uuid::nil()],
                stage,
                message: String::new(),
                alert: None,
            }
        }
    }

    #[test]
    fn extract_errors_become_alerts() {
        let err = anyhow::Error::new(ExtractError::NoCaptions);
        let failed = PipelineFailed::new(&parent(), "extract", &err);

        assert_eq!(
            failed.alert.as_deref(),
            Some("No transcript available for this video.")
        );
    }

    #[test]
    fn context_does_not_hide_the_alert() {
        let err = Err::<(), _>(ExtractError::ConfigUnavailable)
            .context("tab video")
            .unwrap_err();
        let failed = PipelineFailed::new(&parent(), "extract", &err);

        assert_eq!(
            failed.alert.as_deref(),
            Some("Could not fetch the transcript configuration.")
        );
        assert!(failed.message.starts_with("tab video: "));
    }

    #[test]
    fn other_errors_have_no_alert() {
        let root = parent();
        let failed = PipelineFailed::new(&root, "reload", &anyhow::anyhow!("socket closed"));

        assert_eq!(failed.alert, None);
        assert_eq!(failed.parents, [root.event_id]);
        assert_ne!(failed.event_id, root.event_id);
    }
}
