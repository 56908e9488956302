use std::sync::Arc;

use anyhow::Context;
use tubesum_core::{
    Browser, Page, RelayMessage, TranscriptExtractor,
    events::{EnrichedEvent, EventBus, expect},
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{VideoDataExtracted, VideoPageReloaded};

pub struct ExtractTranscriptWorker {
    browser: Arc<dyn Browser>,
    extractor: TranscriptExtractor,
}

impl ExtractTranscriptWorker {
    pub fn new(browser: Arc<dyn Browser>, extractor: TranscriptExtractor) -> Self {
        Self { browser, extractor }
    }
}

#[async_trait::async_trait]
impl Worker for ExtractTranscriptWorker {
    const SUBSCRIBER_ID: &'static str = "video.extract_transcript";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::fifo(VideoPageReloaded::EVENT_TYPE)],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<VideoPageReloaded>(&event.event, VideoPageReloaded::EVENT_TYPE)?;
        let page = Page::new(Arc::clone(&self.browser), req.tab_id.clone());

        let video_data = self
            .extractor
            .extract(&page)
            .await
            .with_context(|| format!("extracting transcript from tab {}", req.tab_id))?;

        bus.publish(Arc::new(VideoDataExtracted::new(
            event.event.event_id(),
            RelayMessage::OpenNewTab { video_data },
        )));

        Ok(())
    }
}
