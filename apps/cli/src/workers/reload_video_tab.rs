use std::{sync::Arc, time::Duration};

use tracing::info;
use tubesum_core::{
    Browser, CompletionSignal, TubesumError,
    events::{EnrichedEvent, EventBus, expect},
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{VideoPageReloaded, VideoTabRequested};

pub fn is_video_page(url: &str, pattern: &str) -> bool {
    url.contains(pattern)
}

/// Reloads the requested tab so the page script state is fresh, then hands
/// it on once the reload has finished.
pub struct ReloadVideoTabWorker {
    browser: Arc<dyn Browser>,
    video_page_pattern: String,
    load_timeout: Option<Duration>,
}

impl ReloadVideoTabWorker {
    pub fn new(
        browser: Arc<dyn Browser>,
        video_page_pattern: String,
        load_timeout: Option<Duration>,
    ) -> Self {
        Self {
            browser,
            video_page_pattern,
            load_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Worker for ReloadVideoTabWorker {
    const SUBSCRIBER_ID: &'static str = "video.reload";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::fifo(VideoTabRequested::EVENT_TYPE)],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<VideoTabRequested>(&event.event, VideoTabRequested::EVENT_TYPE)?;
        let tab = &req.tab;

        if !is_video_page(&tab.url, &self.video_page_pattern) {
            return Err(TubesumError::UnsupportedPage {
                url: tab.url.clone(),
            }
            .into());
        }

        // Subscribe first so a fast reload cannot finish unseen.
        let loaded = CompletionSignal::register(self.browser.as_ref(), &tab.id)
            .with_timeout(self.load_timeout);
        self.browser.reload(&tab.id).await?;
        loaded.wait().await?;

        info!(tab = %tab.id, "video page reloaded");
        bus.publish(Arc::new(VideoPageReloaded::new(
            event.event.event_id(),
            tab.id.clone(),
        )));

        Ok(())
    }
}
