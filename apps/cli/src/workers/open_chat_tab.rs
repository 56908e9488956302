use std::{sync::Arc, time::Duration};

use tracing::info;
use tubesum_core::{
    Browser, CompletionSignal, RelayMessage,
    events::{EnrichedEvent, EventBus, expect},
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{ChatTabOpened, VideoDataExtracted};

pub struct OpenChatTabWorker {
    browser: Arc<dyn Browser>,
    chat_url: String,
    load_timeout: Option<Duration>,
}

impl OpenChatTabWorker {
    pub fn new(browser: Arc<dyn Browser>, chat_url: String, load_timeout: Option<Duration>) -> Self {
        Self {
            browser,
            chat_url,
            load_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Worker for OpenChatTabWorker {
    const SUBSCRIBER_ID: &'static str = "chat.open_tab";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::fifo(VideoDataExtracted::EVENT_TYPE)],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<VideoDataExtracted>(&event.event, VideoDataExtracted::EVENT_TYPE)?;
        let RelayMessage::OpenNewTab { video_data } = &req.message;

        let tab_id = self.browser.create_tab().await?;
        // Scoped to the new tab only; registered before navigation starts.
        let loaded = CompletionSignal::register(self.browser.as_ref(), &tab_id)
            .with_timeout(self.load_timeout);
        self.browser.navigate(&tab_id, &self.chat_url).await?;
        loaded.wait().await?;

        info!(tab = %tab_id, url = %self.chat_url, "chat tab loaded");
        bus.publish(Arc::new(ChatTabOpened::new(
            event.event.event_id(),
            tab_id,
            video_data.clone(),
        )));

        Ok(())
    }
}
