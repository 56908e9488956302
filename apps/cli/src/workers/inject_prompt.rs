use std::sync::Arc;

use tubesum_core::{
    Browser, ChatTarget, Injector, Page,
    events::{EnrichedEvent, EventBus, expect},
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{ChatTabOpened, PromptSubmitted};

pub struct InjectPromptWorker<T> {
    browser: Arc<dyn Browser>,
    injector: Injector<T>,
}

impl<T: ChatTarget> InjectPromptWorker<T> {
    pub fn new(browser: Arc<dyn Browser>, injector: Injector<T>) -> Self {
        Self { browser, injector }
    }
}

#[async_trait::async_trait]
impl<T: ChatTarget + 'static> Worker for InjectPromptWorker<T> {
    const SUBSCRIBER_ID: &'static str = "chat.inject_prompt";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::fifo(ChatTabOpened::EVENT_TYPE)],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<ChatTabOpened>(&event.event, ChatTabOpened::EVENT_TYPE)?;
        let page = Page::new(Arc::clone(&self.browser), req.tab_id.clone());

        let outcome = self.injector.inject(&page, &req.video).await;

        bus.publish(Arc::new(PromptSubmitted::new(
            event.event.event_id(),
            req.tab_id.clone(),
            outcome,
        )));

        Ok(())
    }
}
