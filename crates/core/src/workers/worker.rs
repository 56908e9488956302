use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{PipelineFailed, SubscriptionSpec, WorkerInputs},
};

/// One pipeline stage: reacts to its subscribed events and publishes the
/// next ones. A failing `handle` becomes a [`PipelineFailed`] event.
#[async_trait]
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> Result<()>;

    async fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(worker = Self::SUBSCRIBER_ID, "shutting down");
                    return Ok(());
                }
                item = inputs.next() => {
                    debug!(
                        worker = Self::SUBSCRIBER_ID,
                        event_type = item.event_type,
                        session = %item.event.session_id,
                        seq = item.event.ingest_seq,
                        queued_ms = item.event.ingested_at.elapsed().as_millis() as u64,
                        "handling"
                    );
                    let parent = Arc::clone(&item.event.event);
                    if let Err(e) = self.handle(item.event, &bus).await {
                        error!(worker = Self::SUBSCRIBER_ID, err = %e, "stage failed");
                        bus.publish(Arc::new(PipelineFailed::new(
                            parent.as_ref(),
                            Self::SUBSCRIBER_ID,
                            &e,
                        )));
                    }
                }
            }
        }
    }
}
