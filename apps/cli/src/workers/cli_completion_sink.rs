use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tubesum_core::{
    events::{EnrichedEvent, EventBus, downcast_ref},
    queues::QueueKind,
    workers::{InputSpec, PipelineFailed, SubscriptionSpec, Worker},
};

use crate::workers::events::{ChatTabOpened, PromptSubmitted, VideoDataExtracted, VideoPageReloaded};

/// Where a run is, as shown on the spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Reloading,
    Extracting,
    Opening,
    Injecting,
}

impl RunStage {
    pub fn message(self) -> &'static str {
        match self {
            RunStage::Reloading => "Reloading video tab...",
            RunStage::Extracting => "Extracting transcript...",
            RunStage::Opening => "Opening chat tab...",
            RunStage::Injecting => "Waiting for chat input and submitting...",
        }
    }
}

pub type RunResult = Result<PromptSubmitted, PipelineFailed>;

pub struct CliCompletionSinkWorker {
    done: Option<oneshot::Sender<RunResult>>,
    stages: mpsc::UnboundedSender<RunStage>,
}

impl CliCompletionSinkWorker {
    pub fn new(
        done: Option<oneshot::Sender<RunResult>>,
        stages: mpsc::UnboundedSender<RunStage>,
    ) -> Self {
        Self { done, stages }
    }

    fn finish(&mut self, result: RunResult) {
        if let Some(done) = self.done.take() {
            // The CLI may have given up waiting already.
            let _ = done.send(result);
        }
    }

    fn progress(&self, stage: RunStage) {
        let _ = self.stages.send(stage);
    }
}

#[async_trait::async_trait]
impl Worker for CliCompletionSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.completion_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec::fifo(VideoPageReloaded::EVENT_TYPE),
                InputSpec::fifo(VideoDataExtracted::EVENT_TYPE),
                InputSpec::fifo(ChatTabOpened::EVENT_TYPE),
                InputSpec {
                    event_type: PromptSubmitted::EVENT_TYPE,
                    queue_kind: QueueKind::Isolated { output_buffer: 4 },
                },
                InputSpec {
                    event_type: PipelineFailed::EVENT_TYPE,
                    queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
                },
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        let event = &event.event;

        if downcast_ref::<VideoPageReloaded>(event).is_some() {
            self.progress(RunStage::Extracting);
        } else if downcast_ref::<VideoDataExtracted>(event).is_some() {
            self.progress(RunStage::Opening);
        } else if downcast_ref::<ChatTabOpened>(event).is_some() {
            self.progress(RunStage::Injecting);
        } else if let Some(submitted) = downcast_ref::<PromptSubmitted>(event) {
            self.finish(Ok(submitted.clone()));
        } else if let Some(failed) = downcast_ref::<PipelineFailed>(event) {
            self.finish(Err(failed.clone()));
        }

        Ok(())
    }
}
