use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{events::EnrichedEvent, queues::FifoDropOldestReceiver};

pub enum FifoReceiver {
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl FifoReceiver {
    fn try_recv(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            FifoReceiver::FifoDropOldest(r) => r.try_recv(),
            FifoReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct FifoInput {
    pub event_type: &'static str,
    pub receiver: FifoReceiver,
}

pub struct InboxItem {
    pub event_type: &'static str,
    pub event: Arc<EnrichedEvent>,
}

/// Every inbox of one worker, sharing a single wake-up.
pub struct WorkerInputs {
    fifos: Vec<FifoInput>,
    notify_any: Arc<Notify>,
    fifo_index: usize,
}

impl WorkerInputs {
    pub fn new(fifos: Vec<FifoInput>, notify_any: Arc<Notify>) -> Self {
        Self {
            fifos,
            notify_any,
            fifo_index: 0,
        }
    }

    /// Next queued event, polling inputs round-robin so a busy input cannot
    /// starve the others.
    pub async fn next(&mut self) -> InboxItem {
        loop {
            if let Some(item) = self.try_next() {
                return item;
            }
            self.notify_any.notified().await;
        }
    }

    fn try_next(&mut self) -> Option<InboxItem> {
        let len = self.fifos.len();
        for _ in 0..len {
            let i = self.fifo_index;
            self.fifo_index = (self.fifo_index + 1) % len;

            let fifo = &mut self.fifos[i];
            if let Some(event) = fifo.receiver.try_recv() {
                return Some(InboxItem {
                    event_type: fifo.event_type,
                    event,
                });
            }
        }
        None
    }
}
