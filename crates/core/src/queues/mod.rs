pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;

pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;

/// Delivery policy for one worker input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Bounded in-place buffer; a full buffer evicts its oldest item.
    FifoDropOldest { capacity: usize },
    /// Forwarded through a drain task so a slow worker never blocks publish.
    Isolated { output_buffer: usize },
}
