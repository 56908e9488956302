use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{
    events::{BusConfig, BusMetrics, EnrichedEvent, Event, to_json},
    routes::Routes,
};

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    session_id: Uuid,
    next_ingest_seq: AtomicU64,
    routes: Routes,
    metrics: Arc<BusMetrics>,
    strict_routing: bool,
}

impl EventBus {
    pub fn new(cfg: BusConfig, routes: Routes, metrics: Arc<BusMetrics>) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                session_id: cfg.session_id,
                next_ingest_seq: AtomicU64::new(0),
                routes,
                metrics,
                strict_routing: cfg.strict_routing,
            }),
        }
    }

    /// Fire-and-forget: the publisher never learns whether anyone received
    /// the event.
    pub fn publish(&self, event: Arc<dyn Event>) {
        let ingest_seq = self.inner.next_ingest_seq.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();

        trace!(event_type, ingest_seq, payload = %to_json(event.as_ref()), "publish");

        let enriched_event = Arc::new(EnrichedEvent {
            event,
            session_id: self.inner.session_id,
            ingest_seq,
            ingested_at: Instant::now(),
        });

        let Some(routes) = self.inner.routes.get(event_type) else {
            self.inner.metrics.record_unrouted(event_type);
            debug!(event_type, "no subscriber for event");

            if self.inner.strict_routing {
                panic!("Unrouted event type: {}", event_type);
            }

            return;
        };

        for route in routes {
            if !route.inbox.try_deliver(Arc::clone(&enriched_event)) {
                route.drops_total.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_type,
                    subscriber = route.subscriber_id,
                    "subscriber inbox full, event dropped"
                );
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.inner.metrics
    }

    /// Events lost on the way to `subscriber_id`, across all its inputs.
    pub fn drops_for(&self, subscriber_id: &str) -> u64 {
        self.inner.routes.drops_for(subscriber_id)
    }
}
