use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Result;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use crate::{
    events::{EnrichedEvent, EventBus},
    queues::{FifoDropOldestQueue, IsolatedForwarder, QueueKind, StartupTasks},
    routes::{Route, RouteInbox, Routes},
    workers::{FifoInput, FifoReceiver, SubscriptionSpec, WorkerInputs, WorkerWiring},
};

pub struct BusConfig {
    pub session_id: Uuid,
    /// Panic on publishing an event type nobody subscribed to.
    pub strict_routing: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            strict_routing: false,
        }
    }
}

#[derive(Default)]
pub struct BusMetrics {
    pub unrouted_publish_total: AtomicU64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unrouted(&self, _evt: &'static str) {
        self.unrouted_publish_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted_publish_total.load(Ordering::Relaxed)
    }
}

fn validate(subs: &[SubscriptionSpec]) -> Result<()> {
    let mut seen_subscribers: HashSet<&'static str> = HashSet::new();
    for s in subs {
        if s.subscriber_id.trim().is_empty() {
            anyhow::bail!("empty subscriber_id");
        }
        if !seen_subscribers.insert(s.subscriber_id) {
            anyhow::bail!("duplicate subscriber_id={}", s.subscriber_id);
        }
        if s.inputs.is_empty() {
            anyhow::bail!("subscriber_id={} has no inputs", s.subscriber_id);
        }

        let mut seen_inputs: HashSet<&'static str> = HashSet::new();
        for i in &s.inputs {
            if i.event_type.trim().is_empty() {
                anyhow::bail!("subscriber_id={} has empty event_type", s.subscriber_id);
            }
            if !seen_inputs.insert(i.event_type) {
                anyhow::bail!(
                    "subscriber_id={} has duplicate input event_type={}",
                    s.subscriber_id,
                    i.event_type
                );
            }

            match i.queue_kind {
                QueueKind::FifoDropOldest { capacity } => {
                    anyhow::ensure!(capacity > 0, "capacity must be > 0")
                }
                QueueKind::Isolated { output_buffer } => {
                    anyhow::ensure!(output_buffer > 0, "output_buffer must be > 0")
                }
            }
        }
    }
    Ok(())
}

pub struct EventBusBuilder {
    cfg: BusConfig,
    subs: Vec<SubscriptionSpec>,
}

impl EventBusBuilder {
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            subs: Vec::new(),
        }
    }

    pub fn subscribe(mut self, s: SubscriptionSpec) -> Self {
        self.subs.push(s);
        self
    }

    pub fn build(self) -> Result<(EventBus, WorkerWiring, StartupTasks)> {
        validate(&self.subs)?;

        let mut routes = Routes::default();
        let mut wiring: HashMap<&'static str, WorkerInputs> = HashMap::new();
        let mut tasks = StartupTasks { tokio: Vec::new() };
        let metrics = Arc::new(BusMetrics::new());

        for spec in self.subs {
            let notify_any = Arc::new(Notify::new());
            let mut fifos = Vec::new();

            for input in spec.inputs {
                let drops_total = Arc::new(AtomicU64::new(0));

                let (inbox, receiver) = match input.queue_kind {
                    QueueKind::FifoDropOldest { capacity } => {
                        let q =
                            Arc::new(FifoDropOldestQueue::new(capacity, Arc::clone(&notify_any)));
                        let receiver = FifoReceiver::FifoDropOldest(q.receiver());
                        (RouteInbox::FifoDropOldest(q), receiver)
                    }
                    QueueKind::Isolated { output_buffer } => {
                        let (fwd, out_rx, drain_task) =
                            IsolatedForwarder::<Arc<EnrichedEvent>>::new(
                                output_buffer,
                                Arc::clone(&notify_any),
                            );
                        tasks.tokio.push(drain_task);
                        (RouteInbox::Isolated(fwd), FifoReceiver::Isolated(out_rx))
                    }
                };

                debug!(
                    subscriber = spec.subscriber_id,
                    event_type = input.event_type,
                    queue = ?input.queue_kind,
                    "route"
                );
                routes.add(
                    input.event_type,
                    Route {
                        subscriber_id: spec.subscriber_id,
                        inbox,
                        drops_total,
                    },
                );
                fifos.push(FifoInput {
                    event_type: input.event_type,
                    receiver,
                });
            }

            wiring.insert(spec.subscriber_id, WorkerInputs::new(fifos, notify_any));
        }

        let bus = EventBus::new(self.cfg, routes, metrics);
        Ok((bus, WorkerWiring::new(wiring), tasks))
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, time::SystemTime};

    use serde::Serialize;

    use super::*;
    use crate::{
        events::{Event, downcast_ref},
        workers::InputSpec,
    };

    #[derive(Serialize)]
    struct Ping {
        id: Uuid,
        n: u32,
    }

    impl Ping {
        const EVENT_TYPE: &'static str = "test.ping";

        fn new(n: u32) -> Arc<dyn Event> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                n,
            })
        }
    }

    impl Event for Ping {
        fn event_id(&self) -> Uuid {
            self.id
        }

        fn parent_ids(&self) -> &[Uuid] {
            &[]
        }

        fn event_type(&self) -> &'static str {
            Self::EVENT_TYPE
        }

        fn timestamp(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn sub(id: &'static str, queue_kind: QueueKind) -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: id,
            inputs: vec![InputSpec {
                event_type: Ping::EVENT_TYPE,
                queue_kind,
            }],
        }
    }

    fn n_of(event: &Arc<EnrichedEvent>) -> u32 {
        downcast_ref::<Ping>(&event.event).unwrap().n
    }

    #[test]
    fn duplicate_subscribers_are_rejected() {
        let result = EventBusBuilder::new(BusConfig::default())
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = EventBusBuilder::new(BusConfig::default())
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 0 }))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn publish_fans_out_to_every_subscriber() {
        let (bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(sub("fifo", QueueKind::FifoDropOldest { capacity: 4 }))
            .subscribe(sub("isolated", QueueKind::Isolated { output_buffer: 4 }))
            .build()
            .unwrap();
        for t in tasks.tokio {
            tokio::spawn(t);
        }

        bus.publish(Ping::new(1));

        let mut fifo = wiring.take("fifo").unwrap();
        let mut isolated = wiring.take("isolated").unwrap();
        assert_eq!(n_of(&fifo.next().await.event), 1);
        assert_eq!(n_of(&isolated.next().await.event), 1);
    }

    #[tokio::test]
    async fn published_events_carry_session_and_sequence() {
        let (bus, mut wiring, _tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(sub("fifo", QueueKind::FifoDropOldest { capacity: 4 }))
            .build()
            .unwrap();

        bus.publish(Ping::new(1));
        bus.publish(Ping::new(2));

        let mut inputs = wiring.take("fifo").unwrap();
        let first = inputs.next().await.event;
        let second = inputs.next().await.event;
        assert_eq!(first.session_id, bus.session_id());
        assert_eq!((first.ingest_seq, second.ingest_seq), (0, 1));
        assert!(second.ingested_at >= first.ingested_at);
    }

    #[tokio::test]
    async fn overflow_counts_as_a_drop() {
        let (bus, mut wiring, _tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(sub("slow", QueueKind::FifoDropOldest { capacity: 1 }))
            .build()
            .unwrap();

        bus.publish(Ping::new(1));
        bus.publish(Ping::new(2));

        assert_eq!(bus.drops_for("slow"), 1);
        let mut inputs = wiring.take("slow").unwrap();
        assert_eq!(n_of(&inputs.next().await.event), 2);
    }

    #[test]
    fn unrouted_events_are_counted_not_delivered() {
        let (bus, _wiring, _tasks) = EventBusBuilder::new(BusConfig::default())
            .subscribe(SubscriptionSpec {
                subscriber_id: "other",
                inputs: vec![InputSpec {
                    event_type: "test.other",
                    queue_kind: QueueKind::FifoDropOldest { capacity: 1 },
                }],
            })
            .build()
            .unwrap();

        bus.publish(Ping::new(1));

        assert_eq!(bus.metrics().unrouted(), 1);
    }

    #[test]
    #[should_panic(expected = "Unrouted event type")]
    fn strict_routing_panics_on_unrouted() {
        let (bus, _wiring, _tasks) = EventBusBuilder::new(BusConfig {
            session_id: Uuid::new_v4(),
            strict_routing: true,
        })
        .subscribe(SubscriptionSpec {
            subscriber_id: "other",
            inputs: vec![InputSpec {
                event_type: "test.other",
                queue_kind: QueueKind::FifoDropOldest { capacity: 1 },
            }],
        })
        .build()
        .unwrap();

        bus.publish(Ping::new(1));
    }
}
