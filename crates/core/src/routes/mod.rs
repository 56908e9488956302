use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    events::EnrichedEvent,
    queues::{FifoDropOldestQueue, IsolatedForwarder},
};

/// Event type → every inbox subscribed to it.
#[derive(Default)]
pub struct Routes {
    table: HashMap<&'static str, Vec<Route>>,
}

impl Routes {
    pub fn add(&mut self, event_type: &'static str, route: Route) {
        self.table.entry(event_type).or_default().push(route);
    }

    pub fn get(&self, event_type: &str) -> Option<&[Route]> {
        self.table.get(event_type).map(Vec::as_slice)
    }

    pub fn drops_for(&self, subscriber_id: &str) -> u64 {
        self.table
            .values()
            .flatten()
            .filter(|r| r.subscriber_id == subscriber_id)
            .map(|r| r.drops_total.load(Ordering::Relaxed))
            .sum()
    }
}

pub struct Route {
    pub subscriber_id: &'static str,
    pub inbox: RouteInbox,
    pub drops_total: Arc<AtomicU64>,
}

pub enum RouteInbox {
    FifoDropOldest(Arc<FifoDropOldestQueue<Arc<EnrichedEvent>>>),
    Isolated(IsolatedForwarder<Arc<EnrichedEvent>>),
}

impl RouteInbox {
    /// `false` when an event was lost: either the oldest queued item was
    /// evicted or the forwarder was full.
    pub fn try_deliver(&self, event: Arc<EnrichedEvent>) -> bool {
        match self {
            RouteInbox::FifoDropOldest(q) => q.push_overwrite(event).is_none(),
            RouteInbox::Isolated(fwd) => fwd.try_send(event).is_ok(),
        }
    }
}
