//! Server event types and the in-process event bus.
//!
//! The bus fans typed events out to an open set of subscribers with no
//! buffering and no replay: a subscriber that joins after an event was
//! published never sees it. Subscriber faults are swallowed at the dispatch
//! site so one closed stream can never starve the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::message::{Message, Part};
use crate::store::Session;

/// Event published to live subscribers.
///
/// Each variant carries only what a subscriber needs to update its own
/// projection: the full session, the full message, the full part, or a raw
/// text delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ServerConnected,
    Heartbeat,
    SessionCreated {
        session: Session,
    },
    SessionUpdated {
        session: Session,
    },
    SessionDeleted {
        session_id: String,
    },
    MessageUpdated {
        session_id: String,
        message: Message,
    },
    MessagePartUpdated {
        session_id: String,
        message_id: String,
        part: Part,
    },
    MessagePartDelta {
        session_id: String,
        message_id: String,
        delta: String,
    },
}

/// Reported by an observer whose downstream is gone. Dropped by the bus.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("subscriber closed")]
pub struct SubscriberClosed;

pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &ServerEvent) -> Result<(), SubscriberClosed>;
}

impl<F> EventObserver for F
where
    F: Fn(&ServerEvent) -> Result<(), SubscriberClosed> + Send + Sync,
{
    fn on_event(&self, event: &ServerEvent) -> Result<(), SubscriberClosed> {
        self(event)
    }
}

/// Records every event it sees; the test-side observer.
#[derive(Clone, Default)]
pub struct BufferedObserver {
    inner: Arc<Mutex<Vec<ServerEvent>>>,
}

impl BufferedObserver {
    pub fn snapshot(&self) -> Vec<ServerEvent> {
        let guard = self.inner.lock().expect("buffered observer mutex");
        guard.clone()
    }
}

impl EventObserver for BufferedObserver {
    fn on_event(&self, event: &ServerEvent) -> Result<(), SubscriberClosed> {
        let mut guard = self.inner.lock().expect("buffered observer mutex");
        guard.push(event.clone());
        Ok(())
    }
}

/// In-process publish/subscribe hub.
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Arc<dyn EventObserver>>>,
    /// Weak self-handle minted into subscriptions, so unsubscribing stays
    /// safe after the bus itself is gone.
    self_ref: Weak<EventBus>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|bus| Self {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(HashMap::new()),
            self_ref: bus.clone(),
        })
    }

    /// Delivers the event synchronously to every currently-registered
    /// subscriber, best-effort. The registry lock is released before
    /// dispatch so subscribing from an observer cannot deadlock, and a
    /// failing observer never stops the fan-out.
    pub fn publish(&self, event: &ServerEvent) {
        let snapshot: Vec<Arc<dyn EventObserver>> = {
            let guard = self.subscribers.lock().expect("subscriber registry mutex");
            guard.values().cloned().collect()
        };
        for observer in snapshot {
            let _ = observer.on_event(event);
        }
    }

    /// Registers an observer and returns its unregister capability.
    pub fn subscribe(&self, observer: Arc<dyn EventObserver>) -> EventSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.subscribers.lock().expect("subscriber registry mutex");
        guard.insert(id, observer);
        EventSubscription {
            bus: self.self_ref.clone(),
            id,
        }
    }

    /// Transport-facing subscription: events are forwarded into an
    /// unbounded channel, seeded with one [`ServerEvent::ServerConnected`]
    /// so a fresh connection gets its hello without any replay. A dropped
    /// receiver turns further sends into swallowed subscriber faults.
    pub fn subscribe_channel(
        &self,
    ) -> (EventSubscription, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ServerEvent::ServerConnected);
        let subscription = self.subscribe(Arc::new(move |event: &ServerEvent| {
            tx.send(event.clone()).map_err(|_| SubscriberClosed)
        }));
        (subscription, rx)
    }

    pub fn subscriber_count(&self) -> usize {
        let guard = self.subscribers.lock().expect("subscriber registry mutex");
        guard.len()
    }

    fn unsubscribe(&self, id: u64) {
        let mut guard = self.subscribers.lock().expect("subscriber registry mutex");
        guard.remove(&id);
    }
}

/// Unregister capability returned by [`EventBus::subscribe`].
///
/// Unsubscribing is idempotent, safe to call repeatedly, and safe after the
/// bus itself is gone. Dropping the subscription unsubscribes it.
pub struct EventSubscription {
    bus: Weak<EventBus>,
    id: u64,
}

impl EventSubscription {
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Publishes [`ServerEvent::Heartbeat`] at a fixed interval until the
/// returned task is aborted. Keeps live stream connections alive at the
/// transport boundary.
pub fn spawn_heartbeat(bus: Arc<EventBus>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // interval fires immediately; the first heartbeat waits one period
        ticker.tick().await;
        loop {
            ticker.tick().await;
            bus.publish(&ServerEvent::Heartbeat);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_fans_out_to_all_subscribers() {
        let bus = EventBus::new();
        let first = BufferedObserver::default();
        let second = BufferedObserver::default();
        let _a = bus.subscribe(Arc::new(first.clone()));
        let _b = bus.subscribe(Arc::new(second.clone()));

        bus.publish(&ServerEvent::Heartbeat);

        assert_eq!(first.snapshot(), vec![ServerEvent::Heartbeat]);
        assert_eq!(second.snapshot(), vec![ServerEvent::Heartbeat]);
    }

    #[test]
    fn late_subscriber_misses_prior_events() {
        let bus = EventBus::new();
        bus.publish(&ServerEvent::Heartbeat);

        let late = BufferedObserver::default();
        let _sub = bus.subscribe(Arc::new(late.clone()));
        assert!(late.snapshot().is_empty());

        bus.publish(&ServerEvent::Heartbeat);
        assert_eq!(late.snapshot().len(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = EventBus::new();
        let observer = BufferedObserver::default();
        let subscription = bus.subscribe(Arc::new(observer.clone()));

        bus.publish(&ServerEvent::Heartbeat);
        subscription.unsubscribe();
        subscription.unsubscribe();
        bus.publish(&ServerEvent::Heartbeat);

        assert_eq!(observer.snapshot().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_after_bus_is_gone_is_safe() {
        let bus = EventBus::new();
        let subscription = bus.subscribe(Arc::new(BufferedObserver::default()));
        drop(bus);
        subscription.unsubscribe();
    }

    #[test]
    fn dropping_the_subscription_unregisters_it() {
        let bus = EventBus::new();
        let observer = BufferedObserver::default();
        {
            let _subscription = bus.subscribe(Arc::new(observer.clone()));
        }
        bus.publish(&ServerEvent::Heartbeat);
        assert!(observer.snapshot().is_empty());
    }

    #[test]
    fn failing_subscriber_does_not_block_the_rest() {
        let bus = EventBus::new();
        let _failing = bus.subscribe(Arc::new(
            |_: &ServerEvent| -> Result<(), SubscriberClosed> { Err(SubscriberClosed) },
        ));
        let healthy = BufferedObserver::default();
        let _sub = bus.subscribe(Arc::new(healthy.clone()));

        bus.publish(&ServerEvent::Heartbeat);
        assert_eq!(healthy.snapshot().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn channel_subscriber_is_seeded_with_the_hello_event() {
        let bus = EventBus::new();
        let (_subscription, mut rx) = bus.subscribe_channel();

        bus.publish(&ServerEvent::Heartbeat);

        assert_eq!(rx.recv().await, Some(ServerEvent::ServerConnected));
        assert_eq!(rx.recv().await, Some(ServerEvent::Heartbeat));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn closed_channel_receiver_does_not_break_publishing() {
        let bus = EventBus::new();
        let (_subscription, rx) = bus.subscribe_channel();
        drop(rx);

        let healthy = BufferedObserver::default();
        let _sub = bus.subscribe(Arc::new(healthy.clone()));
        bus.publish(&ServerEvent::Heartbeat);
        assert_eq!(healthy.snapshot().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn heartbeat_publishes_on_the_interval() {
        let bus = EventBus::new();
        let (_subscription, mut rx) = bus.subscribe_channel();
        assert_eq!(rx.recv().await, Some(ServerEvent::ServerConnected));

        let handle = spawn_heartbeat(bus.clone(), Duration::from_millis(5));
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("heartbeat within deadline");
        assert_eq!(first, Some(ServerEvent::Heartbeat));
        handle.abort();
    }
}
