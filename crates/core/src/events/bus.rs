//! Event bus trait and implementations.

use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::errors::Result;

/// Envelope that carries a topic name and a JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub struct BusEvent {
    pub topic: String,
    pub payload: Value,
}

impl BusEvent {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Serializes a typed payload into an event.
    pub fn from_payload<T: Serialize>(topic: impl Into<String>, payload: &T) -> Result<Self> {
        Ok(Self::new(topic, serde_json::to_value(payload)?))
    }

    /// Deserializes the payload into a typed value.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Topic-based publish/subscribe facility.
///
/// # Design Rules
///
/// - `publish()` must be fast and non-blocking; delivery is best-effort
/// - Delivery is ordered per topic
/// - A subscription only sees events published after `subscribe()` returns
pub trait EventBus: Send + Sync {
    /// Publishes an event to every current subscriber of its topic.
    fn publish(&self, event: BusEvent);

    /// Subscribes to a single topic.
    fn subscribe(&self, topic: &str) -> BoxStream<'static, BusEvent>;
}

/// In-process bus with one broadcast channel per topic.
///
/// A topic's channel is created by its first subscription. A subscriber that falls more than
/// `capacity` events behind on its topic skips the overwritten events
/// instead of blocking publishers; traffic on other topics never counts
/// against it.
#[derive(Clone)]
pub struct InMemoryEventBus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<BusEvent>>>>,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of live subscriptions across all topics.
    pub fn subscriber_count(&self) -> usize {
        self.topics
            .lock()
            .map(|topics| topics.values().map(|s| s.receiver_count()).sum())
            .unwrap_or_default()
    }

    fn sender(&self, topic: &str) -> Option<broadcast::Sender<BusEvent>> {
        let mut topics = self.topics.lock().ok()?;
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Some(sender.clone())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, event: BusEvent) {
        // Topics nobody subscribed to have no channel yet.
        let sender = match self.topics.lock() {
            Ok(topics) => topics.get(&event.topic).cloned(),
            Err(_) => None,
        };
        if let Some(sender) = sender {
            // No live subscribers is not an error.
            let _ = sender.send(event);
        }
    }

    fn subscribe(&self, topic: &str) -> BoxStream<'static, BusEvent> {
        let Some(sender) = self.sender(topic) else {
            log::error!("Event bus lock poisoned, subscription to '{}' is empty", topic);
            return futures::stream::empty().boxed();
        };
        let topic = topic.to_string();
        BroadcastStream::new(sender.subscribe())
            .filter_map(move |event| {
                let topic = topic.clone();
                async move {
                    match event {
                        Ok(evt) => Some(evt),
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            log::warn!(
                                "Event bus subscriber on '{}' lagged, skipped {} event(s)",
                                topic,
                                skipped
                            );
                            None
                        }
                    }
                }
            })
            .boxed()
    }
}

/// Bus for tests and hosts that need to inspect what was published.
///
/// Records every published event and forwards it to an inner
/// [`InMemoryEventBus`] so subscriptions keep working.
#[derive(Clone, Default)]
pub struct RecordingEventBus {
    inner: InMemoryEventBus,
    events: Arc<Mutex<Vec<BusEvent>>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all published events.
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns published events on one topic.
    pub fn events_on(&self, topic: &str) -> Vec<BusEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.topic == topic)
            .collect()
    }

    /// Clears recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventBus for RecordingEventBus {
    fn publish(&self, event: BusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        self.inner.publish(event);
    }

    fn subscribe(&self, topic: &str) -> BoxStream<'static, BusEvent> {
        self.inner.subscribe(topic)
    }
}
