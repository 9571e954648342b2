//! Health stream.
//!
//! Broadcasts every aggregate recomputation to the observers subscribed at
//! push time. There is no replay: a late observer only sees later pushes.
//! The latest snapshot is kept separately for synchronous reads.
//!
//! Fan-out is bounded. An observer that falls more than `capacity` snapshots
//! behind skips the oldest ones; producers never wait on observers.

use futures::stream::{BoxStream, StreamExt};
use log::{debug, warn};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use super::errors::HealthError;
use super::model::AggregateSnapshot;

pub(crate) struct HealthStream {
    capacity: usize,
    sender: Mutex<Option<broadcast::Sender<AggregateSnapshot>>>,
    latest: watch::Sender<AggregateSnapshot>,
}

impl HealthStream {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        let (latest, _latest_rx) = watch::channel(AggregateSnapshot::empty());
        Self {
            capacity: capacity.max(1),
            sender: Mutex::new(Some(sender)),
            latest,
        }
    }

    /// Records `snapshot` as latest and delivers it to current observers.
    pub fn push(&self, snapshot: AggregateSnapshot) {
        self.latest.send_replace(snapshot.clone());
        if let Some(sender) = self.lock_sender().as_ref() {
            // No observers is fine.
            let _ = sender.send(snapshot);
        }
    }

    /// Replaces the latest snapshot without notifying observers.
    pub fn set_latest(&self, snapshot: AggregateSnapshot) {
        self.latest.send_replace(snapshot);
    }

    pub fn latest(&self) -> AggregateSnapshot {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> Result<HealthSubscription, HealthError> {
        match self.lock_sender().as_ref() {
            Some(sender) => Ok(HealthSubscription {
                receiver: sender.subscribe(),
            }),
            None => Err(HealthError::StreamClosed),
        }
    }

    /// Closes the stream. Current observers see the end of the stream.
    ///
    /// Safe to call repeatedly.
    pub fn close(&self) {
        if self.lock_sender().take().is_some() {
            debug!("Health stream closed");
        }
    }

    /// Opens a fresh channel if the stream was closed.
    pub fn reopen(&self) {
        let mut sender = self.lock_sender();
        if sender.is_none() {
            let (tx, _rx) = broadcast::channel(self.capacity);
            *sender = Some(tx);
            debug!("Health stream reopened");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock_sender()
            .as_ref()
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn lock_sender(&self) -> MutexGuard<'_, Option<broadcast::Sender<AggregateSnapshot>>> {
        // The guarded value stays consistent even if a holder panicked.
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Live subscription to the health stream.
pub struct HealthSubscription {
    receiver: broadcast::Receiver<AggregateSnapshot>,
}

impl HealthSubscription {
    /// Waits for the next snapshot.
    ///
    /// Skips snapshots lost to lag. Returns `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<AggregateSnapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Health observer lagged, skipped {} snapshot(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a snapshot if one is already queued.
    pub fn try_recv(&mut self) -> Option<AggregateSnapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Adapts the subscription into a `Stream`, dropping lagged snapshots.
    pub fn into_stream(self) -> BoxStream<'static, AggregateSnapshot> {
        BroadcastStream::new(self.receiver)
            .filter_map(|item| async move {
                match item {
                    Ok(snapshot) => Some(snapshot),
                    Err(BroadcastStreamRecvError::Lagged(_)) => None,
                }
            })
            .boxed()
    }
}
