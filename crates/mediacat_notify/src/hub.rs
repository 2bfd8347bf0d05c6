//! Process-wide fan-out hub for registry mutation events.

use crate::ChangeEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Fan-out hub holding the set of currently open observer channels.
///
/// Cloning is cheap; all clones share the same channel set. The hub
/// supports concurrent `publish` from mutation paths while channels are
/// added and removed. Delivery is FIFO per channel; there is no ordering
/// guarantee across observers.
///
/// # Example
///
/// ```
/// use mediacat_notify::{ChangeEvent, ChangeHub};
///
/// # async fn example() {
/// let hub = ChangeHub::new();
/// let mut sub = hub.subscribe();
///
/// hub.publish(ChangeEvent::Ping);
///
/// assert_eq!(sub.recv().await, Some(ChangeEvent::Connected));
/// assert_eq!(sub.recv().await, Some(ChangeEvent::Ping));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

#[derive(Debug)]
struct HubInner {
    channels: Mutex<HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>>,
    next_id: AtomicU64,
}

/// A registered observer channel.
///
/// Dropping the subscription unregisters it from the hub; the hub also
/// prunes the channel opportunistically if a send fails first.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: ChangeHub,
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new observer channel.
    ///
    /// A [`ChangeEvent::Connected`] message is enqueued immediately so the
    /// observer can confirm the stream is live.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        // Cannot fail: we still hold the receiver.
        let _ = sender.send(ChangeEvent::Connected);

        let mut channels = self.inner.channels.lock().unwrap();
        channels.insert(id, sender);
        tracing::debug!(id, observers = channels.len(), "Observer subscribed");
        drop(channels);

        Subscription {
            id,
            hub: self.clone(),
            receiver,
        }
    }

    /// Remove an observer channel explicitly.
    pub fn unsubscribe(&self, id: u64) {
        let mut channels = self.inner.channels.lock().unwrap();
        if channels.remove(&id).is_some() {
            tracing::debug!(id, observers = channels.len(), "Observer unsubscribed");
        }
    }

    /// Fan an event out to every currently registered channel.
    ///
    /// A channel whose send fails (observer disconnected) is unregistered
    /// instead of surfacing an error; `publish` itself never fails.
    pub fn publish(&self, event: ChangeEvent) {
        let mut channels = self.inner.channels.lock().unwrap();
        let mut dead = Vec::new();

        for (id, sender) in channels.iter() {
            if sender.send(event.clone()).is_err() {
                dead.push(*id);
            }
        }

        for id in &dead {
            channels.remove(id);
        }
        if !dead.is_empty() {
            tracing::debug!(
                pruned = dead.len(),
                observers = channels.len(),
                "Pruned dead observer channels"
            );
        }
    }

    /// Number of currently registered observer channels.
    pub fn subscriber_count(&self) -> usize {
        self.inner.channels.lock().unwrap().len()
    }

    /// Spawn the periodic keepalive task.
    ///
    /// Publishes [`ChangeEvent::Ping`] on every open channel at `interval`,
    /// which both defeats idle-timeout teardown by intermediaries and
    /// prunes channels whose observers vanished without unsubscribing.
    pub fn spawn_keepalive(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so observers get
            // their first ping one full interval after connecting.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if hub.subscriber_count() > 0 {
                    hub.publish(ChangeEvent::Ping);
                }
            }
        })
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// The hub-assigned channel id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event, or `None` once the hub dropped this channel.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Receive without waiting; `None` when no event is queued.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_confirms_connection() {
        let hub = ChangeHub::new();
        let mut sub = hub.subscribe();
        assert_eq!(sub.recv().await, Some(ChangeEvent::Connected));
    }

    #[tokio::test]
    async fn test_fanout_reaches_all_subscribers() {
        let hub = ChangeHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(ChangeEvent::Upload {
            file: json!({"id": "1"}),
        });

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(ChangeEvent::Connected));
            assert!(matches!(sub.recv().await, Some(ChangeEvent::Upload { .. })));
        }
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = ChangeHub::new();
        let a = hub.subscribe();
        let _b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_prunes_dead_channels() {
        let hub = ChangeHub::new();
        let mut live = hub.subscribe();

        // A channel whose receiver vanished without unsubscribing.
        let (dead_sender, dead_receiver) = mpsc::unbounded_channel();
        drop(dead_receiver);
        hub.inner.channels.lock().unwrap().insert(999, dead_sender);
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(ChangeEvent::Ping);

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(live.recv().await, Some(ChangeEvent::Connected));
        assert_eq!(live.recv().await, Some(ChangeEvent::Ping));

        // A second publish no longer targets the pruned channel and
        // still does not error.
        hub.publish(ChangeEvent::Ping);
        assert_eq!(live.recv().await, Some(ChangeEvent::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_open_channels() {
        let hub = ChangeHub::new();
        let mut sub = hub.subscribe();
        let task = hub.spawn_keepalive(Duration::from_secs(30));

        assert_eq!(sub.recv().await, Some(ChangeEvent::Connected));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(sub.recv().await, Some(ChangeEvent::Ping));

        task.abort();
    }
}
