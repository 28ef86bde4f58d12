//! WebSocket Broadcast Hub
//!
//! Owns the set of live subscribers and fans every published [`Update`] out
//! to each subscriber's bounded queue.
//!
//! The subscriber set sits behind a single mutex. It is held only while the
//! set is mutated or while `publish` walks it with non-blocking `try_send`
//! calls; delivery to the wire happens outside the lock, in each connection
//! handler.
//!
//! When a subscriber's queue is full the newest message is dropped for that
//! subscriber only (drop-newest). The publisher never waits on a slow viewer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use uuid::Uuid;

use super::messages::Update;

/// Unique identifier for a subscriber
pub type SubscriberId = Uuid;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber queue capacity
    pub buffer_capacity: usize,
    /// Deadline for a single write to a viewer's connection
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 20,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Hub-side half of a subscriber: the sending end of its queue
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    queue: mpsc::Sender<Update>,
    dropped: u64,
    saturated: bool,
}

impl Subscriber {
    /// Create a subscriber with an empty bounded queue
    ///
    /// Returns the subscriber and the receiving end of its queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Update>) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        let subscriber = Self {
            id: Uuid::new_v4(),
            queue,
            dropped: 0,
            saturated: false,
        };
        (subscriber, receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Messages dropped for this subscriber because its queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Outcome of a single `publish` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers whose queue accepted the message
    pub delivered: usize,
    /// Subscribers whose queue was full (message dropped for them)
    pub dropped: usize,
    /// Subscribers whose queue was closed (pruned from the set)
    pub closed: usize,
}

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub subscribers: usize,
    pub published: u64,
    pub dropped: u64,
}

/// Manages the live subscriber set and message fan-out
pub struct Hub {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    config: HubConfig,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl Hub {
    /// Create a new hub
    pub fn new(mut config: HubConfig) -> Self {
        config.buffer_capacity = config.buffer_capacity.max(1);

        Self {
            subscribers: Mutex::new(HashMap::new()),
            config,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn buffer_capacity(&self) -> usize {
        self.config.buffer_capacity
    }

    // A panic while the lock is held cannot leave the map half-mutated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscriber to the set
    ///
    /// The subscriber receives every `publish` that starts after this returns.
    pub fn register(&self, subscriber: Subscriber) {
        let id = subscriber.id;
        let count = {
            let mut subscribers = self.lock();
            subscribers.insert(id, subscriber);
            subscribers.len()
        };

        tracing::info!(subscriber_id = %id, subscribers = count, "Subscriber registered");
    }

    /// Remove a subscriber from the set
    ///
    /// Safe to call for unknown or already removed subscribers. Returns
    /// whether a subscriber was actually removed.
    pub fn unregister(&self, id: &SubscriberId) -> bool {
        let (removed, count) = {
            let mut subscribers = self.lock();
            let removed = subscribers.remove(id);
            (removed, subscribers.len())
        };

        match removed {
            Some(subscriber) => {
                tracing::info!(
                    subscriber_id = %id,
                    subscribers = count,
                    dropped = subscriber.dropped,
                    "Subscriber unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Create a subscriber and register it
    ///
    /// The returned [`Subscription`] unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (subscriber, queue) = Subscriber::new(self.config.buffer_capacity);
        let id = subscriber.id();
        self.register(subscriber);

        Subscription {
            id,
            queue,
            hub: Arc::clone(self),
        }
    }

    /// Offer a message to every registered subscriber
    ///
    /// Never blocks and never fails. Full queues drop the message for that
    /// subscriber; closed queues are pruned.
    pub fn publish(&self, update: Update) -> PublishReport {
        let mut report = PublishReport::default();

        {
            let mut subscribers = self.lock();
            subscribers.retain(|id, subscriber| {
                match subscriber.queue.try_send(update.clone()) {
                    Ok(()) => {
                        if subscriber.saturated {
                            subscriber.saturated = false;
                            tracing::debug!(subscriber_id = %id, "Subscriber queue drained");
                        }
                        report.delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        subscriber.dropped += 1;
                        report.dropped += 1;
                        if subscriber.saturated {
                            tracing::debug!(
                                subscriber_id = %id,
                                dropped = subscriber.dropped,
                                "Subscriber queue still full, dropping update"
                            );
                        } else {
                            subscriber.saturated = true;
                            tracing::warn!(
                                subscriber_id = %id,
                                capacity = self.config.buffer_capacity,
                                "Subscriber queue full, dropping update"
                            );
                        }
                        true
                    }
                    Err(TrySendError::Closed(_)) => {
                        report.closed += 1;
                        tracing::debug!(subscriber_id = %id, "Subscriber queue closed, pruning");
                        false
                    }
                }
            });
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        self.dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        tracing::trace!(
            bytes = update.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            closed = report.closed,
            "Published update"
        );

        report
    }

    /// Get the current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Check whether a subscriber is currently registered
    pub fn is_registered(&self, id: &SubscriberId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Handler-side half of a registered subscriber
///
/// Owns the receiving end of the queue. Dropping it unregisters the
/// subscriber from the hub, on every exit path including unwinding.
pub struct Subscription {
    id: SubscriberId,
    queue: mpsc::Receiver<Update>,
    hub: Arc<Hub>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next queued update
    ///
    /// Returns `None` once the hub has dropped this subscriber and the queue
    /// is drained. Cancel safe.
    pub async fn recv(&mut self) -> Option<Update> {
        self.queue.recv().await
    }

    /// Take the next queued update without waiting
    pub fn try_recv(&mut self) -> Option<Update> {
        match self.queue.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub_with_capacity(buffer_capacity: usize) -> Arc<Hub> {
        Arc::new(Hub::new(HubConfig {
            buffer_capacity,
            ..Default::default()
        }))
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.buffer_capacity, 20);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let hub = hub_with_capacity(0);
        assert_eq!(hub.buffer_capacity(), 1);

        let mut sub = hub.subscribe();
        assert_eq!(hub.publish(Update::from("x")).delivered, 1);
        assert_eq!(sub.try_recv(), Some(Update::from("x")));
    }

    #[test]
    fn test_register_unregister() {
        let hub = hub_with_capacity(4);
        let (subscriber, _queue) = Subscriber::new(4);
        let id = subscriber.id();

        hub.register(subscriber);
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_registered(&id));

        assert!(hub.unregister(&id));
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.is_registered(&id));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let hub = hub_with_capacity(4);
        let mut sub = hub.subscribe();
        let id = sub.id();

        assert!(hub.unregister(&id));
        assert!(!hub.unregister(&id));
        assert!(!hub.unregister(&Uuid::new_v4()));

        // No further messages once removed
        let report = hub.publish(Update::from("late"));
        assert_eq!(report, PublishReport::default());
        assert_eq!(sub.try_recv(), None);

        // Dropping the subscription after explicit removal is a no-op
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_fan_out_reaches_every_subscriber_once() {
        let hub = hub_with_capacity(8);
        let mut subs: Vec<_> = (0..5).map(|_| hub.subscribe()).collect();

        let report = hub.publish(Update::from("m"));
        assert_eq!(report.delivered, 5);
        assert_eq!(report.dropped, 0);

        for sub in subs.iter_mut() {
            assert_eq!(sub.try_recv(), Some(Update::from("m")));
            assert_eq!(sub.try_recv(), None);
        }
    }

    #[test]
    fn test_per_subscriber_ordering() {
        let hub = hub_with_capacity(8);
        let mut sub = hub.subscribe();

        hub.publish(Update::from("m1"));
        hub.publish(Update::from("m2"));

        assert_eq!(sub.try_recv(), Some(Update::from("m1")));
        assert_eq!(sub.try_recv(), Some(Update::from("m2")));
    }

    #[test]
    fn test_registration_visible_to_next_publish() {
        let hub = hub_with_capacity(8);
        let mut early = hub.subscribe();

        hub.publish(Update::from("before"));
        let mut late = hub.subscribe();
        hub.publish(Update::from("after"));

        assert_eq!(early.try_recv(), Some(Update::from("before")));
        assert_eq!(early.try_recv(), Some(Update::from("after")));
        // No backfill for late subscribers
        assert_eq!(late.try_recv(), Some(Update::from("after")));
        assert_eq!(late.try_recv(), None);
    }

    #[test]
    fn test_full_queue_drops_newest_and_isolates() {
        let hub = hub_with_capacity(2);
        let mut stalled = hub.subscribe();
        let mut healthy = hub.subscribe();

        for msg in ["1", "2"] {
            hub.publish(Update::from(msg));
            healthy.try_recv();
        }

        // stalled queue is now full
        let report = hub.publish(Update::from("3"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(healthy.try_recv(), Some(Update::from("3")));

        // Oldest messages are kept, the newest one was dropped
        assert_eq!(stalled.try_recv(), Some(Update::from("1")));
        assert_eq!(stalled.try_recv(), Some(Update::from("2")));
        assert_eq!(stalled.try_recv(), None);

        // Room again: delivery resumes
        let report = hub.publish(Update::from("4"));
        assert_eq!(report.delivered, 2);
        assert_eq!(stalled.try_recv(), Some(Update::from("4")));

        let stats = hub.stats();
        assert_eq!(stats.published, 4);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.subscribers, 2);
    }

    #[test]
    fn test_dropped_subscription_unregisters() {
        let hub = hub_with_capacity(4);
        let sub = hub.subscribe();
        let id = sub.id();
        assert!(hub.is_registered(&id));

        drop(sub);
        assert!(!hub.is_registered(&id));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_closed_queue_pruned_on_publish() {
        let hub = hub_with_capacity(4);
        let (subscriber, queue) = Subscriber::new(4);
        hub.register(subscriber);
        drop(queue);

        let report = hub.publish(Update::from("x"));
        assert_eq!(report.closed, 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_subscription_sees_end_of_queue() {
        let hub = hub_with_capacity(4);
        let mut sub = hub.subscribe();
        hub.publish(Update::from("last"));
        hub.unregister(&sub.id());

        assert_eq!(sub.recv().await, Some(Update::from("last")));
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_unregister_after_panic_in_handler() {
        let hub = hub_with_capacity(4);
        let hub_for_task = Arc::clone(&hub);

        let result = std::thread::spawn(move || {
            let _sub = hub_for_task.subscribe();
            panic!("handler blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_publish_and_register() {
        let hub = hub_with_capacity(64);
        let mut handles = Vec::new();

        for _ in 0..8 {
            let hub = Arc::clone(&hub);
            handles.push(tokio::spawn(async move {
                let mut sub = hub.subscribe();
                let mut seen = 0;
                while tokio::time::timeout(Duration::from_millis(200), sub.recv())
                    .await
                    .ok()
                    .flatten()
                    .is_some()
                {
                    seen += 1;
                }
                seen
            }));
        }

        while hub.subscriber_count() < 8 {
            tokio::task::yield_now().await;
        }
        for i in 0..32 {
            hub.publish(Update::from(format!("{}", i)));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 32);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }
}
