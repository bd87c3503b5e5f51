//! Event broadcast hub.
//!
//! Fan-out of controller events to any number of subscribers. Each
//! subscriber owns a bounded queue; when it falls behind, the oldest queued
//! event is discarded and counted, so a slow subscriber never blocks the
//! publisher or other subscribers.
//!
//! The subscriber registry sits behind a read-write lock: publishing only
//! takes the read side, subscribing and unsubscribing take the write side.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, PoisonError, RwLock, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tokio::sync::Notify;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Hub configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Events buffered per subscriber before the oldest is dropped. At
    /// least 1.
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

/// Broadcasts cloned events to every live subscription.
///
/// Cloning the hub yields another handle to the same subscriber set. When
/// the last handle is dropped, subscriptions drain what is queued and then
/// report closure.
pub struct EventHub<T> {
    inner: Arc<HubInner<T>>,
}

struct HubInner<T> {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<u64, Arc<Queue<T>>>>,
}

struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl<T> Queue<T> {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

impl<T: Clone> EventHub<T> {
    /// Create a hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                capacity: config.queue_capacity.max(1),
                next_id: AtomicU64::new(0),
                subscribers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a new subscriber. It only sees events published after this
    /// call.
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(Queue {
            items: Mutex::new(VecDeque::with_capacity(self.inner.capacity)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&queue));

        Subscription { id, queue, hub: Arc::downgrade(&self.inner) }
    }

    /// Deliver `event` to every subscriber. Returns how many received it.
    pub fn publish(&self, event: &T) -> usize {
        let subscribers = self.inner.subscribers.read().unwrap_or_else(PoisonError::into_inner);

        for queue in subscribers.values() {
            {
                let mut items = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
                if items.len() >= self.inner.capacity {
                    items.pop_front();
                    queue.dropped.fetch_add(1, Ordering::Relaxed);
                }
                items.push_back(event.clone());
            }
            queue.notify.notify_one();
        }

        subscribers.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<T: Clone> Default for EventHub<T> {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> std::fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub").field("capacity", &self.inner.capacity).finish_non_exhaustive()
    }
}

impl<T> Drop for HubInner<T> {
    fn drop(&mut self) {
        let subscribers = self.subscribers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for queue in subscribers.values() {
            queue.close();
        }
    }
}

/// Receiving end of an [`EventHub`].
///
/// Dropping it unregisters it from the hub.
pub struct Subscription<T> {
    id: u64,
    queue: Arc<Queue<T>>,
    hub: Weak<HubInner<T>>,
}

impl<T> Subscription<T> {
    /// Next queued event, without waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.queue.items.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the hub is gone and the queue is drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            if let Some(event) = self.try_recv() {
                return Some(event);
            }
            if self.queue.closed.load(Ordering::Acquire) {
                // An event may have raced the close
                return self.try_recv();
            }
            self.queue.notify.notified().await;
        }
    }

    /// Events discarded because this subscriber fell behind.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    /// Events currently queued.
    pub fn len(&self) -> usize {
        self.queue.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no event is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.subscribers.write().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}
