//! Per-store work queues.
//!
//! One `StoreQueue` per store with pending operations: the tailer appends in
//! log order, the worker currently holding the lease drains from the head.
//! The head is examined, not removed, while its handler runs; removal is
//! atomic with reporting success.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::core::{AdminOperation, LogOffset, StoreName};

/// Runtime wrapper around a decoded operation.
///
/// `start_processing_ms` is stamped on the first dispatch attempt and
/// preserved across retries; `attempts` counts dispatch attempts.
#[derive(Clone, Debug)]
pub struct OperationWrapper {
    pub op: AdminOperation,
    pub offset: LogOffset,
    pub local_broker_time_ms: u64,
    pub start_processing_ms: Option<u64>,
    pub attempts: u32,
}

impl OperationWrapper {
    pub fn new(op: AdminOperation, offset: LogOffset, local_broker_time_ms: u64) -> Self {
        Self {
            op,
            offset,
            local_broker_time_ms,
            start_processing_ms: None,
            attempts: 0,
        }
    }
}

struct QueueInner {
    items: VecDeque<OperationWrapper>,
    leased: bool,
}

/// FIFO of pending operations for one store, with the single-flight lease
/// bit. Insertion order equals log offset order.
pub struct StoreQueue {
    store: StoreName,
    inner: Mutex<QueueInner>,
}

impl StoreQueue {
    fn new(store: StoreName) -> Self {
        Self {
            store,
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                leased: false,
            }),
        }
    }

    pub fn store(&self) -> &StoreName {
        &self.store
    }

    /// Append at the tail. Tailer-only.
    pub fn push(&self, wrapper: OperationWrapper) {
        let mut inner = self.inner.lock().expect("store queue lock poisoned");
        debug_assert!(
            inner
                .items
                .back()
                .map(|tail| tail.offset < wrapper.offset)
                .unwrap_or(true),
            "enqueue must preserve offset order"
        );
        inner.items.push_back(wrapper);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store queue lock poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn head_offset(&self) -> Option<LogOffset> {
        let inner = self.inner.lock().expect("store queue lock poisoned");
        inner.items.front().map(|w| w.offset)
    }

    /// Set the lease bit iff the queue is unleased and non-empty. The caller
    /// that wins the lease is the queue's only consumer until release.
    pub fn try_lease(&self) -> bool {
        let mut inner = self.inner.lock().expect("store queue lock poisoned");
        if inner.leased || inner.items.is_empty() {
            return false;
        }
        inner.leased = true;
        true
    }

    pub fn release_lease(&self) {
        let mut inner = self.inner.lock().expect("store queue lock poisoned");
        debug_assert!(inner.leased, "release without lease");
        inner.leased = false;
    }

    pub fn is_leased(&self) -> bool {
        self.inner.lock().expect("store queue lock poisoned").leased
    }

    /// Run `f` on the head in place. Lease-holder only; the closure runs
    /// under the queue lock, so it must not block.
    pub fn with_head<R>(&self, f: impl FnOnce(Option<&mut OperationWrapper>) -> R) -> R {
        let mut inner = self.inner.lock().expect("store queue lock poisoned");
        f(inner.items.front_mut())
    }

    /// Remove the head. Lease-holder only, after success or a durable skip.
    pub fn pop_head(&self) -> Option<OperationWrapper> {
        let mut inner = self.inner.lock().expect("store queue lock poisoned");
        inner.items.pop_front()
    }
}

/// All live queues, keyed by store.
///
/// Writers are the tailer (create + enqueue) and the coordinator (reap);
/// workers only read through the `Arc`s the coordinator hands them. The
/// enqueue path holds the map read lock across lookup *and* push so the
/// reaper (which takes the write lock) can never observe a queue between
/// "looked up" and "pushed into".
pub struct QueueMap {
    inner: RwLock<HashMap<StoreName, Arc<StoreQueue>>>,
}

impl QueueMap {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn enqueue(&self, store: &StoreName, wrapper: OperationWrapper) {
        {
            let map = self.inner.read().expect("queue map lock poisoned");
            if let Some(queue) = map.get(store) {
                queue.push(wrapper);
                return;
            }
        }
        let mut map = self.inner.write().expect("queue map lock poisoned");
        let queue = map
            .entry(store.clone())
            .or_insert_with(|| Arc::new(StoreQueue::new(store.clone())));
        queue.push(wrapper);
    }

    pub fn get(&self, store: &StoreName) -> Option<Arc<StoreQueue>> {
        let map = self.inner.read().expect("queue map lock poisoned");
        map.get(store).cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<StoreQueue>> {
        let map = self.inner.read().expect("queue map lock poisoned");
        map.values().cloned().collect()
    }

    /// Smallest head offset across non-empty queues, if any.
    pub fn min_head_offset(&self) -> Option<LogOffset> {
        let map = self.inner.read().expect("queue map lock poisoned");
        map.values().filter_map(|queue| queue.head_offset()).min()
    }

    pub fn total_pending(&self) -> usize {
        let map = self.inner.read().expect("queue map lock poisoned");
        map.values().map(|queue| queue.len()).sum()
    }

    /// Drop every queue. Coordinator-only, while no lease is outstanding
    /// and the tailer is paused; used when leadership is (re)acquired and
    /// pending work is rebuilt from the durable checkpoint.
    pub fn clear(&self) {
        let mut map = self.inner.write().expect("queue map lock poisoned");
        map.clear();
    }

    /// Drop queues that are empty and unleased. Coordinator cadence.
    pub fn reap_idle(&self) -> usize {
        let mut map = self.inner.write().expect("queue map lock poisoned");
        let before = map.len();
        map.retain(|_, queue| queue.is_leased() || !queue.is_empty());
        before - map.len()
    }
}

impl Default for QueueMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AdminPayload, ClusterName, ExecutionId, StoreTarget};

    fn wrapper(offset: u64, id: u64) -> OperationWrapper {
        let store = StoreName::new("s").unwrap();
        OperationWrapper::new(
            AdminOperation {
                execution_id: ExecutionId(id),
                producer_time_ms: 0,
                payload: AdminPayload::EnableStoreRead(StoreTarget {
                    cluster: ClusterName::new("c").unwrap(),
                    store,
                }),
            },
            LogOffset(offset),
            0,
        )
    }

    #[test]
    fn fifo_with_peek_then_pop() {
        let queue = StoreQueue::new(StoreName::new("s").unwrap());
        queue.push(wrapper(1, 1));
        queue.push(wrapper(2, 2));

        assert_eq!(queue.head_offset(), Some(LogOffset(1)));
        queue.with_head(|head| {
            let head = head.unwrap();
            head.attempts += 1;
        });
        // Peek did not remove.
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.with_head(|h| h.unwrap().attempts), 1);

        let popped = queue.pop_head().unwrap();
        assert_eq!(popped.offset, LogOffset(1));
        assert_eq!(queue.head_offset(), Some(LogOffset(2)));
    }

    #[test]
    fn lease_is_exclusive_and_requires_work() {
        let queue = StoreQueue::new(StoreName::new("s").unwrap());
        assert!(!queue.try_lease(), "empty queue must not lease");

        queue.push(wrapper(1, 1));
        assert!(queue.try_lease());
        assert!(!queue.try_lease(), "second lease must fail");
        queue.release_lease();
        assert!(queue.try_lease());
    }

    #[test]
    fn map_creates_on_first_record_and_reaps_idle() {
        let map = QueueMap::new();
        let store_a = StoreName::new("a").unwrap();
        let store_b = StoreName::new("b").unwrap();

        map.enqueue(&store_a, wrapper(1, 1));
        map.enqueue(&store_b, wrapper(2, 1));
        map.enqueue(&store_a, wrapper(3, 2));
        assert_eq!(map.total_pending(), 3);
        assert_eq!(map.min_head_offset(), Some(LogOffset(1)));

        let queue_a = map.get(&store_a).unwrap();
        queue_a.pop_head();
        queue_a.pop_head();
        assert_eq!(map.reap_idle(), 1);
        assert!(map.get(&store_a).is_none());
        assert!(map.get(&store_b).is_some());
    }

    #[test]
    fn leased_empty_queue_survives_reap() {
        let map = QueueMap::new();
        let store = StoreName::new("a").unwrap();
        map.enqueue(&store, wrapper(1, 1));
        let queue = map.get(&store).unwrap();
        assert!(queue.try_lease());
        queue.pop_head();
        assert_eq!(map.reap_idle(), 0);
        queue.release_lease();
        assert_eq!(map.reap_idle(), 1);
    }
}
