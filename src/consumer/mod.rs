//! The admin consumption service: tailer, per-store queues, worker pool,
//! and the coordinator that gates everything on leadership.

pub mod coordinator;
pub mod dispatch;
pub mod queue;
mod tailer;
mod worker;

pub use coordinator::{AdminConsumer, AdminConsumerHandle, ConsumerDeps};
pub use queue::{OperationWrapper, QueueMap, StoreQueue};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::{AdminBackend, ControllerRole};
use crate::core::{ClusterName, ExecutionId, LogOffset, StoreName};
use crate::watermark::WatermarkStore;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// State shared between the coordinator, the tailer, and the workers.
pub(crate) struct Shared {
    pub cluster: ClusterName,
    pub role: ControllerRole,
    pub backend: Arc<dyn AdminBackend>,
    pub watermarks: Arc<dyn WatermarkStore>,
    pub queues: QueueMap,
    /// In-memory view of last succeeded execution ids; authoritative while
    /// this process leads, re-hydrated from the watermark store on every
    /// leadership acquisition.
    pub exec_ids: Mutex<HashMap<StoreName, ExecutionId>>,
    pub leader: AtomicBool,
    pub stop: AtomicBool,
    /// Next offset the tailer will hand to a queue.
    pub tailer_cursor: AtomicU64,
    /// Seek request for the tailer, set by the coordinator on leadership
    /// acquisition. Zero means none pending.
    pub pending_seek: AtomicU64,
    /// Bumped by the coordinator on every leadership loss. The tailer
    /// echoes it into `tailer_parked_epoch` once it has parked, which is
    /// the coordinator's proof that no stale batch is still being fanned
    /// out while it rebuilds the queues.
    pub pause_epoch: AtomicU64,
    pub tailer_parked_epoch: AtomicU64,
}

impl Shared {
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }

    /// Workers and the tailer make progress only while leading and not
    /// shutting down.
    pub fn active(&self) -> bool {
        !self.stopped() && self.is_leader()
    }

    pub fn cursor(&self) -> LogOffset {
        LogOffset(self.tailer_cursor.load(Ordering::SeqCst))
    }

    pub fn last_succeeded(&self, store: &StoreName) -> ExecutionId {
        let ids = self.exec_ids.lock().expect("exec id map lock poisoned");
        ids.get(store).copied().unwrap_or(ExecutionId::ZERO)
    }

    pub fn note_succeeded(&self, store: &StoreName, id: ExecutionId) {
        let mut ids = self.exec_ids.lock().expect("exec id map lock poisoned");
        let entry = ids.entry(store.clone()).or_insert(ExecutionId::ZERO);
        if id > *entry {
            *entry = id;
        }
    }
}
