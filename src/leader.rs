//! Leadership gate.
//!
//! Election itself happens in an external coordination service; the core
//! only polls whether this process currently leads the cluster. Everything
//! (tailer, workers, checkpointing) stalls while it does not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::ClusterName;

pub trait LeaderOracle: Send + Sync {
    fn is_leader(&self, cluster: &ClusterName) -> bool;
}

/// Oracle backed by a shared flag. Production wires the election service's
/// callback to `set_leader`; tests flip it directly to exercise the gate.
#[derive(Clone, Default)]
pub struct StaticLeaderOracle {
    leader: Arc<AtomicBool>,
}

impl StaticLeaderOracle {
    pub fn new(leader: bool) -> Self {
        Self {
            leader: Arc::new(AtomicBool::new(leader)),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
}

impl LeaderOracle for StaticLeaderOracle {
    fn is_leader(&self, _cluster: &ClusterName) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}
