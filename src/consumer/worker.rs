//! Execution workers: drain one leased queue head-to-tail.
//!
//! A worker owns its queue exclusively while the lease is held. The head is
//! dispatched in place and only popped once its effect is durable (success
//! or a successfully-ignored unsupported operation). Retriable failures end
//! the drain cycle with the head intact; the coordinator reschedules the
//! queue after backoff.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use tracing::{error, info, warn};

use crate::backend::BackendError;
use crate::consumer::queue::StoreQueue;
use crate::consumer::{now_ms, Shared};
use crate::core::{AdminOperation, ExecutionId, LogOffset, StoreName};
use crate::error::{ExecError, FailureClass};
use crate::metrics;

use super::dispatch;

pub(crate) enum DrainOutcome {
    /// Queue fully drained.
    Drained,
    /// Leadership lost or shutdown requested; head untouched.
    Paused,
    /// Head failed with a transient error; retry after backoff.
    Retriable,
    /// Unrecoverable failure; the pool must halt.
    Fatal(ExecError),
}

pub(crate) struct WorkerReport {
    pub store: StoreName,
    pub outcome: DrainOutcome,
}

pub(crate) fn run_worker_loop(
    shared: Arc<Shared>,
    lease_rx: Receiver<Arc<StoreQueue>>,
    report_tx: Sender<WorkerReport>,
) {
    while let Ok(queue) = lease_rx.recv() {
        let outcome = drain(&shared, &queue);
        queue.release_lease();
        let report = WorkerReport {
            store: queue.store().clone(),
            outcome,
        };
        if report_tx.send(report).is_err() {
            break;
        }
    }
}

fn drain(shared: &Shared, queue: &StoreQueue) -> DrainOutcome {
    let store = queue.store();
    loop {
        if !shared.active() {
            return DrainOutcome::Paused;
        }
        let Some((op, offset, started_ms)) = stamp_head(queue) else {
            return DrainOutcome::Drained;
        };

        let last_succeeded = shared.last_succeeded(store);
        if op.execution_id <= last_succeeded {
            warn!(
                store = %store,
                offset = %offset,
                execution_id = %op.execution_id,
                last_succeeded = %last_succeeded,
                "execution id at or below last succeeded, skipping replayed operation"
            );
            metrics::duplicate_admin_op_skipped();
            queue.pop_head();
            continue;
        }

        match attempt(shared, &op) {
            Ok(()) => {
                queue.pop_head();
                let completed_ms = now_ms();
                metrics::admin_op_ok(
                    op.kind().as_str(),
                    ms_between(started_ms, completed_ms),
                    ms_between(op.producer_time_ms, completed_ms),
                );
            }
            Err(err) => match err.classify() {
                FailureClass::Retriable => {
                    metrics::failed_retriable_admin_consumption();
                    info!(
                        store = %store,
                        offset = %offset,
                        execution_id = %op.execution_id,
                        error = %err,
                        "retriable failure, keeping operation at queue head"
                    );
                    return DrainOutcome::Retriable;
                }
                // Ignorable is absorbed inside `attempt`; anything else
                // that reaches this arm halts the pool.
                FailureClass::Ignorable | FailureClass::Fatal => {
                    metrics::failed_admin_consumption();
                    error!(
                        store = %store,
                        offset = %offset,
                        execution_id = %op.execution_id,
                        error = %err,
                        "fatal failure processing admin operation"
                    );
                    return DrainOutcome::Fatal(err);
                }
            },
        }
    }
}

/// Dispatch the operation and commit its execution id. Unsupported
/// operations count as successfully ignored: the watermark still advances.
fn attempt(shared: &Shared, op: &AdminOperation) -> Result<(), ExecError> {
    match dispatch::execute(shared.role, shared.backend.as_ref(), op) {
        Ok(()) => {}
        Err(BackendError::Unsupported { reason }) => {
            info!(
                kind = %op.kind(),
                execution_id = %op.execution_id,
                reason,
                "ignoring unsupported operation"
            );
        }
        Err(err) => return Err(err.into()),
    }
    commit(shared, &op.store_key(), op.execution_id)?;
    Ok(())
}

fn commit(shared: &Shared, store: &StoreName, id: ExecutionId) -> Result<(), ExecError> {
    let applied = shared.watermarks.bump_exec_id(&shared.cluster, store, id)?;
    if !applied {
        // Stale CAS under single-flight means the id was already durable.
        warn!(store = %store, execution_id = %id, "execution id already recorded");
    }
    shared.note_succeeded(store, id);
    Ok(())
}

/// Stamp the head's first-attempt timestamp and bump its attempt counter,
/// returning what the drain loop needs outside the queue lock.
fn stamp_head(queue: &StoreQueue) -> Option<(AdminOperation, LogOffset, u64)> {
    queue.with_head(|head| {
        head.map(|wrapper| {
            let now = now_ms();
            if wrapper.start_processing_ms.is_none() {
                metrics::admin_op_start_latency(ms_between(wrapper.local_broker_time_ms, now));
            }
            let started = *wrapper.start_processing_ms.get_or_insert(now);
            wrapper.attempts += 1;
            (wrapper.op.clone(), wrapper.offset, started)
        })
    })
}

fn ms_between(earlier_ms: u64, later_ms: u64) -> u64 {
    later_ms.saturating_sub(earlier_ms)
}
