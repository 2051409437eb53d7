//! The tailer: single consumer cursor over the admin log.
//!
//! Reads batches in offset order, decodes, and fans records out into the
//! per-store queues. A record that fails to decode is a poison record: it is
//! counted, logged with its offset, and skipped, so one bad producer cannot
//! wedge the whole control plane.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::OperationCodec;
use crate::consumer::queue::OperationWrapper;
use crate::consumer::Shared;
use crate::core::LogOffset;
use crate::log::{LogError, LogStream};
use crate::metrics;

pub(crate) struct TailerConfig {
    pub batch_size: usize,
    pub poll_timeout: Duration,
    pub idle_sleep: Duration,
}

pub(crate) fn run_tailer_loop(
    mut stream: Box<dyn LogStream>,
    codec: Arc<dyn OperationCodec>,
    shared: Arc<Shared>,
    config: TailerConfig,
) {
    loop {
        if shared.stopped() {
            break;
        }
        if !shared.is_leader() {
            let epoch = shared.pause_epoch.load(Ordering::SeqCst);
            shared.tailer_parked_epoch.store(epoch, Ordering::SeqCst);
            std::thread::sleep(config.idle_sleep);
            continue;
        }

        // Leadership acquisition moves the cursor back to the durable
        // checkpoint; apply the seek before the next poll.
        let seek_to = shared.pending_seek.swap(0, Ordering::SeqCst);
        if seek_to != 0 {
            if let Err(err) = stream.seek(LogOffset(seek_to)) {
                warn!(offset = seek_to, error = %err, "log seek failed");
                shared.pending_seek.store(seek_to, Ordering::SeqCst);
                std::thread::sleep(config.idle_sleep);
                continue;
            }
            debug!(offset = seek_to, "tailer seeked to checkpointed offset");
        }

        let batch = match stream.poll(config.batch_size, config.poll_timeout) {
            Ok(batch) => batch,
            Err(LogError::Closed) => {
                warn!("admin log stream closed, stopping tailer");
                break;
            }
            Err(err) => {
                warn!(error = %err, "admin log poll failed");
                std::thread::sleep(config.idle_sleep);
                continue;
            }
        };

        for record in batch {
            if shared.stopped() {
                return;
            }
            match codec.decode(&record.payload) {
                Ok(op) => {
                    let store = op.store_key();
                    shared.queues.enqueue(
                        &store,
                        OperationWrapper::new(op, record.offset, record.broker_time_ms),
                    );
                }
                Err(err) => {
                    metrics::malformed_admin_record();
                    warn!(
                        offset = %record.offset,
                        error = %err,
                        "skipping malformed admin record"
                    );
                }
            }
            shared
                .tailer_cursor
                .store(record.offset.get() + 1, Ordering::SeqCst);
        }
        metrics::set_pending_admin_ops(shared.queues.total_pending());
    }
}
