//! The coordinator: owns the worker pool and the tailer, gates everything on
//! leadership, schedules unleased queues, applies per-store backoff, and
//! checkpoints the global safe offset.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::backend::AdminBackend;
use crate::codec::OperationCodec;
use crate::config::{Config, ConsumerConfig};
use crate::consumer::queue::{QueueMap, StoreQueue};
use crate::consumer::tailer::{run_tailer_loop, TailerConfig};
use crate::consumer::worker::{run_worker_loop, DrainOutcome, WorkerReport};
use crate::consumer::Shared;
use crate::core::{LogOffset, StoreName};
use crate::error::Error;
use crate::leader::LeaderOracle;
use crate::log::LogStream;
use crate::watermark::{WatermarkError, WatermarkStore};

/// Everything the consumer core borrows from the rest of the controller.
pub struct ConsumerDeps {
    pub log: Box<dyn LogStream>,
    pub codec: Arc<dyn OperationCodec>,
    pub backend: Arc<dyn AdminBackend>,
    pub leader: Arc<dyn LeaderOracle>,
    pub watermarks: Arc<dyn WatermarkStore>,
}

/// The admin consumption service. `spawn` starts the tailer, the worker
/// pool, and the coordinator thread; the returned handle joins them all.
pub struct AdminConsumer;

impl AdminConsumer {
    pub fn spawn(config: Config, deps: ConsumerDeps) -> AdminConsumerHandle {
        let consumer_cfg = config.consumer.clone();
        let shared = Arc::new(Shared {
            cluster: config.cluster,
            role: config.role,
            backend: deps.backend,
            watermarks: deps.watermarks,
            queues: QueueMap::new(),
            exec_ids: std::sync::Mutex::new(HashMap::new()),
            leader: std::sync::atomic::AtomicBool::new(false),
            stop: std::sync::atomic::AtomicBool::new(false),
            tailer_cursor: std::sync::atomic::AtomicU64::new(1),
            pending_seek: std::sync::atomic::AtomicU64::new(0),
            pause_epoch: std::sync::atomic::AtomicU64::new(1),
            tailer_parked_epoch: std::sync::atomic::AtomicU64::new(0),
        });

        let (lease_tx, lease_rx) = unbounded::<Arc<StoreQueue>>();
        let (report_tx, report_rx) = unbounded::<WorkerReport>();

        let mut worker_handles = Vec::new();
        for _ in 0..consumer_cfg.worker_pool_size.max(1) {
            let shared = Arc::clone(&shared);
            let lease_rx = lease_rx.clone();
            let report_tx = report_tx.clone();
            worker_handles.push(std::thread::spawn(move || {
                run_worker_loop(shared, lease_rx, report_tx);
            }));
        }
        drop(lease_rx);
        drop(report_tx);

        let tailer_handle = {
            let shared = Arc::clone(&shared);
            let tailer_cfg = TailerConfig {
                batch_size: consumer_cfg.poll_batch_size.max(1),
                poll_timeout: Duration::from_millis(consumer_cfg.poll_interval_ms),
                idle_sleep: Duration::from_millis(consumer_cfg.poll_interval_ms.max(1)),
            };
            let log = deps.log;
            let codec = deps.codec;
            std::thread::spawn(move || {
                run_tailer_loop(log, codec, shared, tailer_cfg);
            })
        };

        let coordinator = Coordinator {
            shared: Arc::clone(&shared),
            oracle: deps.leader,
            config: consumer_cfg,
            lease_tx: Some(lease_tx),
            report_rx,
            backoff: HashMap::new(),
            last_checkpoint_at: Instant::now(),
            last_written_offset: LogOffset::ZERO,
            worker_handles,
            tailer_handle: Some(tailer_handle),
            was_leader: false,
            fatal: None,
        };
        let control = std::thread::spawn(move || coordinator.run());

        AdminConsumerHandle {
            shared,
            control: Some(control),
        }
    }
}

pub struct AdminConsumerHandle {
    shared: Arc<Shared>,
    control: Option<JoinHandle<Result<(), Error>>>,
}

impl AdminConsumerHandle {
    /// Operations decoded but not yet executed.
    pub fn pending_ops(&self) -> usize {
        self.shared.queues.total_pending()
    }

    /// Whether the consumer halted on its own (fatal failure or log end).
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped()
    }

    /// Stop accepting records, let in-flight handlers finish, flush the
    /// final checkpoint, and join every thread.
    pub fn shutdown(mut self) -> Result<(), Error> {
        self.shared.stop.store(true, Ordering::SeqCst);
        match self.control.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            },
            None => Ok(()),
        }
    }
}

struct BackoffState {
    attempts: u32,
    until: Instant,
}

struct Coordinator {
    shared: Arc<Shared>,
    oracle: Arc<dyn LeaderOracle>,
    config: ConsumerConfig,
    lease_tx: Option<Sender<Arc<StoreQueue>>>,
    report_rx: Receiver<WorkerReport>,
    backoff: HashMap<StoreName, BackoffState>,
    last_checkpoint_at: Instant,
    last_written_offset: LogOffset,
    worker_handles: Vec<JoinHandle<()>>,
    tailer_handle: Option<JoinHandle<()>>,
    was_leader: bool,
    fatal: Option<Error>,
}

impl Coordinator {
    fn run(mut self) -> Result<(), Error> {
        let cycle = Duration::from_millis(self.config.cycle_interval_ms.max(1));
        loop {
            match self.report_rx.recv_timeout(cycle) {
                Ok(report) => {
                    self.handle_report(report);
                    while let Ok(report) = self.report_rx.try_recv() {
                        self.handle_report(report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.shared.stopped() || self.fatal.is_some() {
                break;
            }
            self.tick();
        }
        self.teardown()
    }

    fn tick(&mut self) {
        if !self.oracle.is_leader(&self.shared.cluster) {
            if self.was_leader {
                info!(cluster = %self.shared.cluster, "leadership lost, pausing admin consumption");
                self.shared.pause_epoch.fetch_add(1, Ordering::SeqCst);
            }
            self.was_leader = false;
            self.shared.leader.store(false, Ordering::SeqCst);
            return;
        }

        if !self.was_leader {
            if !self.try_activate_leadership() {
                return;
            }
            self.was_leader = true;
        }

        self.dispatch();
        self.maybe_checkpoint();
        self.shared.queues.reap_idle();
    }

    /// Become active: wait for every lease to come back, rebuild the
    /// execution-id view and the queues from durable state, and point the
    /// tailer at the checkpointed offset. Until this succeeds the process
    /// holds leadership without consuming.
    fn try_activate_leadership(&mut self) -> bool {
        // Both the workers (leases) and the tailer (park handshake) must be
        // quiescent before the queues and the execution-id view are rebuilt.
        let queues = self.shared.queues.snapshot();
        if queues.iter().any(|queue| queue.is_leased()) {
            return false;
        }
        let pause_epoch = self.shared.pause_epoch.load(Ordering::SeqCst);
        if self.shared.tailer_parked_epoch.load(Ordering::SeqCst) != pause_epoch {
            return false;
        }

        let offset = match self.shared.watermarks.read_offset(&self.shared.cluster) {
            Ok(offset) => offset,
            Err(err) => {
                warn!(error = %err, "failed to read checkpointed offset, retrying");
                return false;
            }
        };
        let exec_ids = match self.shared.watermarks.read_exec_ids(&self.shared.cluster) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "failed to read execution ids, retrying");
                return false;
            }
        };

        {
            let mut map = self.shared.exec_ids.lock().expect("exec id map lock poisoned");
            map.clear();
            map.extend(exec_ids);
        }
        self.shared.queues.clear();
        self.backoff.clear();

        let resume = offset.map(LogOffset::next).unwrap_or(LogOffset(1));
        self.last_written_offset = offset.unwrap_or(LogOffset::ZERO);
        self.shared
            .tailer_cursor
            .store(resume.get(), Ordering::SeqCst);
        self.shared.pending_seek.store(resume.get(), Ordering::SeqCst);
        self.shared.leader.store(true, Ordering::SeqCst);
        info!(
            cluster = %self.shared.cluster,
            resume_offset = %resume,
            "leadership acquired, admin consumption active"
        );
        true
    }

    /// Hand every non-empty, unleased, non-backed-off queue to an idle
    /// worker. The lease is taken here so no queue is ever sent twice.
    fn dispatch(&mut self) {
        let Some(lease_tx) = &self.lease_tx else {
            return;
        };
        let now = Instant::now();
        for queue in self.shared.queues.snapshot() {
            if let Some(backoff) = self.backoff.get(queue.store()) {
                if backoff.until > now {
                    continue;
                }
            }
            if queue.try_lease() {
                if lease_tx.send(queue).is_err() {
                    break;
                }
            }
        }
    }

    fn handle_report(&mut self, report: WorkerReport) {
        match report.outcome {
            DrainOutcome::Drained => {
                self.backoff.remove(&report.store);
            }
            DrainOutcome::Paused => {}
            DrainOutcome::Retriable => {
                let backoff = self.backoff.entry(report.store.clone()).or_insert(BackoffState {
                    attempts: 0,
                    until: Instant::now(),
                });
                backoff.attempts += 1;
                let delay = backoff_delay(&self.config, backoff.attempts);
                backoff.until = Instant::now() + delay;
                debug!(
                    store = %report.store,
                    attempts = backoff.attempts,
                    delay_ms = delay.as_millis() as u64,
                    "store backed off after retriable failure"
                );
            }
            DrainOutcome::Fatal(err) => {
                error!(store = %report.store, error = %err, "halting admin consumption");
                self.fatal = Some(err.into());
                self.shared.stop.store(true, Ordering::SeqCst);
            }
        }
    }

    fn maybe_checkpoint(&mut self) {
        let interval = Duration::from_millis(self.config.checkpoint_interval_ms);
        if self.last_checkpoint_at.elapsed() < interval {
            return;
        }
        self.last_checkpoint_at = Instant::now();
        self.write_safe_offset();
    }

    /// Every record at or below the safe offset has been executed, skipped
    /// as a duplicate, or durably ignored; nothing in flight sits below it.
    fn safe_offset(&self) -> Option<LogOffset> {
        // Read the cursor before the queue heads: a record enqueued after
        // the cursor snapshot can only raise the minimum, never lower it.
        let cursor = self.shared.cursor();
        let candidate = match self.shared.queues.min_head_offset() {
            Some(head) => head.prev(),
            None => cursor.prev(),
        };
        candidate.filter(|offset| offset.get() >= 1)
    }

    fn write_safe_offset(&mut self) {
        let Some(safe) = self.safe_offset() else {
            return;
        };
        if safe <= self.last_written_offset {
            return;
        }
        match self.shared.watermarks.write_offset(&self.shared.cluster, safe) {
            Ok(()) => {
                self.last_written_offset = safe;
                debug!(offset = %safe, "checkpointed admin log offset");
            }
            Err(err @ WatermarkError::Regression { .. }) => {
                error!(error = %err, "offset checkpoint regressed, halting");
                self.fatal = Some(err.into());
                self.shared.stop.store(true, Ordering::SeqCst);
            }
            Err(err) => {
                warn!(error = %err, "offset checkpoint failed, will retry");
            }
        }
    }

    fn teardown(mut self) -> Result<(), Error> {
        self.shared.stop.store(true, Ordering::SeqCst);

        // Disconnect the lease channel so idle workers wake up and exit;
        // busy workers finish their current drain first.
        self.lease_tx = None;
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
        if let Some(handle) = self.tailer_handle.take() {
            let _ = handle.join();
        }

        // Workers are joined: every completed operation is out of its
        // queue, so one last safe-offset write captures all progress.
        if self.shared.is_leader() && self.fatal.is_none() {
            self.write_safe_offset();
        }

        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn backoff_delay(config: &ConsumerConfig, attempts: u32) -> Duration {
    let base = config.backoff_base_ms.max(1);
    let max = config.backoff_max_ms.max(base);
    let exp = attempts.saturating_sub(1).min(16);
    let ms = base.saturating_mul(1u64 << exp).min(max);
    let jitter = rand::rng().random_range(0..=base / 2);
    Duration::from_millis(ms.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(base: u64, max: u64) -> ConsumerConfig {
        ConsumerConfig {
            backoff_base_ms: base,
            backoff_max_ms: max,
            ..ConsumerConfig::default()
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let config = config_with(100, 1_000);
        // Jitter is bounded by base/2, so check windows rather than exact
        // values.
        let first = backoff_delay(&config, 1).as_millis() as u64;
        assert!((100..=150).contains(&first), "first delay {first}");

        let third = backoff_delay(&config, 3).as_millis() as u64;
        assert!((400..=450).contains(&third), "third delay {third}");

        let huge = backoff_delay(&config, 30).as_millis() as u64;
        assert!((1_000..=1_050).contains(&huge), "capped delay {huge}");
    }

    #[test]
    fn backoff_tolerates_zero_base() {
        let config = config_with(0, 0);
        let delay = backoff_delay(&config, 5);
        assert!(delay.as_millis() <= 2);
    }
}
