//! Metric emission for the consumer.
//!
//! Everything the consumer measures is a counter, a millisecond histogram,
//! or a gauge, so the sink trait is exactly those three calls. Without an
//! installed sink, emissions land as structured lines on the tracing target
//! `"metrics"`; tests install a capturing sink instead.

use std::sync::{Arc, RwLock};

/// Receives every metric the consumer emits. The only label in the schema
/// is the operation kind on completion counters.
pub trait MetricSink: Send + Sync {
    fn count(&self, name: &'static str, kind: Option<&'static str>);
    fn observe_ms(&self, name: &'static str, ms: u64);
    fn gauge(&self, name: &'static str, value: u64);
}

static SINK: RwLock<Option<Arc<dyn MetricSink>>> = RwLock::new(None);

pub fn set_sink(sink: Arc<dyn MetricSink>) {
    *SINK.write().expect("metrics sink lock poisoned") = Some(sink);
}

fn count(name: &'static str, kind: Option<&'static str>) {
    let guard = SINK.read().expect("metrics sink lock poisoned");
    match guard.as_deref() {
        Some(sink) => sink.count(name, kind),
        None => tracing::info!(target: "metrics", metric = name, kind, count = 1u64),
    }
}

fn observe_ms(name: &'static str, ms: u64) {
    let guard = SINK.read().expect("metrics sink lock poisoned");
    match guard.as_deref() {
        Some(sink) => sink.observe_ms(name, ms),
        None => tracing::info!(target: "metrics", metric = name, ms),
    }
}

fn gauge(name: &'static str, value: u64) {
    let guard = SINK.read().expect("metrics sink lock poisoned");
    match guard.as_deref() {
        Some(sink) => sink.gauge(name, value),
        None => tracing::info!(target: "metrics", metric = name, value),
    }
}

/// Delay between the broker accepting the record and a worker first
/// touching it.
pub fn admin_op_start_latency(ms: u64) {
    observe_ms("admin_op_start_latency", ms);
}

/// Handler wall time plus end-to-end latency for a completed operation.
pub fn admin_op_ok(kind: &'static str, process_ms: u64, total_ms: u64) {
    count("admin_op_ok", Some(kind));
    observe_ms("admin_op_process_latency", process_ms);
    observe_ms("admin_op_total_latency", total_ms);
}

pub fn failed_admin_consumption() {
    count("failed_admin_consumption", None);
}

pub fn failed_retriable_admin_consumption() {
    count("failed_retriable_admin_consumption", None);
}

pub fn malformed_admin_record() {
    count("malformed_admin_record", None);
}

pub fn duplicate_admin_op_skipped() {
    count("duplicate_admin_op_skipped", None);
}

pub fn set_pending_admin_ops(value: usize) {
    gauge("pending_admin_ops", value as u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestSink {
        events: Mutex<Vec<(&'static str, Option<&'static str>, u64)>>,
    }

    impl TestSink {
        fn names(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .expect("metrics lock")
                .iter()
                .map(|(name, _, _)| *name)
                .collect()
        }
    }

    impl MetricSink for TestSink {
        fn count(&self, name: &'static str, kind: Option<&'static str>) {
            self.events.lock().expect("metrics lock").push((name, kind, 1));
        }

        fn observe_ms(&self, name: &'static str, ms: u64) {
            self.events.lock().expect("metrics lock").push((name, None, ms));
        }

        fn gauge(&self, name: &'static str, value: u64) {
            self.events.lock().expect("metrics lock").push((name, None, value));
        }
    }

    #[test]
    fn routes_counters_histograms_and_gauges_to_the_sink() {
        let sink = Arc::new(TestSink::default());
        set_sink(sink.clone());

        admin_op_ok("STORE_CREATION", 3, 40);
        failed_retriable_admin_consumption();
        malformed_admin_record();
        set_pending_admin_ops(7);

        let events = sink.events.lock().expect("metrics lock");
        assert!(events.contains(&("admin_op_ok", Some("STORE_CREATION"), 1)));
        assert!(events.contains(&("admin_op_process_latency", None, 3)));
        assert!(events.contains(&("admin_op_total_latency", None, 40)));
        assert!(events.contains(&("pending_admin_ops", None, 7)));
        drop(events);

        let names = sink.names();
        assert!(names.contains(&"failed_retriable_admin_consumption"));
        assert!(names.contains(&"malformed_admin_record"));
    }
}
