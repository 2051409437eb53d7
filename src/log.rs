//! The admin log as seen by this core: an ordered stream of raw records.
//!
//! The durable log itself (partitions, producers, replication) lives outside
//! this crate; `LogStream` is the single-consumer cursor the tailer drives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::core::LogOffset;

/// One record as handed to the tailer: position, broker-assigned timestamp,
/// opaque payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    pub offset: LogOffset,
    pub broker_time_ms: u64,
    pub payload: Bytes,
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log stream closed")]
    Closed,
    #[error("log read failed: {reason}")]
    Read { reason: String },
}

/// Single-consumer view of the admin log.
///
/// `poll` returns records in strictly increasing offset order starting at
/// the seek position, blocking up to `timeout` when the log is caught up.
pub trait LogStream: Send {
    fn seek(&mut self, offset: LogOffset) -> Result<(), LogError>;
    fn poll(&mut self, max_records: usize, timeout: Duration) -> Result<Vec<RawRecord>, LogError>;
}

/// In-memory admin log for tests and tools. Producers append through the
/// shared handle; `stream()` opens a consumer cursor at the start.
#[derive(Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<Vec<RawRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload; offsets are assigned densely starting at 1.
    pub fn append(&self, broker_time_ms: u64, payload: Bytes) -> LogOffset {
        let mut records = self.inner.lock().expect("memory log lock poisoned");
        let offset = LogOffset(records.len() as u64 + 1);
        records.push(RawRecord {
            offset,
            broker_time_ms,
            payload,
        });
        offset
    }

    pub fn end_offset(&self) -> LogOffset {
        let records = self.inner.lock().expect("memory log lock poisoned");
        LogOffset(records.len() as u64)
    }

    pub fn stream(&self) -> MemoryLogStream {
        MemoryLogStream {
            inner: Arc::clone(&self.inner),
            cursor: LogOffset(1),
        }
    }
}

pub struct MemoryLogStream {
    inner: Arc<Mutex<Vec<RawRecord>>>,
    cursor: LogOffset,
}

impl LogStream for MemoryLogStream {
    fn seek(&mut self, offset: LogOffset) -> Result<(), LogError> {
        self.cursor = offset;
        Ok(())
    }

    fn poll(&mut self, max_records: usize, timeout: Duration) -> Result<Vec<RawRecord>, LogError> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            {
                let records = self.inner.lock().expect("memory log lock poisoned");
                let start = (self.cursor.get().max(1) - 1) as usize;
                if start < records.len() {
                    let end = (start + max_records).min(records.len());
                    let batch = records[start..end].to_vec();
                    self.cursor = batch
                        .last()
                        .map(|record| record.offset.next())
                        .unwrap_or(self.cursor);
                    return Ok(batch);
                }
            }
            if std::time::Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_dense_offsets() {
        let log = MemoryLog::new();
        assert_eq!(log.append(0, Bytes::from_static(b"a")), LogOffset(1));
        assert_eq!(log.append(0, Bytes::from_static(b"b")), LogOffset(2));
        assert_eq!(log.end_offset(), LogOffset(2));
    }

    #[test]
    fn poll_respects_cursor_and_batch_size() {
        let log = MemoryLog::new();
        for i in 0..5u8 {
            log.append(u64::from(i), Bytes::copy_from_slice(&[i]));
        }
        let mut stream = log.stream();
        let batch = stream.poll(2, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].offset, LogOffset(1));

        let batch = stream.poll(10, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].offset, LogOffset(3));

        assert!(stream.poll(10, Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn seek_rewinds_the_cursor() {
        let log = MemoryLog::new();
        log.append(0, Bytes::from_static(b"a"));
        log.append(0, Bytes::from_static(b"b"));
        let mut stream = log.stream();
        stream.poll(10, Duration::ZERO).unwrap();
        stream.seek(LogOffset(2)).unwrap();
        let batch = stream.poll(10, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].offset, LogOffset(2));
    }
}
