#![forbid(unsafe_code)]

//! Admin log consumption and execution core.
//!
//! Control-plane mutations for a multi-datacenter key-value platform are
//! serialized into a single-partition admin log; this crate tails that log,
//! partitions work by store, executes each operation exactly once against
//! the administrative backend, and commits progress through durable
//! watermarks. See `DESIGN.md` for the component map.

pub mod backend;
pub mod codec;
pub mod config;
pub mod consumer;
pub mod core;
pub mod error;
pub mod leader;
pub mod log;
pub mod metrics;
pub mod telemetry;
pub mod testkit;
pub mod watermark;

pub use error::{Error, ExecError, FailureClass};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the main service surface at the crate root for convenience.
pub use crate::backend::{AdminBackend, BackendError, ControllerRole, StoreInfo, UpdateStoreRequest};
pub use crate::codec::{CborOperationCodec, OperationCodec};
pub use crate::config::{Config, ConsumerConfig};
pub use crate::consumer::{AdminConsumer, AdminConsumerHandle, ConsumerDeps};
pub use crate::core::{
    AdminOperation, AdminOperationKind, AdminPayload, ClusterName, ExecutionId, LogOffset,
    StoreName,
};
pub use crate::leader::{LeaderOracle, StaticLeaderOracle};
pub use crate::log::{LogStream, MemoryLog, RawRecord};
pub use crate::watermark::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore};
