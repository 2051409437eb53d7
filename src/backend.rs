//! The administrative state machine this core mutates.
//!
//! Store catalog, schema registry, and version manager live elsewhere in the
//! controller; `AdminBackend` is the call surface the dispatch layer drives.
//! Every method is synchronous from the worker's perspective.

use thiserror::Error;

use crate::core::{
    BackupStrategy, ClusterName, CompressionStrategy, EtlSettings, HybridSettings,
    IncrementalPushPolicy, PartitionerSettings, PushType, StoreName,
};

/// Process-wide deployment role. Parent controllers front a whole
/// multi-datacenter deployment; child controllers run inside one fabric.
/// This is configuration, not polymorphism: the handful of branches in the
/// dispatch layer are the only consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ControllerRole {
    Parent,
    Child,
}

impl ControllerRole {
    pub fn is_parent(self) -> bool {
        matches!(self, Self::Parent)
    }
}

/// The slice of store state the dispatch layer consults before branching.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreInfo {
    pub is_migrating: bool,
    pub enable_reads: bool,
    pub enable_writes: bool,
    pub largest_used_version_number: i64,
}

/// Sparse store update: unset fields are preserved. Built by the dispatch
/// layer from the payload options; no sentinels survive past this boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateStoreRequest {
    pub owner: Option<String>,
    pub enable_reads: Option<bool>,
    pub enable_writes: Option<bool>,
    pub partition_count: Option<u32>,
    pub partitioner: Option<PartitionerSettings>,
    pub storage_quota_in_byte: Option<i64>,
    pub hybrid_store_overhead_bypass: Option<bool>,
    pub read_quota_in_cu: Option<i64>,
    pub current_version: Option<i64>,
    pub hybrid: Option<HybridSettings>,
    pub access_controlled: Option<bool>,
    pub compression_strategy: Option<CompressionStrategy>,
    pub client_decompression_enabled: Option<bool>,
    pub chunking_enabled: Option<bool>,
    pub single_get_router_cache_enabled: Option<bool>,
    pub batch_get_router_cache_enabled: Option<bool>,
    pub batch_get_limit: Option<i32>,
    pub num_versions_to_preserve: Option<i32>,
    pub incremental_push_enabled: Option<bool>,
    pub is_migrating: Option<bool>,
    pub write_computation_enabled: Option<bool>,
    pub read_computation_enabled: Option<bool>,
    pub bootstrap_to_online_timeout_in_hours: Option<i32>,
    pub leader_follower_model_enabled: Option<bool>,
    pub backup_strategy: Option<BackupStrategy>,
    pub schema_auto_register_from_push_job_enabled: Option<bool>,
    pub hybrid_store_disk_quota_enabled: Option<bool>,
    pub replication_factor: Option<i32>,
    pub etl: Option<EtlSettings>,
    pub largest_used_version_number: Option<i64>,
    pub native_replication_enabled: Option<bool>,
    pub push_stream_source_address: Option<String>,
    pub incremental_push_policy: Option<IncrementalPushPolicy>,
    pub backup_version_retention_ms: Option<i64>,
}

/// Backend failure, classified at the source.
///
/// `Retriable` keeps the operation at its queue head for another cycle;
/// `Unsupported` is a successful ignore (heterogeneous deployments
/// legitimately cannot honor every kind); `Rejected` is permanent and halts
/// the consumer for operator attention.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("retriable backend failure: {reason}")]
    Retriable { reason: String },
    #[error("operation unsupported by this deployment: {reason}")]
    Unsupported { reason: String },
    #[error("backend rejected operation: {reason}")]
    Rejected { reason: String },
}

impl BackendError {
    pub fn retriable(reason: impl Into<String>) -> Self {
        Self::Retriable {
            reason: reason.into(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Retriable { .. })
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Administrative side effects, one method per distinct mutation.
///
/// Implementations must be idempotent against replays *of committed work*
/// only to the extent the dispatch layer cannot dedup for them (store
/// creation probes existence; everything else is filtered by execution id).
#[allow(clippy::too_many_arguments)]
pub trait AdminBackend: Send + Sync {
    fn has_store(&self, cluster: &ClusterName, store: &StoreName) -> BackendResult<bool>;

    fn get_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<Option<StoreInfo>>;

    fn add_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        owner: &str,
        key_schema: &str,
        value_schema: &str,
        is_system_store: bool,
    ) -> BackendResult<()>;

    fn add_value_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        schema: &str,
        schema_id: i32,
    ) -> BackendResult<()>;

    fn add_derived_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        value_schema_id: i32,
        derived_schema_id: i32,
        schema: &str,
    ) -> BackendResult<()>;

    fn add_superset_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        value_schema: &str,
        value_schema_id: i32,
        superset_schema: &str,
        superset_schema_id: i32,
    ) -> BackendResult<()>;

    fn set_store_readability(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        readable: bool,
    ) -> BackendResult<()>;

    fn set_store_writeability(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        writeable: bool,
    ) -> BackendResult<()>;

    fn kill_offline_push(&self, cluster: &ClusterName, topic: &str) -> BackendResult<()>;

    fn delete_all_versions(&self, cluster: &ClusterName, store: &StoreName) -> BackendResult<()>;

    fn delete_old_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        version: i64,
    ) -> BackendResult<()>;

    fn set_store_current_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        version: i64,
    ) -> BackendResult<()>;

    fn set_store_owner(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        owner: &str,
    ) -> BackendResult<()>;

    fn set_store_partition_count(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        partition_count: u32,
    ) -> BackendResult<()>;

    fn update_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        request: &UpdateStoreRequest,
    ) -> BackendResult<()>;

    /// Mirror a store update to the migration peer cluster.
    fn replicate_update_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        request: &UpdateStoreRequest,
    ) -> BackendResult<()>;

    fn delete_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        largest_used_version_number: i64,
    ) -> BackendResult<()>;

    fn migrate_store(
        &self,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()>;

    /// Record migration source/destination in the store config only.
    fn set_store_config_for_migration(
        &self,
        store: &StoreName,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
    ) -> BackendResult<()>;

    fn abort_migration(
        &self,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()>;

    fn add_version_and_start_ingestion(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        push_job_id: &str,
        version_number: i64,
        partition_count: u32,
        push_type: PushType,
        push_stream_source_address: Option<&str>,
    ) -> BackendResult<()>;

    /// Mirror an add-version to the migration peer cluster.
    fn replicate_add_version_and_start_ingestion(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        push_job_id: &str,
        version_number: i64,
        partition_count: u32,
        push_type: PushType,
        push_stream_source_address: Option<&str>,
    ) -> BackendResult<()>;

    /// Version bump for the cluster-shared metadata store.
    fn new_shared_metadata_store_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()>;

    /// Materialize a metadata store version for a user store.
    fn materialize_metadata_store_version(
        &self,
        cluster: &ClusterName,
        user_store: &StoreName,
        version_number: i64,
    ) -> BackendResult<()>;

    /// Tear down a metadata store version for a user store.
    fn dematerialize_metadata_store_version(
        &self,
        cluster: &ClusterName,
        user_store: &StoreName,
        version_number: i64,
    ) -> BackendResult<()>;
}
