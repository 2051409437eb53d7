//! Admin operations: the closed set of control-plane commands carried by the
//! admin log.
//!
//! Provides:
//! - `AdminOperation` - decoded record: execution id + timestamp + payload
//! - `AdminOperationKind` - closed tag set, total over every payload
//! - per-kind payload structs, shared where kinds coincide
//! - `UpdateStoreOptions` - sparse update (unset fields mean "preserve")

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{ClusterName, ExecutionId, StoreName};

/// Sentinel in `UpdateStoreOptions::current_version`: do not change the
/// current version. Mandated by the log schema; everything else is sparse.
pub const IGNORED_CURRENT_VERSION: i64 = -1;

/// Sentinel passed to `delete_store` while a store is migrating: skip the
/// largest-used-version check entirely.
pub const IGNORE_VERSION: i64 = -2;

/// Closed set of admin log record kinds.
///
/// Adding a kind is a deliberate schema evolution in the codec and the
/// dispatch layer together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminOperationKind {
    StoreCreation,
    ValueSchemaCreation,
    DerivedSchemaCreation,
    SupersetSchemaCreation,
    DisableStoreWrite,
    EnableStoreWrite,
    DisableStoreRead,
    EnableStoreRead,
    KillOfflinePushJob,
    DeleteAllVersions,
    SetStoreCurrentVersion,
    SetStoreOwner,
    SetStorePartition,
    UpdateStore,
    DeleteStore,
    DeleteOldVersion,
    MigrateStore,
    AbortMigration,
    AddVersion,
}

impl AdminOperationKind {
    pub const ALL: [AdminOperationKind; 19] = [
        Self::StoreCreation,
        Self::ValueSchemaCreation,
        Self::DerivedSchemaCreation,
        Self::SupersetSchemaCreation,
        Self::DisableStoreWrite,
        Self::EnableStoreWrite,
        Self::DisableStoreRead,
        Self::EnableStoreRead,
        Self::KillOfflinePushJob,
        Self::DeleteAllVersions,
        Self::SetStoreCurrentVersion,
        Self::SetStoreOwner,
        Self::SetStorePartition,
        Self::UpdateStore,
        Self::DeleteStore,
        Self::DeleteOldVersion,
        Self::MigrateStore,
        Self::AbortMigration,
        Self::AddVersion,
    ];

    /// Wire tag. Stable across releases; never reuse a value.
    pub fn tag(self) -> u32 {
        match self {
            Self::StoreCreation => 1,
            Self::ValueSchemaCreation => 2,
            Self::DerivedSchemaCreation => 3,
            Self::SupersetSchemaCreation => 4,
            Self::DisableStoreWrite => 5,
            Self::EnableStoreWrite => 6,
            Self::DisableStoreRead => 7,
            Self::EnableStoreRead => 8,
            Self::KillOfflinePushJob => 9,
            Self::DeleteAllVersions => 10,
            Self::SetStoreCurrentVersion => 11,
            Self::SetStoreOwner => 12,
            Self::SetStorePartition => 13,
            Self::UpdateStore => 14,
            Self::DeleteStore => 15,
            Self::DeleteOldVersion => 16,
            Self::MigrateStore => 17,
            Self::AbortMigration => 18,
            Self::AddVersion => 19,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoreCreation => "STORE_CREATION",
            Self::ValueSchemaCreation => "VALUE_SCHEMA_CREATION",
            Self::DerivedSchemaCreation => "DERIVED_SCHEMA_CREATION",
            Self::SupersetSchemaCreation => "SUPERSET_SCHEMA_CREATION",
            Self::DisableStoreWrite => "DISABLE_STORE_WRITE",
            Self::EnableStoreWrite => "ENABLE_STORE_WRITE",
            Self::DisableStoreRead => "DISABLE_STORE_READ",
            Self::EnableStoreRead => "ENABLE_STORE_READ",
            Self::KillOfflinePushJob => "KILL_OFFLINE_PUSH_JOB",
            Self::DeleteAllVersions => "DELETE_ALL_VERSIONS",
            Self::SetStoreCurrentVersion => "SET_STORE_CURRENT_VERSION",
            Self::SetStoreOwner => "SET_STORE_OWNER",
            Self::SetStorePartition => "SET_STORE_PARTITION",
            Self::UpdateStore => "UPDATE_STORE",
            Self::DeleteStore => "DELETE_STORE",
            Self::DeleteOldVersion => "DELETE_OLD_VERSION",
            Self::MigrateStore => "MIGRATE_STORE",
            Self::AbortMigration => "ABORT_MIGRATION",
            Self::AddVersion => "ADD_VERSION",
        }
    }
}

impl fmt::Display for AdminOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Supporting enums
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionStrategy {
    #[default]
    NoOp,
    Gzip,
    Zstd,
}

impl CompressionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_op" => Some(Self::NoOp),
            "gzip" => Some(Self::Gzip),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupStrategy {
    #[default]
    KeepMinVersions,
    DeleteOnNewPushStart,
}

impl BackupStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepMinVersions => "keep_min_versions",
            Self::DeleteOnNewPushStart => "delete_on_new_push_start",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keep_min_versions" => Some(Self::KeepMinVersions),
            "delete_on_new_push_start" => Some(Self::DeleteOnNewPushStart),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncrementalPushPolicy {
    #[default]
    PushToVersionTopic,
    IncrementalPushSameAsRealTime,
}

impl IncrementalPushPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PushToVersionTopic => "push_to_version_topic",
            Self::IncrementalPushSameAsRealTime => "incremental_push_same_as_real_time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "push_to_version_topic" => Some(Self::PushToVersionTopic),
            "incremental_push_same_as_real_time" => Some(Self::IncrementalPushSameAsRealTime),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushType {
    Batch,
    StreamReprocessing,
    Stream,
    Incremental,
}

impl PushType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::StreamReprocessing => "stream_reprocessing",
            Self::Stream => "stream",
            Self::Incremental => "incremental",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "batch" => Some(Self::Batch),
            "stream_reprocessing" => Some(Self::StreamReprocessing),
            "stream" => Some(Self::Stream),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload shared by every kind that names a (cluster, store) and nothing
/// else: the read/write toggles and delete-all-versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
    pub cluster: ClusterName,
    pub store: StoreName,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCreation {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub owner: String,
    pub key_schema: String,
    pub value_schema: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSchemaCreation {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub schema: String,
    pub schema_id: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSchemaCreation {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub schema: String,
    pub value_schema_id: i32,
    pub derived_schema_id: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersetSchemaCreation {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub value_schema: String,
    pub value_schema_id: i32,
    pub superset_schema: String,
    pub superset_schema_id: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillOfflinePushJob {
    pub cluster: ClusterName,
    /// Version topic (`<store>_v<N>`) of the push to kill.
    pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStoreCurrentVersion {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub version: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStoreOwner {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub owner: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStorePartition {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub partition_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStore {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub options: UpdateStoreOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStore {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub largest_used_version_number: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOldVersion {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub version_number: i64,
}

/// Payload shared by `MigrateStore` and `AbortMigration`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTarget {
    pub src_cluster: ClusterName,
    pub dest_cluster: ClusterName,
    pub store: StoreName,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddVersion {
    pub cluster: ClusterName,
    pub store: StoreName,
    pub push_job_id: String,
    pub version_number: i64,
    pub partition_count: u32,
    pub push_type: PushType,
    pub push_stream_source_address: Option<String>,
}

/// Partitioner settings inside a sparse store update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionerSettings {
    pub partitioner_class: String,
    pub partitioner_params: BTreeMap<String, String>,
    pub amplification_factor: i32,
}

/// Hybrid-store settings inside a sparse store update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridSettings {
    pub rewind_seconds: i64,
    pub offset_lag_threshold: i64,
}

/// ETL settings inside a sparse store update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlSettings {
    pub regular_version_etl_enabled: bool,
    pub future_version_etl_enabled: bool,
    pub etled_proxy_user_account: String,
}

/// Sparse store update: every unset field means "do not change".
///
/// `current_version` is the one field the log schema expresses with a
/// sentinel (`IGNORED_CURRENT_VERSION`) instead of absence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateStoreOptions {
    pub owner: Option<String>,
    pub enable_reads: Option<bool>,
    pub enable_writes: Option<bool>,
    pub partition_count: Option<u32>,
    pub partitioner: Option<PartitionerSettings>,
    pub storage_quota_in_byte: Option<i64>,
    pub hybrid_store_overhead_bypass: Option<bool>,
    pub read_quota_in_cu: Option<i64>,
    pub current_version: i64,
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

impl Default for UpdateStoreOptions {
    fn default() -> Self {
        Self {
            owner: None,
            enable_reads: None,
            enable_writes: None,
            partition_count: None,
            partitioner: None,
            storage_quota_in_byte: None,
            hybrid_store_overhead_bypass: None,
            read_quota_in_cu: None,
            current_version: IGNORED_CURRENT_VERSION,
            hybrid: None,
            access_controlled: None,
            compression_strategy: None,
            client_decompression_enabled: None,
            chunking_enabled: None,
            single_get_router_cache_enabled: None,
            batch_get_router_cache_enabled: None,
            batch_get_limit: None,
            num_versions_to_preserve: None,
            incremental_push_enabled: None,
            is_migrating: None,
            write_computation_enabled: None,
            read_computation_enabled: None,
            bootstrap_to_online_timeout_in_hours: None,
            leader_follower_model_enabled: None,
            backup_strategy: None,
            schema_auto_register_from_push_job_enabled: None,
            hybrid_store_disk_quota_enabled: None,
            replication_factor: None,
            etl: None,
            largest_used_version_number: None,
            native_replication_enabled: None,
            push_stream_source_address: None,
            incremental_push_policy: None,
            backup_version_retention_ms: None,
        }
    }
}

// =============================================================================
// AdminOperation
// =============================================================================

/// One decoded admin log record payload, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AdminPayload {
    StoreCreation(StoreCreation),
    ValueSchemaCreation(ValueSchemaCreation),
    DerivedSchemaCreation(DerivedSchemaCreation),
    SupersetSchemaCreation(SupersetSchemaCreation),
    DisableStoreWrite(StoreTarget),
    EnableStoreWrite(StoreTarget),
    DisableStoreRead(StoreTarget),
    EnableStoreRead(StoreTarget),
    KillOfflinePushJob(KillOfflinePushJob),
    DeleteAllVersions(StoreTarget),
    SetStoreCurrentVersion(SetStoreCurrentVersion),
    SetStoreOwner(SetStoreOwner),
    SetStorePartition(SetStorePartition),
    UpdateStore(UpdateStore),
    DeleteStore(DeleteStore),
    DeleteOldVersion(DeleteOldVersion),
    MigrateStore(MigrationTarget),
    AbortMigration(MigrationTarget),
    AddVersion(AddVersion),
}

/// Immutable admin operation as produced into the log.
///
/// `execution_id` is assigned by the producer and strictly increases per
/// producer; it is the dedup key across log retention and rewind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminOperation {
    pub execution_id: ExecutionId,
    pub producer_time_ms: u64,
    pub payload: AdminPayload,
}

impl AdminOperation {
    /// Kind tag. Total over the closed payload set.
    pub fn kind(&self) -> AdminOperationKind {
        match &self.payload {
            AdminPayload::StoreCreation(_) => AdminOperationKind::StoreCreation,
            AdminPayload::ValueSchemaCreation(_) => AdminOperationKind::ValueSchemaCreation,
            AdminPayload::DerivedSchemaCreation(_) => AdminOperationKind::DerivedSchemaCreation,
            AdminPayload::SupersetSchemaCreation(_) => AdminOperationKind::SupersetSchemaCreation,
            AdminPayload::DisableStoreWrite(_) => AdminOperationKind::DisableStoreWrite,
            AdminPayload::EnableStoreWrite(_) => AdminOperationKind::EnableStoreWrite,
            AdminPayload::DisableStoreRead(_) => AdminOperationKind::DisableStoreRead,
            AdminPayload::EnableStoreRead(_) => AdminOperationKind::EnableStoreRead,
            AdminPayload::KillOfflinePushJob(_) => AdminOperationKind::KillOfflinePushJob,
            AdminPayload::DeleteAllVersions(_) => AdminOperationKind::DeleteAllVersions,
            AdminPayload::SetStoreCurrentVersion(_) => AdminOperationKind::SetStoreCurrentVersion,
            AdminPayload::SetStoreOwner(_) => AdminOperationKind::SetStoreOwner,
            AdminPayload::SetStorePartition(_) => AdminOperationKind::SetStorePartition,
            AdminPayload::UpdateStore(_) => AdminOperationKind::UpdateStore,
            AdminPayload::DeleteStore(_) => AdminOperationKind::DeleteStore,
            AdminPayload::DeleteOldVersion(_) => AdminOperationKind::DeleteOldVersion,
            AdminPayload::MigrateStore(_) => AdminOperationKind::MigrateStore,
            AdminPayload::AbortMigration(_) => AdminOperationKind::AbortMigration,
            AdminPayload::AddVersion(_) => AdminOperationKind::AddVersion,
        }
    }

    /// Store this operation queues under. Kill-push records are routed by
    /// the store parsed from the version topic; records that cannot name a
    /// single store land on the reserved cluster-wide key.
    pub fn store_key(&self) -> StoreName {
        match &self.payload {
            AdminPayload::StoreCreation(p) => p.store.clone(),
            AdminPayload::ValueSchemaCreation(p) => p.store.clone(),
            AdminPayload::DerivedSchemaCreation(p) => p.store.clone(),
            AdminPayload::SupersetSchemaCreation(p) => p.store.clone(),
            AdminPayload::DisableStoreWrite(p)
            | AdminPayload::EnableStoreWrite(p)
            | AdminPayload::DisableStoreRead(p)
            | AdminPayload::EnableStoreRead(p)
            | AdminPayload::DeleteAllVersions(p) => p.store.clone(),
            AdminPayload::KillOfflinePushJob(p) => {
                StoreName::parse_from_version_topic(&p.topic)
                    .unwrap_or_else(|_| StoreName::cluster_wide())
            }
            AdminPayload::SetStoreCurrentVersion(p) => p.store.clone(),
            AdminPayload::SetStoreOwner(p) => p.store.clone(),
            AdminPayload::SetStorePartition(p) => p.store.clone(),
            AdminPayload::UpdateStore(p) => p.store.clone(),
            AdminPayload::DeleteStore(p) => p.store.clone(),
            AdminPayload::DeleteOldVersion(p) => p.store.clone(),
            AdminPayload::MigrateStore(p) | AdminPayload::AbortMigration(p) => p.store.clone(),
            AdminPayload::AddVersion(p) => p.store.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterName {
        ClusterName::new("cluster0").unwrap()
    }

    #[test]
    fn kind_tags_are_unique_and_roundtrip() {
        for kind in AdminOperationKind::ALL {
            assert_eq!(AdminOperationKind::from_tag(kind.tag()), Some(kind));
        }
        let mut tags: Vec<u32> = AdminOperationKind::ALL.iter().map(|k| k.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), AdminOperationKind::ALL.len());
    }

    #[test]
    fn kill_push_routes_by_topic_store() {
        let op = AdminOperation {
            execution_id: ExecutionId(7),
            producer_time_ms: 0,
            payload: AdminPayload::KillOfflinePushJob(KillOfflinePushJob {
                cluster: cluster(),
                topic: "user_activity_v12".into(),
            }),
        };
        assert_eq!(op.store_key().as_str(), "user_activity");
        assert_eq!(op.kind(), AdminOperationKind::KillOfflinePushJob);
    }

    #[test]
    fn unparsable_topic_routes_cluster_wide() {
        let op = AdminOperation {
            execution_id: ExecutionId(8),
            producer_time_ms: 0,
            payload: AdminPayload::KillOfflinePushJob(KillOfflinePushJob {
                cluster: cluster(),
                topic: "not-a-version-topic".into(),
            }),
        };
        assert!(op.store_key().is_cluster_wide());
    }

    #[test]
    fn update_options_default_preserves_everything() {
        let options = UpdateStoreOptions::default();
        assert_eq!(options.current_version, IGNORED_CURRENT_VERSION);
        assert_eq!(options.owner, None);
        assert_eq!(options.etl, None);
    }
}
