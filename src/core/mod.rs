//! Core data model: identity atoms and the admin operation set.

mod error;
mod ids;
mod op;

pub use error::InvalidName;
pub use ids::{ClusterName, ExecutionId, LogOffset, StoreName, SystemStoreKind};
pub use op::{
    AddVersion, AdminOperation, AdminOperationKind, AdminPayload, BackupStrategy,
    CompressionStrategy, DeleteOldVersion, DeleteStore, DerivedSchemaCreation, EtlSettings,
    HybridSettings, IncrementalPushPolicy, KillOfflinePushJob, MigrationTarget,
    PartitionerSettings, PushType, SetStoreCurrentVersion, SetStoreOwner, SetStorePartition,
    StoreCreation, StoreTarget, SupersetSchemaCreation, UpdateStore, UpdateStoreOptions,
    ValueSchemaCreation, IGNORED_CURRENT_VERSION, IGNORE_VERSION,
};
