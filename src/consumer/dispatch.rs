//! Routing of decoded operations to administrative side effects.
//!
//! One handler per operation kind. The deployment role (parent vs child) is
//! consulted only here, for the handful of kinds whose effect differs across
//! the two: kill-push, migration, add-version, and the update-store mirror.

use tracing::info;

use crate::backend::{AdminBackend, BackendError, ControllerRole, StoreInfo, UpdateStoreRequest};
use crate::core::{
    AddVersion, AdminOperation, AdminPayload, DeleteOldVersion, DeleteStore, DerivedSchemaCreation,
    KillOfflinePushJob, MigrationTarget, SetStoreCurrentVersion, SetStoreOwner, SetStorePartition,
    StoreCreation, StoreTarget, SupersetSchemaCreation, SystemStoreKind, UpdateStore,
    UpdateStoreOptions, ValueSchemaCreation, IGNORED_CURRENT_VERSION, IGNORE_VERSION,
};

/// Apply one operation against the backend. Success means the effect is
/// durable in administrative state; the caller owns watermark advancement.
pub fn execute(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    op: &AdminOperation,
) -> Result<(), BackendError> {
    match &op.payload {
        AdminPayload::StoreCreation(p) => handle_store_creation(backend, p),
        AdminPayload::ValueSchemaCreation(p) => handle_value_schema_creation(backend, p),
        AdminPayload::DerivedSchemaCreation(p) => handle_derived_schema_creation(backend, p),
        AdminPayload::SupersetSchemaCreation(p) => handle_superset_schema_creation(backend, p),
        AdminPayload::DisableStoreWrite(p) => handle_store_writeability(backend, p, false),
        AdminPayload::EnableStoreWrite(p) => handle_store_writeability(backend, p, true),
        AdminPayload::DisableStoreRead(p) => handle_store_readability(backend, p, false),
        AdminPayload::EnableStoreRead(p) => handle_store_readability(backend, p, true),
        AdminPayload::KillOfflinePushJob(p) => handle_kill_offline_push(role, backend, p),
        AdminPayload::DeleteAllVersions(p) => handle_delete_all_versions(backend, p),
        AdminPayload::SetStoreCurrentVersion(p) => handle_set_store_current_version(backend, p),
        AdminPayload::SetStoreOwner(p) => handle_set_store_owner(backend, p),
        AdminPayload::SetStorePartition(p) => handle_set_store_partition(backend, p),
        AdminPayload::UpdateStore(p) => handle_update_store(role, backend, p),
        AdminPayload::DeleteStore(p) => handle_delete_store(backend, p),
        AdminPayload::DeleteOldVersion(p) => handle_delete_old_version(backend, p),
        AdminPayload::MigrateStore(p) => handle_store_migration(role, backend, p),
        AdminPayload::AbortMigration(p) => handle_abort_migration(backend, p),
        AdminPayload::AddVersion(p) => handle_add_version(role, backend, p),
    }
}

fn handle_store_creation(
    backend: &dyn AdminBackend,
    p: &StoreCreation,
) -> Result<(), BackendError> {
    // A duplicate creation is routine: producer retries and log replays both
    // deliver it again. Probe first and skip instead of failing.
    if backend.has_store(&p.cluster, &p.store)? {
        info!(store = %p.store, cluster = %p.cluster, "store already exists, skipping creation");
        return Ok(());
    }
    backend.add_store(
        &p.cluster,
        &p.store,
        &p.owner,
        &p.key_schema,
        &p.value_schema,
        p.store.is_system_store(),
    )?;
    info!(store = %p.store, cluster = %p.cluster, owner = %p.owner, "added store");
    Ok(())
}

fn handle_value_schema_creation(
    backend: &dyn AdminBackend,
    p: &ValueSchemaCreation,
) -> Result<(), BackendError> {
    backend.add_value_schema(&p.cluster, &p.store, &p.schema, p.schema_id)?;
    info!(store = %p.store, schema_id = p.schema_id, "added value schema");
    Ok(())
}

fn handle_derived_schema_creation(
    backend: &dyn AdminBackend,
    p: &DerivedSchemaCreation,
) -> Result<(), BackendError> {
    backend.add_derived_schema(
        &p.cluster,
        &p.store,
        p.value_schema_id,
        p.derived_schema_id,
        &p.schema,
    )?;
    info!(
        store = %p.store,
        value_schema_id = p.value_schema_id,
        derived_schema_id = p.derived_schema_id,
        "added derived schema"
    );
    Ok(())
}

fn handle_superset_schema_creation(
    backend: &dyn AdminBackend,
    p: &SupersetSchemaCreation,
) -> Result<(), BackendError> {
    backend.add_superset_schema(
        &p.cluster,
        &p.store,
        &p.value_schema,
        p.value_schema_id,
        &p.superset_schema,
        p.superset_schema_id,
    )?;
    info!(
        store = %p.store,
        value_schema_id = p.value_schema_id,
        superset_schema_id = p.superset_schema_id,
        "added value schema with superset schema"
    );
    Ok(())
}

fn handle_store_writeability(
    backend: &dyn AdminBackend,
    p: &StoreTarget,
    writeable: bool,
) -> Result<(), BackendError> {
    backend.set_store_writeability(&p.cluster, &p.store, writeable)?;
    info!(store = %p.store, cluster = %p.cluster, writeable, "set store writeability");
    Ok(())
}

fn handle_store_readability(
    backend: &dyn AdminBackend,
    p: &StoreTarget,
    readable: bool,
) -> Result<(), BackendError> {
    backend.set_store_readability(&p.cluster, &p.store, readable)?;
    info!(store = %p.store, cluster = %p.cluster, readable, "set store readability");
    Ok(())
}

fn handle_kill_offline_push(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    p: &KillOfflinePushJob,
) -> Result<(), BackendError> {
    if role.is_parent() {
        // Parent controllers run no ingestion; the kill applies per fabric.
        return Ok(());
    }
    backend.kill_offline_push(&p.cluster, &p.topic)?;
    info!(topic = %p.topic, cluster = %p.cluster, "killed offline push");
    Ok(())
}

fn handle_delete_all_versions(
    backend: &dyn AdminBackend,
    p: &StoreTarget,
) -> Result<(), BackendError> {
    backend.delete_all_versions(&p.cluster, &p.store)?;
    info!(store = %p.store, cluster = %p.cluster, "deleted all versions");
    Ok(())
}

fn handle_set_store_current_version(
    backend: &dyn AdminBackend,
    p: &SetStoreCurrentVersion,
) -> Result<(), BackendError> {
    backend.set_store_current_version(&p.cluster, &p.store, p.version)?;
    info!(store = %p.store, version = p.version, "set store current version");
    Ok(())
}

fn handle_set_store_owner(
    backend: &dyn AdminBackend,
    p: &SetStoreOwner,
) -> Result<(), BackendError> {
    backend.set_store_owner(&p.cluster, &p.store, &p.owner)?;
    info!(store = %p.store, owner = %p.owner, "set store owner");
    Ok(())
}

fn handle_set_store_partition(
    backend: &dyn AdminBackend,
    p: &SetStorePartition,
) -> Result<(), BackendError> {
    backend.set_store_partition_count(&p.cluster, &p.store, p.partition_count)?;
    info!(store = %p.store, partition_count = p.partition_count, "set store partition count");
    Ok(())
}

fn handle_update_store(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    p: &UpdateStore,
) -> Result<(), BackendError> {
    let request = build_update_request(&p.options);

    if should_replicate_update(role, backend, p)? {
        backend.replicate_update_store(&p.cluster, &p.store, &request)?;
    }

    backend.update_store(&p.cluster, &p.store, &request)?;
    info!(store = %p.store, cluster = %p.cluster, "updated store");
    Ok(())
}

/// Parent-side mirror gate for store updates during migration: mirror only
/// when the store is migrating and the update does not touch the migration
/// flag or read/write switches (those are managed per cluster).
fn should_replicate_update(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    p: &UpdateStore,
) -> Result<bool, BackendError> {
    if !role.is_parent() {
        return Ok(false);
    }
    let Some(info) = backend.get_store(&p.cluster, &p.store)? else {
        return Ok(false);
    };
    if !info.is_migrating {
        return Ok(false);
    }
    Ok(!migration_switches_updated(&p.options, &info))
}

fn migration_switches_updated(options: &UpdateStoreOptions, info: &StoreInfo) -> bool {
    let migrating_updated = options
        .is_migrating
        .map(|v| v != info.is_migrating)
        .unwrap_or(false);
    let reads_updated = options
        .enable_reads
        .map(|v| v != info.enable_reads)
        .unwrap_or(false);
    let writes_updated = options
        .enable_writes
        .map(|v| v != info.enable_writes)
        .unwrap_or(false);
    migrating_updated || reads_updated || writes_updated
}

fn build_update_request(options: &UpdateStoreOptions) -> UpdateStoreRequest {
    let mut request = UpdateStoreRequest {
        owner: options.owner.clone(),
        enable_reads: options.enable_reads,
        enable_writes: options.enable_writes,
        partition_count: options.partition_count,
        partitioner: options.partitioner.clone(),
        storage_quota_in_byte: options.storage_quota_in_byte,
        hybrid_store_overhead_bypass: options.hybrid_store_overhead_bypass,
        read_quota_in_cu: options.read_quota_in_cu,
        current_version: None,
        hybrid: options.hybrid,
        access_controlled: options.access_controlled,
        compression_strategy: options.compression_strategy,
        client_decompression_enabled: options.client_decompression_enabled,
        chunking_enabled: options.chunking_enabled,
        single_get_router_cache_enabled: options.single_get_router_cache_enabled,
        batch_get_router_cache_enabled: options.batch_get_router_cache_enabled,
        batch_get_limit: options.batch_get_limit,
        num_versions_to_preserve: options.num_versions_to_preserve,
        incremental_push_enabled: options.incremental_push_enabled,
        is_migrating: options.is_migrating,
        write_computation_enabled: options.write_computation_enabled,
        read_computation_enabled: options.read_computation_enabled,
        bootstrap_to_online_timeout_in_hours: options.bootstrap_to_online_timeout_in_hours,
        leader_follower_model_enabled: options.leader_follower_model_enabled,
        backup_strategy: options.backup_strategy,
        schema_auto_register_from_push_job_enabled: options
            .schema_auto_register_from_push_job_enabled,
        hybrid_store_disk_quota_enabled: options.hybrid_store_disk_quota_enabled,
        replication_factor: options.replication_factor,
        etl: options.etl.clone(),
        largest_used_version_number: options.largest_used_version_number,
        native_replication_enabled: options.native_replication_enabled,
        push_stream_source_address: options.push_stream_source_address.clone(),
        incremental_push_policy: options.incremental_push_policy,
        backup_version_retention_ms: options.backup_version_retention_ms,
    };
    if options.current_version != IGNORED_CURRENT_VERSION {
        request.current_version = Some(options.current_version);
    }
    request
}

fn handle_delete_store(backend: &dyn AdminBackend, p: &DeleteStore) -> Result<(), BackendError> {
    let migrating = backend
        .get_store(&p.cluster, &p.store)?
        .map(|info| info.is_migrating)
        .unwrap_or(false);
    if migrating {
        // A push during migration bumps the cloned store's largest used
        // version but not the original's, so the recorded number cannot be
        // trusted; skip the version check entirely.
        backend.delete_store(&p.cluster, &p.store, IGNORE_VERSION)?;
    } else {
        backend.delete_store(&p.cluster, &p.store, p.largest_used_version_number)?;
    }
    info!(store = %p.store, cluster = %p.cluster, "deleted store");
    Ok(())
}

fn handle_delete_old_version(
    backend: &dyn AdminBackend,
    p: &DeleteOldVersion,
) -> Result<(), BackendError> {
    if p.store.system_store_kind() == Some(SystemStoreKind::MetadataStore) {
        let user_store = p.store.user_store().expect("metadata store has a user store");
        backend.dematerialize_metadata_store_version(&p.cluster, &user_store, p.version_number)?;
    } else {
        backend.delete_old_version(&p.cluster, &p.store, p.version_number)?;
    }
    info!(store = %p.store, version = p.version_number, "deleted old version");
    Ok(())
}

fn handle_store_migration(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    p: &MigrationTarget,
) -> Result<(), BackendError> {
    if role.is_parent() {
        backend.migrate_store(&p.src_cluster, &p.dest_cluster, &p.store)?;
    } else {
        // Child controllers only record the endpoints so the fabric's store
        // config knows where the store is moving.
        backend.set_store_config_for_migration(&p.store, &p.src_cluster, &p.dest_cluster)?;
    }
    info!(
        store = %p.store,
        src = %p.src_cluster,
        dest = %p.dest_cluster,
        "handled store migration"
    );
    Ok(())
}

fn handle_abort_migration(
    backend: &dyn AdminBackend,
    p: &MigrationTarget,
) -> Result<(), BackendError> {
    backend.abort_migration(&p.src_cluster, &p.dest_cluster, &p.store)?;
    info!(store = %p.store, src = %p.src_cluster, dest = %p.dest_cluster, "aborted migration");
    Ok(())
}

fn handle_add_version(
    role: ControllerRole,
    backend: &dyn AdminBackend,
    p: &AddVersion,
) -> Result<(), BackendError> {
    if role.is_parent() {
        let migrating = backend
            .get_store(&p.cluster, &p.store)?
            .map(|info| info.is_migrating)
            .unwrap_or(false);
        if migrating {
            backend.replicate_add_version_and_start_ingestion(
                &p.cluster,
                &p.store,
                &p.push_job_id,
                p.version_number,
                p.partition_count,
                p.push_type,
                p.push_stream_source_address.as_deref(),
            )?;
            info!(store = %p.store, version = p.version_number, "replicated add version");
        }
        return Ok(());
    }

    match p.store.system_store_kind() {
        Some(SystemStoreKind::SharedMetadataStore) => {
            backend.new_shared_metadata_store_version(&p.cluster, &p.store)?;
            info!(store = %p.store, "new shared metadata store version");
        }
        Some(SystemStoreKind::MetadataStore) => {
            let user_store = p.store.user_store().expect("metadata store has a user store");
            backend.materialize_metadata_store_version(
                &p.cluster,
                &user_store,
                p.version_number,
            )?;
            info!(store = %p.store, version = p.version_number, "materialized metadata store version");
        }
        None => {
            backend.add_version_and_start_ingestion(
                &p.cluster,
                &p.store,
                &p.push_job_id,
                p.version_number,
                p.partition_count,
                p.push_type,
                p.push_stream_source_address.as_deref(),
            )?;
            info!(store = %p.store, version = p.version_number, "added version, ingestion started");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClusterName, ExecutionId, PushType, StoreName};
    use crate::testkit::RecordingBackend;

    fn cluster() -> ClusterName {
        ClusterName::new("cluster0").unwrap()
    }

    fn store() -> StoreName {
        StoreName::new("user_activity").unwrap()
    }

    fn op(payload: AdminPayload) -> AdminOperation {
        AdminOperation {
            execution_id: ExecutionId(1),
            producer_time_ms: 0,
            payload,
        }
    }

    #[test]
    fn store_creation_skips_existing_store() {
        let backend = RecordingBackend::new();
        let creation = op(AdminPayload::StoreCreation(StoreCreation {
            cluster: cluster(),
            store: store(),
            owner: "owner".into(),
            key_schema: "\"string\"".into(),
            value_schema: "\"string\"".into(),
        }));

        execute(ControllerRole::Child, &backend, &creation).unwrap();
        assert_eq!(backend.call_count("add_store"), 1);

        // Replayed creation probes and skips.
        execute(ControllerRole::Child, &backend, &creation).unwrap();
        assert_eq!(backend.call_count("add_store"), 1);
        assert_eq!(backend.call_count("has_store"), 2);
    }

    #[test]
    fn store_creation_flags_system_stores() {
        let backend = RecordingBackend::new();
        let meta = StoreName::metadata_store_for(&store());
        let creation = op(AdminPayload::StoreCreation(StoreCreation {
            cluster: cluster(),
            store: meta,
            owner: "platform".into(),
            key_schema: "\"string\"".into(),
            value_schema: "\"string\"".into(),
        }));
        execute(ControllerRole::Child, &backend, &creation).unwrap();
        let calls = backend.mutation_calls();
        assert!(calls[0].detail.contains("system=true"), "{:?}", calls);
    }

    #[test]
    fn kill_push_is_parent_noop() {
        let backend = RecordingBackend::new();
        let kill = op(AdminPayload::KillOfflinePushJob(KillOfflinePushJob {
            cluster: cluster(),
            topic: "user_activity_v3".into(),
        }));

        execute(ControllerRole::Parent, &backend, &kill).unwrap();
        assert!(backend.calls().is_empty());

        execute(ControllerRole::Child, &backend, &kill).unwrap();
        assert_eq!(backend.call_count("kill_offline_push"), 1);
    }

    #[test]
    fn delete_store_uses_sentinel_while_migrating() {
        let backend = RecordingBackend::new();
        backend.insert_store(
            &cluster(),
            &store(),
            StoreInfo {
                is_migrating: true,
                ..StoreInfo::default()
            },
        );
        let delete = op(AdminPayload::DeleteStore(DeleteStore {
            cluster: cluster(),
            store: store(),
            largest_used_version_number: 12,
        }));
        execute(ControllerRole::Parent, &backend, &delete).unwrap();
        let calls = backend.mutation_calls();
        assert_eq!(calls.len(), 1);
        assert!(
            calls[0].detail.contains(&format!("largest={IGNORE_VERSION}")),
            "{:?}",
            calls
        );
    }

    #[test]
    fn delete_store_passes_version_when_not_migrating() {
        let backend = RecordingBackend::new();
        backend.insert_store(&cluster(), &store(), StoreInfo::default());
        let delete = op(AdminPayload::DeleteStore(DeleteStore {
            cluster: cluster(),
            store: store(),
            largest_used_version_number: 12,
        }));
        execute(ControllerRole::Child, &backend, &delete).unwrap();
        assert!(backend.mutation_calls()[0].detail.contains("largest=12"));
    }

    #[test]
    fn delete_old_version_dematerializes_metadata_stores() {
        let backend = RecordingBackend::new();
        let meta = StoreName::metadata_store_for(&store());
        let delete = op(AdminPayload::DeleteOldVersion(DeleteOldVersion {
            cluster: cluster(),
            store: meta,
            version_number: 4,
        }));
        execute(ControllerRole::Child, &backend, &delete).unwrap();
        let calls = backend.mutation_calls();
        assert_eq!(calls[0].method, "dematerialize_metadata_store_version");
        // Dematerialization targets the user store, not the system store.
        assert!(calls[0].detail.contains("cluster0/user_activity "), "{:?}", calls);
    }

    #[test]
    fn migration_branches_on_role() {
        let target = MigrationTarget {
            src_cluster: cluster(),
            dest_cluster: ClusterName::new("cluster1").unwrap(),
            store: store(),
        };
        let backend = RecordingBackend::new();
        execute(ControllerRole::Parent, &backend, &op(AdminPayload::MigrateStore(target.clone()))).unwrap();
        assert_eq!(backend.call_count("migrate_store"), 1);

        let backend = RecordingBackend::new();
        execute(ControllerRole::Child, &backend, &op(AdminPayload::MigrateStore(target))).unwrap();
        assert_eq!(backend.call_count("set_store_config_for_migration"), 1);
        assert_eq!(backend.call_count("migrate_store"), 0);
    }

    #[test]
    fn add_version_parent_mirrors_only_migrating_stores() {
        let add = op(AdminPayload::AddVersion(AddVersion {
            cluster: cluster(),
            store: store(),
            push_job_id: "push-1".into(),
            version_number: 2,
            partition_count: 4,
            push_type: PushType::Batch,
            push_stream_source_address: None,
        }));

        let backend = RecordingBackend::new();
        backend.insert_store(&cluster(), &store(), StoreInfo::default());
        execute(ControllerRole::Parent, &backend, &add).unwrap();
        assert!(backend.mutation_calls().is_empty());

        let backend = RecordingBackend::new();
        backend.insert_store(
            &cluster(),
            &store(),
            StoreInfo {
                is_migrating: true,
                ..StoreInfo::default()
            },
        );
        execute(ControllerRole::Parent, &backend, &add).unwrap();
        assert_eq!(
            backend.call_count("replicate_add_version_and_start_ingestion"),
            1
        );
    }

    #[test]
    fn add_version_child_branches_on_store_type() {
        let add = |target: StoreName| {
            op(AdminPayload::AddVersion(AddVersion {
                cluster: cluster(),
                store: target,
                push_job_id: "push-1".into(),
                version_number: 2,
                partition_count: 4,
                push_type: PushType::Stream,
                push_stream_source_address: Some("kafka.dc2:9092".into()),
            }))
        };

        let backend = RecordingBackend::new();
        execute(ControllerRole::Child, &backend, &add(store())).unwrap();
        assert_eq!(backend.call_count("add_version_and_start_ingestion"), 1);

        let backend = RecordingBackend::new();
        let shared = StoreName::shared_metadata_store_for(&cluster());
        execute(ControllerRole::Child, &backend, &add(shared)).unwrap();
        assert_eq!(backend.call_count("new_shared_metadata_store_version"), 1);

        let backend = RecordingBackend::new();
        let meta = StoreName::metadata_store_for(&store());
        execute(ControllerRole::Child, &backend, &add(meta)).unwrap();
        assert_eq!(backend.call_count("materialize_metadata_store_version"), 1);
    }

    #[test]
    fn update_store_maps_current_version_sentinel() {
        let backend = RecordingBackend::new();
        let mut options = UpdateStoreOptions::default();
        options.owner = Some("o".into());
        let update = op(AdminPayload::UpdateStore(UpdateStore {
            cluster: cluster(),
            store: store(),
            options,
        }));
        execute(ControllerRole::Child, &backend, &update).unwrap();
        assert_eq!(backend.call_count("update_store"), 1);

        let request = build_update_request(&UpdateStoreOptions {
            current_version: 5,
            ..UpdateStoreOptions::default()
        });
        assert_eq!(request.current_version, Some(5));
        let request = build_update_request(&UpdateStoreOptions::default());
        assert_eq!(request.current_version, None);
    }

    #[test]
    fn update_store_mirrors_for_migrating_store_in_parent() {
        let backend = RecordingBackend::new();
        backend.insert_store(
            &cluster(),
            &store(),
            StoreInfo {
                is_migrating: true,
                enable_reads: true,
                enable_writes: true,
                largest_used_version_number: 0,
            },
        );
        let update = op(AdminPayload::UpdateStore(UpdateStore {
            cluster: cluster(),
            store: store(),
            options: UpdateStoreOptions {
                storage_quota_in_byte: Some(1 << 30),
                ..UpdateStoreOptions::default()
            },
        }));
        execute(ControllerRole::Parent, &backend, &update).unwrap();
        assert_eq!(backend.call_count("replicate_update_store"), 1);
        assert_eq!(backend.call_count("update_store"), 1);
    }

    #[test]
    fn update_store_does_not_mirror_migration_switch_changes() {
        let backend = RecordingBackend::new();
        backend.insert_store(
            &cluster(),
            &store(),
            StoreInfo {
                is_migrating: true,
                enable_reads: true,
                enable_writes: true,
                largest_used_version_number: 0,
            },
        );
        // Flipping enable_writes is a per-cluster action; no mirror.
        let update = op(AdminPayload::UpdateStore(UpdateStore {
            cluster: cluster(),
            store: store(),
            options: UpdateStoreOptions {
                enable_writes: Some(false),
                ..UpdateStoreOptions::default()
            },
        }));
        execute(ControllerRole::Parent, &backend, &update).unwrap();
        assert_eq!(backend.call_count("replicate_update_store"), 0);
        assert_eq!(backend.call_count("update_store"), 1);
    }

    #[test]
    fn update_store_never_mirrors_in_child_role() {
        let backend = RecordingBackend::new();
        backend.insert_store(
            &cluster(),
            &store(),
            StoreInfo {
                is_migrating: true,
                ..StoreInfo::default()
            },
        );
        let update = op(AdminPayload::UpdateStore(UpdateStore {
            cluster: cluster(),
            store: store(),
            options: UpdateStoreOptions::default(),
        }));
        execute(ControllerRole::Child, &backend, &update).unwrap();
        assert_eq!(backend.call_count("replicate_update_store"), 0);
    }

    #[test]
    fn retriable_backend_failure_propagates() {
        let backend = RecordingBackend::new();
        backend.fail_next("set_store_owner", BackendError::retriable("zk timeout"));
        let set_owner = op(AdminPayload::SetStoreOwner(SetStoreOwner {
            cluster: cluster(),
            store: store(),
            owner: "o".into(),
        }));
        let err = execute(ControllerRole::Child, &backend, &set_owner).unwrap_err();
        assert!(err.is_retriable());

        execute(ControllerRole::Child, &backend, &set_owner).unwrap();
        assert_eq!(backend.call_count("set_store_owner"), 2);
    }
}
