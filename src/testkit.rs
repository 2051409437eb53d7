//! Test support: a scriptable, call-recording `AdminBackend`.
//!
//! Scenario tests drive the full consumer against this backend and assert
//! on the exact mutation sequence. Failures are scripted per method and
//! consumed in FIFO order, so "fail once, then succeed" retry behavior is
//! one line to set up.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use crate::backend::{AdminBackend, BackendError, BackendResult, StoreInfo, UpdateStoreRequest};
use crate::core::{ClusterName, PushType, StoreName};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub detail: String,
}

#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    stores: Mutex<BTreeMap<(ClusterName, StoreName), StoreInfo>>,
    failures: Mutex<HashMap<&'static str, VecDeque<BackendError>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store as if a prior operation had created it.
    pub fn insert_store(&self, cluster: &ClusterName, store: &StoreName, info: StoreInfo) {
        self.stores
            .lock()
            .expect("stores lock poisoned")
            .insert((cluster.clone(), store.clone()), info);
    }

    /// Script the next call to `method` to fail with `err`.
    pub fn fail_next(&self, method: &'static str, err: BackendError) {
        self.failures
            .lock()
            .expect("failures lock poisoned")
            .entry(method)
            .or_default()
            .push_back(err);
    }

    /// Every call, reads included, in invocation order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Mutation calls only: the existence/info probes are filtered out.
    pub fn mutation_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method != "has_store" && call.method != "get_store")
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn store_info(&self, cluster: &ClusterName, store: &StoreName) -> Option<StoreInfo> {
        self.stores
            .lock()
            .expect("stores lock poisoned")
            .get(&(cluster.clone(), store.clone()))
            .cloned()
    }

    fn enter(&self, method: &'static str, detail: String) -> BackendResult<()> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(RecordedCall { method, detail });
        let scripted = self
            .failures
            .lock()
            .expect("failures lock poisoned")
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AdminBackend for RecordingBackend {
    fn has_store(&self, cluster: &ClusterName, store: &StoreName) -> BackendResult<bool> {
        self.enter("has_store", format!("{cluster}/{store}"))?;
        Ok(self
            .stores
            .lock()
            .expect("stores lock poisoned")
            .contains_key(&(cluster.clone(), store.clone())))
    }

    fn get_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<Option<StoreInfo>> {
        self.enter("get_store", format!("{cluster}/{store}"))?;
        Ok(self.store_info(cluster, store))
    }

    fn add_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        owner: &str,
        _key_schema: &str,
        _value_schema: &str,
        is_system_store: bool,
    ) -> BackendResult<()> {
        self.enter(
            "add_store",
            format!("{cluster}/{store} owner={owner} system={is_system_store}"),
        )?;
        self.insert_store(
            cluster,
            store,
            StoreInfo {
                is_migrating: false,
                enable_reads: true,
                enable_writes: true,
                largest_used_version_number: 0,
            },
        );
        Ok(())
    }

    fn add_value_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        _schema: &str,
        schema_id: i32,
    ) -> BackendResult<()> {
        self.enter("add_value_schema", format!("{cluster}/{store} id={schema_id}"))
    }

    fn add_derived_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        value_schema_id: i32,
        derived_schema_id: i32,
        _schema: &str,
    ) -> BackendResult<()> {
        self.enter(
            "add_derived_schema",
            format!("{cluster}/{store} value={value_schema_id} derived={derived_schema_id}"),
        )
    }

    fn add_superset_schema(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        _value_schema: &str,
        value_schema_id: i32,
        _superset_schema: &str,
        superset_schema_id: i32,
    ) -> BackendResult<()> {
        self.enter(
            "add_superset_schema",
            format!("{cluster}/{store} value={value_schema_id} superset={superset_schema_id}"),
        )
    }

    fn set_store_readability(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        readable: bool,
    ) -> BackendResult<()> {
        self.enter(
            "set_store_readability",
            format!("{cluster}/{store} readable={readable}"),
        )?;
        if let Some(info) = self
            .stores
            .lock()
            .expect("stores lock poisoned")
            .get_mut(&(cluster.clone(), store.clone()))
        {
            info.enable_reads = readable;
        }
        Ok(())
    }

    fn set_store_writeability(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        writeable: bool,
    ) -> BackendResult<()> {
        self.enter(
            "set_store_writeability",
            format!("{cluster}/{store} writeable={writeable}"),
        )?;
        if let Some(info) = self
            .stores
            .lock()
            .expect("stores lock poisoned")
            .get_mut(&(cluster.clone(), store.clone()))
        {
            info.enable_writes = writeable;
        }
        Ok(())
    }

    fn kill_offline_push(&self, cluster: &ClusterName, topic: &str) -> BackendResult<()> {
        self.enter("kill_offline_push", format!("{cluster} topic={topic}"))
    }

    fn delete_all_versions(&self, cluster: &ClusterName, store: &StoreName) -> BackendResult<()> {
        self.enter("delete_all_versions", format!("{cluster}/{store}"))
    }

    fn delete_old_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        version: i64,
    ) -> BackendResult<()> {
        self.enter(
            "delete_old_version",
            format!("{cluster}/{store} version={version}"),
        )
    }

    fn set_store_current_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        version: i64,
    ) -> BackendResult<()> {
        self.enter(
            "set_store_current_version",
            format!("{cluster}/{store} version={version}"),
        )
    }

    fn set_store_owner(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        owner: &str,
    ) -> BackendResult<()> {
        self.enter("set_store_owner", format!("{cluster}/{store} owner={owner}"))
    }

    fn set_store_partition_count(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        partition_count: u32,
    ) -> BackendResult<()> {
        self.enter(
            "set_store_partition_count",
            format!("{cluster}/{store} partitions={partition_count}"),
        )
    }

    fn update_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        request: &UpdateStoreRequest,
    ) -> BackendResult<()> {
        self.enter("update_store", format!("{cluster}/{store}"))?;
        if let Some(info) = self
            .stores
            .lock()
            .expect("stores lock poisoned")
            .get_mut(&(cluster.clone(), store.clone()))
        {
            if let Some(migrating) = request.is_migrating {
                info.is_migrating = migrating;
            }
            if let Some(reads) = request.enable_reads {
                info.enable_reads = reads;
            }
            if let Some(writes) = request.enable_writes {
                info.enable_writes = writes;
            }
            if let Some(largest) = request.largest_used_version_number {
                info.largest_used_version_number = largest;
            }
        }
        Ok(())
    }

    fn replicate_update_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        _request: &UpdateStoreRequest,
    ) -> BackendResult<()> {
        self.enter("replicate_update_store", format!("{cluster}/{store}"))
    }

    fn delete_store(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        largest_used_version_number: i64,
    ) -> BackendResult<()> {
        self.enter(
            "delete_store",
            format!("{cluster}/{store} largest={largest_used_version_number}"),
        )?;
        self.stores
            .lock()
            .expect("stores lock poisoned")
            .remove(&(cluster.clone(), store.clone()));
        Ok(())
    }

    fn migrate_store(
        &self,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()> {
        self.enter(
            "migrate_store",
            format!("{src_cluster}->{dest_cluster}/{store}"),
        )
    }

    fn set_store_config_for_migration(
        &self,
        store: &StoreName,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
    ) -> BackendResult<()> {
        self.enter(
            "set_store_config_for_migration",
            format!("{src_cluster}->{dest_cluster}/{store}"),
        )
    }

    fn abort_migration(
        &self,
        src_cluster: &ClusterName,
        dest_cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()> {
        self.enter(
            "abort_migration",
            format!("{src_cluster}->{dest_cluster}/{store}"),
        )
    }

    fn add_version_and_start_ingestion(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        push_job_id: &str,
        version_number: i64,
        partition_count: u32,
        push_type: PushType,
        _push_stream_source_address: Option<&str>,
    ) -> BackendResult<()> {
        self.enter(
            "add_version_and_start_ingestion",
            format!(
                "{cluster}/{store} push={push_job_id} version={version_number} \
                 partitions={partition_count} type={}",
                push_type.as_str()
            ),
        )
    }

    fn replicate_add_version_and_start_ingestion(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        push_job_id: &str,
        version_number: i64,
        _partition_count: u32,
        _push_type: PushType,
        _push_stream_source_address: Option<&str>,
    ) -> BackendResult<()> {
        self.enter(
            "replicate_add_version_and_start_ingestion",
            format!("{cluster}/{store} push={push_job_id} version={version_number}"),
        )
    }

    fn new_shared_metadata_store_version(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
    ) -> BackendResult<()> {
        self.enter(
            "new_shared_metadata_store_version",
            format!("{cluster}/{store}"),
        )
    }

    fn materialize_metadata_store_version(
        &self,
        cluster: &ClusterName,
        user_store: &StoreName,
        version_number: i64,
    ) -> BackendResult<()> {
        self.enter(
            "materialize_metadata_store_version",
            format!("{cluster}/{user_store} version={version_number}"),
        )
    }

    fn dematerialize_metadata_store_version(
        &self,
        cluster: &ClusterName,
        user_store: &StoreName,
        version_number: i64,
    ) -> BackendResult<()> {
        self.enter(
            "dematerialize_metadata_store_version",
            format!("{cluster}/{user_store} version={version_number}"),
        )
    }
}
