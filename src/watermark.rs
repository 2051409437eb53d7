//! Durable progress watermarks.
//!
//! Two monotonic families per cluster:
//! - one log offset: the checkpointable prefix of the admin log
//! - one execution id per store: the dedup clock that survives log
//!   retention and rewind
//!
//! Writes that move backwards are rejected; equal writes are idempotent
//! no-ops so restart-from-checkpoint never trips the guard.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::core::{ClusterName, ExecutionId, LogOffset, StoreName};

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("offset watermark regression for {cluster}: have {current}, got {attempted}")]
    Regression {
        cluster: ClusterName,
        current: LogOffset,
        attempted: LogOffset,
    },
    #[error("watermark read failed at {path:?}: {source}")]
    Read {
        path: Box<PathBuf>,
        #[source]
        source: io::Error,
    },
    #[error("watermark parse failed at {path:?}: {source}")]
    Parse {
        path: Box<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("watermark write failed at {path:?}: {source}")]
    Write {
        path: Box<PathBuf>,
        #[source]
        source: io::Error,
    },
}

/// Durable KV with strong read-your-writes per key.
///
/// `bump_exec_id` is a compare-and-set: the write is applied iff `id` is
/// strictly greater than the current value, and the return says whether it
/// was. Handlers are serialized per store, so a lost race means the value
/// was already recorded.
pub trait WatermarkStore: Send + Sync {
    fn read_offset(&self, cluster: &ClusterName) -> Result<Option<LogOffset>, WatermarkError>;
    fn write_offset(&self, cluster: &ClusterName, offset: LogOffset)
        -> Result<(), WatermarkError>;
    fn read_exec_ids(
        &self,
        cluster: &ClusterName,
    ) -> Result<BTreeMap<StoreName, ExecutionId>, WatermarkError>;
    fn bump_exec_id(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        id: ExecutionId,
    ) -> Result<bool, WatermarkError>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct MemoryState {
    offsets: BTreeMap<ClusterName, LogOffset>,
    exec_ids: BTreeMap<ClusterName, BTreeMap<StoreName, ExecutionId>>,
}

/// Watermark store held entirely in memory. Used by tests; also the seed
/// for fresh deployments before the first checkpoint.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    state: Mutex<MemoryState>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an execution id, as a prior process lifetime would have.
    pub fn seed_exec_id(&self, cluster: &ClusterName, store: &StoreName, id: ExecutionId) {
        let mut state = self.state.lock().expect("watermark lock poisoned");
        state
            .exec_ids
            .entry(cluster.clone())
            .or_default()
            .insert(store.clone(), id);
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn read_offset(&self, cluster: &ClusterName) -> Result<Option<LogOffset>, WatermarkError> {
        let state = self.state.lock().expect("watermark lock poisoned");
        Ok(state.offsets.get(cluster).copied())
    }

    fn write_offset(
        &self,
        cluster: &ClusterName,
        offset: LogOffset,
    ) -> Result<(), WatermarkError> {
        let mut state = self.state.lock().expect("watermark lock poisoned");
        if let Some(current) = state.offsets.get(cluster) {
            if offset < *current {
                return Err(WatermarkError::Regression {
                    cluster: cluster.clone(),
                    current: *current,
                    attempted: offset,
                });
            }
        }
        state.offsets.insert(cluster.clone(), offset);
        Ok(())
    }

    fn read_exec_ids(
        &self,
        cluster: &ClusterName,
    ) -> Result<BTreeMap<StoreName, ExecutionId>, WatermarkError> {
        let state = self.state.lock().expect("watermark lock poisoned");
        Ok(state.exec_ids.get(cluster).cloned().unwrap_or_default())
    }

    fn bump_exec_id(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        id: ExecutionId,
    ) -> Result<bool, WatermarkError> {
        let mut state = self.state.lock().expect("watermark lock poisoned");
        let ids = state.exec_ids.entry(cluster.clone()).or_default();
        match ids.get(store) {
            Some(current) if id <= *current => Ok(false),
            _ => {
                ids.insert(store.clone(), id);
                Ok(true)
            }
        }
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Watermark store persisted as small JSON files:
///
/// ```text
/// <root>/<cluster>/offset
/// <root>/<cluster>/exec_id/<store>
/// ```
///
/// A process-wide mutex serializes read-modify-write cycles; only one
/// consumer per cluster writes these files.
pub struct FileWatermarkStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileWatermarkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn offset_path(&self, cluster: &ClusterName) -> PathBuf {
        self.root.join(cluster.as_str()).join("offset")
    }

    fn exec_id_dir(&self, cluster: &ClusterName) -> PathBuf {
        self.root.join(cluster.as_str()).join("exec_id")
    }

    fn exec_id_path(&self, cluster: &ClusterName, store: &StoreName) -> PathBuf {
        self.exec_id_dir(cluster).join(store.as_str())
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn read_offset(&self, cluster: &ClusterName) -> Result<Option<LogOffset>, WatermarkError> {
        let _guard = self.lock.lock().expect("watermark lock poisoned");
        Ok(read_u64_optional(&self.offset_path(cluster))?.map(LogOffset))
    }

    fn write_offset(
        &self,
        cluster: &ClusterName,
        offset: LogOffset,
    ) -> Result<(), WatermarkError> {
        let _guard = self.lock.lock().expect("watermark lock poisoned");
        let path = self.offset_path(cluster);
        if let Some(current) = read_u64_optional(&path)?.map(LogOffset) {
            if offset < current {
                return Err(WatermarkError::Regression {
                    cluster: cluster.clone(),
                    current,
                    attempted: offset,
                });
            }
        }
        write_u64(&path, offset.get())
    }

    fn read_exec_ids(
        &self,
        cluster: &ClusterName,
    ) -> Result<BTreeMap<StoreName, ExecutionId>, WatermarkError> {
        let _guard = self.lock.lock().expect("watermark lock poisoned");
        let dir = self.exec_id_dir(cluster);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(WatermarkError::Read {
                    path: Box::new(dir),
                    source: err,
                })
            }
        };

        let mut ids = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| WatermarkError::Read {
                path: Box::new(dir.clone()),
                source,
            })?;
            let Ok(store) = StoreName::new(entry.file_name().to_string_lossy()) else {
                // Foreign file in the exec_id directory; not ours to read.
                continue;
            };
            if let Some(id) = read_u64_optional(&entry.path())? {
                ids.insert(store, ExecutionId(id));
            }
        }
        Ok(ids)
    }

    fn bump_exec_id(
        &self,
        cluster: &ClusterName,
        store: &StoreName,
        id: ExecutionId,
    ) -> Result<bool, WatermarkError> {
        let _guard = self.lock.lock().expect("watermark lock poisoned");
        let path = self.exec_id_path(cluster, store);
        if let Some(current) = read_u64_optional(&path)?.map(ExecutionId) {
            if id <= current {
                return Ok(false);
            }
        }
        write_u64(&path, id.get())?;
        Ok(true)
    }
}

fn read_u64_optional(path: &Path) -> Result<Option<u64>, WatermarkError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(WatermarkError::Read {
                path: Box::new(path.to_path_buf()),
                source: err,
            })
        }
    };
    let value = serde_json::from_slice(&bytes).map_err(|source| WatermarkError::Parse {
        path: Box::new(path.to_path_buf()),
        source,
    })?;
    Ok(Some(value))
}

fn write_u64(path: &Path, value: u64) -> Result<(), WatermarkError> {
    let write_err = |source| WatermarkError::Write {
        path: Box::new(path.to_path_buf()),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let bytes = serde_json::to_vec(&value).expect("u64 serializes");
    fs::write(path, bytes).map_err(write_err)?;
    // Watermark files carry consumption state for the whole cluster; keep
    // them owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let owner_only = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, owner_only).map_err(write_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterName {
        ClusterName::new("cluster0").unwrap()
    }

    fn store(name: &str) -> StoreName {
        StoreName::new(name).unwrap()
    }

    #[test]
    fn memory_offset_is_monotonic() {
        let wm = MemoryWatermarkStore::new();
        assert_eq!(wm.read_offset(&cluster()).unwrap(), None);
        wm.write_offset(&cluster(), LogOffset(5)).unwrap();
        // Equal rewrite is a no-op, not a regression.
        wm.write_offset(&cluster(), LogOffset(5)).unwrap();
        assert!(matches!(
            wm.write_offset(&cluster(), LogOffset(4)),
            Err(WatermarkError::Regression { .. })
        ));
        assert_eq!(wm.read_offset(&cluster()).unwrap(), Some(LogOffset(5)));
    }

    #[test]
    fn memory_bump_is_strictly_increasing_cas() {
        let wm = MemoryWatermarkStore::new();
        assert!(wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(3)).unwrap());
        assert!(!wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(3)).unwrap());
        assert!(!wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(2)).unwrap());
        assert!(wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(4)).unwrap());
        let ids = wm.read_exec_ids(&cluster()).unwrap();
        assert_eq!(ids.get(&store("a")), Some(&ExecutionId(4)));
    }

    #[test]
    fn file_store_roundtrips_layout() {
        let dir = tempfile::tempdir().unwrap();
        let wm = FileWatermarkStore::new(dir.path());

        assert_eq!(wm.read_offset(&cluster()).unwrap(), None);
        wm.write_offset(&cluster(), LogOffset(17)).unwrap();
        assert_eq!(wm.read_offset(&cluster()).unwrap(), Some(LogOffset(17)));
        assert!(dir.path().join("cluster0/offset").exists());

        assert!(wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(2)).unwrap());
        assert!(wm.bump_exec_id(&cluster(), &store("b"), ExecutionId(9)).unwrap());
        assert!(!wm.bump_exec_id(&cluster(), &store("b"), ExecutionId(9)).unwrap());
        assert!(dir.path().join("cluster0/exec_id/a").exists());

        let ids = wm.read_exec_ids(&cluster()).unwrap();
        assert_eq!(ids.get(&store("a")), Some(&ExecutionId(2)));
        assert_eq!(ids.get(&store("b")), Some(&ExecutionId(9)));
    }

    #[test]
    fn file_store_rejects_offset_regression() {
        let dir = tempfile::tempdir().unwrap();
        let wm = FileWatermarkStore::new(dir.path());
        wm.write_offset(&cluster(), LogOffset(10)).unwrap();
        assert!(matches!(
            wm.write_offset(&cluster(), LogOffset(9)),
            Err(WatermarkError::Regression { current, attempted, .. })
                if current == LogOffset(10) && attempted == LogOffset(9)
        ));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let wm = FileWatermarkStore::new(dir.path());
            wm.write_offset(&cluster(), LogOffset(3)).unwrap();
            wm.bump_exec_id(&cluster(), &store("a"), ExecutionId(1)).unwrap();
        }
        let wm = FileWatermarkStore::new(dir.path());
        assert_eq!(wm.read_offset(&cluster()).unwrap(), Some(LogOffset(3)));
        assert_eq!(
            wm.read_exec_ids(&cluster()).unwrap().get(&store("a")),
            Some(&ExecutionId(1))
        );
    }
}
