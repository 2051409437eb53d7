//! Identity atoms for the admin log domain.
//!
//! ClusterName: logical cluster the admin log belongs to
//! StoreName: store targeted by an operation, plus system-store naming
//! ExecutionId: producer-assigned logical clock
//! LogOffset: position in the admin log

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::InvalidName;

/// Prefix for the per-store metadata system store.
const METADATA_STORE_PREFIX: &str = "metadata_store_";

/// Prefix for the cluster-shared metadata store.
const SHARED_METADATA_STORE_PREFIX: &str = "shared_metadata_store_";

/// Reserved store key for records that do not target a single store.
const CLUSTER_WIDE_STORE_KEY: &str = "__cluster_wide__";

fn valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
}

/// Logical cluster name - non-empty, `[A-Za-z0-9_.-]`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterName(String);

impl ClusterName {
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidName> {
        let s = s.into();
        if valid_name(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidName::Cluster { raw: s })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClusterName({:?})", self.0)
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store name - non-empty, `[A-Za-z0-9_.-]`.
///
/// System stores are distinguished by naming convention, the same way the
/// rest of the platform addresses them on the wire.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreName(String);

/// Which platform-internal system store a name denotes, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemStoreKind {
    /// `metadata_store_<store>`: per-store metadata system store.
    MetadataStore,
    /// `shared_metadata_store_<cluster>`: cluster-shared metadata store.
    SharedMetadataStore,
}

impl StoreName {
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidName> {
        let s = s.into();
        if valid_name(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidName::Store { raw: s })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reserved key under which cluster-wide records are queued.
    pub fn cluster_wide() -> Self {
        Self(CLUSTER_WIDE_STORE_KEY.to_string())
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.0 == CLUSTER_WIDE_STORE_KEY
    }

    /// Name of the metadata system store that mirrors this store.
    pub fn metadata_store_for(store: &StoreName) -> Self {
        Self(format!("{METADATA_STORE_PREFIX}{store}"))
    }

    /// Name of the shared metadata store for a cluster.
    pub fn shared_metadata_store_for(cluster: &ClusterName) -> Self {
        Self(format!("{SHARED_METADATA_STORE_PREFIX}{cluster}"))
    }

    pub fn system_store_kind(&self) -> Option<SystemStoreKind> {
        if self.0.starts_with(METADATA_STORE_PREFIX) {
            Some(SystemStoreKind::MetadataStore)
        } else if self.0.starts_with(SHARED_METADATA_STORE_PREFIX) {
            Some(SystemStoreKind::SharedMetadataStore)
        } else {
            None
        }
    }

    pub fn is_system_store(&self) -> bool {
        self.system_store_kind().is_some()
    }

    /// For a metadata system store, the user store it belongs to.
    pub fn user_store(&self) -> Option<StoreName> {
        self.0
            .strip_prefix(METADATA_STORE_PREFIX)
            .map(|rest| Self(rest.to_string()))
    }

    /// Extract the store from a version-topic name (`<store>_v<N>`).
    pub fn parse_from_version_topic(topic: &str) -> Result<Self, InvalidName> {
        let Some(idx) = topic.rfind("_v") else {
            return Err(InvalidName::VersionTopic {
                raw: topic.to_string(),
            });
        };
        let (store, suffix) = topic.split_at(idx);
        let digits = &suffix[2..];
        if store.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidName::VersionTopic {
                raw: topic.to_string(),
            });
        }
        StoreName::new(store)
    }
}

impl fmt::Debug for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreName({:?})", self.0)
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Producer-assigned execution id, strictly increasing per producer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl ExecutionId {
    pub const ZERO: Self = Self(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the admin log. Offsets start at 1; 0 means "nothing consumed".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogOffset(pub u64);

impl LogOffset {
    pub const ZERO: Self = Self(0);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Offset immediately before this one; `None` at the stream start.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl fmt::Display for LogOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_bad_names() {
        assert!(ClusterName::new("").is_err());
        assert!(StoreName::new("a store").is_err());
        assert!(StoreName::new("user_activity").is_ok());
        assert!(ClusterName::new("prod-dc2.cluster-0").is_ok());
    }

    #[test]
    fn system_store_classification() {
        let store = StoreName::new("user_activity").unwrap();
        assert_eq!(store.system_store_kind(), None);

        let meta = StoreName::metadata_store_for(&store);
        assert_eq!(meta.system_store_kind(), Some(SystemStoreKind::MetadataStore));
        assert_eq!(meta.user_store(), Some(store.clone()));

        let cluster = ClusterName::new("cluster0").unwrap();
        let shared = StoreName::shared_metadata_store_for(&cluster);
        assert_eq!(
            shared.system_store_kind(),
            Some(SystemStoreKind::SharedMetadataStore)
        );
    }

    #[test]
    fn version_topic_parsing() {
        let store = StoreName::parse_from_version_topic("user_activity_v3").unwrap();
        assert_eq!(store.as_str(), "user_activity");

        // Store names may themselves contain "_v".
        let store = StoreName::parse_from_version_topic("my_v2_store_v17").unwrap();
        assert_eq!(store.as_str(), "my_v2_store");

        assert!(StoreName::parse_from_version_topic("no_version_suffix").is_err());
        assert!(StoreName::parse_from_version_topic("_v3").is_err());
    }

    #[test]
    fn offset_arithmetic() {
        assert_eq!(LogOffset(5).prev(), Some(LogOffset(4)));
        assert_eq!(LogOffset::ZERO.prev(), None);
        assert_eq!(LogOffset(5).next(), LogOffset(6));
    }
}
