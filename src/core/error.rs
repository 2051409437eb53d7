//! Core validation errors.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidName {
    #[error("invalid cluster name: {raw:?}")]
    Cluster { raw: String },
    #[error("invalid store name: {raw:?}")]
    Store { raw: String },
    #[error("not a version topic name: {raw:?}")]
    VersionTopic { raw: String },
}
