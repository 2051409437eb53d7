//! Crate-level error surface and failure classification.

use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::DecodeError;
use crate::log::LogError;
use crate::watermark::WatermarkError;

/// How the consumer must react to a failed execution attempt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailureClass {
    /// Leave the head in place, back off, try again.
    Retriable,
    /// Treat as success: advance the watermark, pop the head.
    Ignorable,
    /// Halt the worker pool and surface to the operator.
    Fatal,
}

/// Failure of one execution attempt: the backend call itself, or the
/// watermark bump that commits it.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Watermark(#[from] WatermarkError),
}

impl ExecError {
    pub fn classify(&self) -> FailureClass {
        match self {
            ExecError::Backend(BackendError::Retriable { .. }) => FailureClass::Retriable,
            ExecError::Backend(BackendError::Unsupported { .. }) => FailureClass::Ignorable,
            ExecError::Backend(BackendError::Rejected { .. }) => FailureClass::Fatal,
            // A watermark that moves backwards or cannot be written means
            // progress accounting is broken; nothing safe to retry.
            ExecError::Watermark(_) => FailureClass::Fatal,
        }
    }
}

/// Crate-level convenience error: a thin wrapper over the per-boundary
/// error enums, not a replacement for them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] DecodeError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Watermark(#[from] WatermarkError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_buckets() {
        let retriable = ExecError::Backend(BackendError::retriable("zk timeout"));
        assert_eq!(retriable.classify(), FailureClass::Retriable);

        let ignorable = ExecError::Backend(BackendError::unsupported("no push jobs here"));
        assert_eq!(ignorable.classify(), FailureClass::Ignorable);

        let fatal = ExecError::Backend(BackendError::rejected("schema id conflict"));
        assert_eq!(fatal.classify(), FailureClass::Fatal);

        let regression = ExecError::Watermark(WatermarkError::Regression {
            cluster: crate::core::ClusterName::new("c").unwrap(),
            current: crate::core::LogOffset(5),
            attempted: crate::core::LogOffset(4),
        });
        assert_eq!(regression.classify(), FailureClass::Fatal);
    }
}
