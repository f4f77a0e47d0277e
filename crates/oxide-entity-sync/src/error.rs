//! Error types for schema synchronization.

use crate::synchronizer::DataLossWarning;

/// Errors raised while planning or applying a schema synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The plan drops data and nobody acknowledged it.
    #[error("synchronization would lose data ({}); acknowledge the plan to apply it", summary(.0))]
    SynchronizationDataLossWarning(Vec<DataLossWarning>),

    /// A snapshot could not be (de)serialized.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

fn summary(warnings: &[DataLossWarning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
