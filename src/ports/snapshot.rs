//! Snapshot store port: where the published summary lives.

use crate::domain::{ClusteredDistrict, DistrictSummary, RiskModel};

/// Errors raised while publishing or reading the summary artifact.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to swap artifact into place: {0}")]
    Persist(String),
}

/// Trait for the shared summary artifact.
///
/// `publish` replaces the artifact wholesale; readers calling `load` see
/// either the previous or the new artifact, never a partial one.
pub trait SnapshotStore: Send + Sync {
    /// Replace the published summary.
    ///
    /// # Errors
    /// Returns error if the artifact cannot be written. The previous
    /// artifact is left in place.
    fn publish(&self, summary: &DistrictSummary) -> Result<(), PublishError>;

    /// Read the last published summary.
    ///
    /// # Returns
    /// `None` if nothing has been published yet.
    ///
    /// # Errors
    /// Returns error if the artifact exists but cannot be read.
    fn load(&self) -> Result<Option<DistrictSummary>, PublishError>;

    /// Persist the fitted risk model and the clustered table for reuse.
    ///
    /// Stores without a model location keep nothing.
    ///
    /// # Errors
    /// Returns error if the model cannot be written.
    fn publish_model(&self, _model: &RiskModel, _districts: &[ClusteredDistrict]) -> Result<(), PublishError> {
        Ok(())
    }
}
