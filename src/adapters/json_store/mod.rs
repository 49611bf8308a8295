//! JSON file adapter: Implementation of SnapshotStore.
//!
//! The summary is written to a temporary file in the artifact's directory,
//! synced, then renamed over the artifact. Readers open the path directly
//! and never take a lock, so they see the previous or the new document,
//! never a torn one.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::adapters::district_csv;
use crate::domain::{ClusteredDistrict, DistrictSummary, RiskModel};
use crate::ports::{PublishError, SnapshotStore};

/// File name of the persisted risk model inside the model directory.
pub const MODEL_FILE: &str = "risk_model.json";

/// File name of the clustered table inside the model directory.
pub const CLUSTERED_FILE: &str = "clustered_districts.csv";

/// Summary artifact stored as pretty-printed JSON.
pub struct JsonFileStore {
    path: PathBuf,
    model_dir: Option<PathBuf>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            model_dir: None,
        }
    }

    /// Also persist the fitted model and clustered table under `dir`.
    #[must_use]
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace `path` with `bytes` via a synced temp file and rename.
///
/// # Errors
/// Returns error if the temp file cannot be written or swapped in; the
/// existing file is untouched in that case.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| PublishError::Persist(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

impl SnapshotStore for JsonFileStore {
    fn publish(&self, summary: &DistrictSummary) -> Result<(), PublishError> {
        let bytes = serde_json::to_vec_pretty(summary)?;
        write_atomic(&self.path, &bytes)?;

        tracing::info!(
            "Published summary for {} districts to {}",
            summary.len(),
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<DistrictSummary>, PublishError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn publish_model(&self, model: &RiskModel, districts: &[ClusteredDistrict]) -> Result<(), PublishError> {
        let Some(dir) = &self.model_dir else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(model)?;
        write_atomic(&dir.join(MODEL_FILE), &bytes)?;

        let mut table = Vec::new();
        district_csv::write_clustered(&mut table, districts)
            .map_err(|e| PublishError::Persist(format!("clustered table: {e}")))?;
        write_atomic(&dir.join(CLUSTERED_FILE), &table)?;

        tracing::debug!("Persisted risk model ({} clusters) to {}", model.kmeans.k(), dir.display());
        Ok(())
    }
}
