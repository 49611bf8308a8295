//! Snapshot builder: the full rebuild sequence behind `rebuild()`.
//!
//! Cluster districts, fetch live data, mask, analyze, publish. Rebuilds are
//! serialized by a lock around the whole sequence; readers of the published
//! artifact never take it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::{check_referential_integrity, PatternAnalyzer, RiskClusterer};
use crate::adapters::SourceError;
use crate::config::PipelineConfig;
use crate::domain::{mask, DistrictSummary, PatientField, PatientRow};
use crate::ports::{RecordSource, ReferenceSource, SnapshotStore};
use crate::PipelineError;

/// Rebuilds and publishes the district summary.
pub struct SnapshotService<R, D, P>
where
    R: RecordSource,
    D: ReferenceSource,
    P: SnapshotStore,
{
    records: Arc<R>,
    reference: Arc<D>,
    store: Arc<P>,
    clusterer: RiskClusterer,
    analyzer: PatternAnalyzer,
    mask_fields: BTreeSet<PatientField>,
    unresolved_tolerance: f64,
    rebuild_lock: Mutex<()>,
    generation: AtomicU64,
}

impl<R, D, P> SnapshotService<R, D, P>
where
    R: RecordSource,
    D: ReferenceSource,
    P: SnapshotStore,
    R::Error: Into<SourceError>,
    D::Error: Into<SourceError>,
{
    /// Create a new snapshot service.
    pub fn new(records: Arc<R>, reference: Arc<D>, store: Arc<P>, config: &PipelineConfig) -> Self {
        Self {
            records,
            reference,
            store,
            clusterer: RiskClusterer::new(config.clustering),
            analyzer: PatternAnalyzer::new(config.risk_threshold),
            mask_fields: config.mask_fields.clone(),
            unresolved_tolerance: config.unresolved_tolerance,
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Recompute the summary from scratch and publish it.
    ///
    /// Safe to call repeatedly and from several threads; concurrent calls
    /// run one after another.
    ///
    /// # Errors
    /// Returns error if any step fails. Nothing is published in that case
    /// and the previous artifact stays authoritative.
    pub fn rebuild(&self) -> Result<DistrictSummary, PipelineError> {
        // The guarded value is (), so a poisoned lock carries no bad state.
        let _guard = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();

        match self.build_and_publish() {
            Ok(summary) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(
                    "Snapshot #{} rebuilt: {} districts, {} cases in {:?}",
                    generation,
                    summary.len(),
                    summary.total_cases(),
                    started.elapsed()
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Rebuild failed, keeping previous snapshot: {e}");
                Err(e)
            }
        }
    }

    fn build_and_publish(&self) -> Result<DistrictSummary, PipelineError> {
        tracing::debug!("Step 1: Clustering districts...");
        let profiles = self
            .reference
            .fetch_district_profiles()
            .map_err(|e| PipelineError::Source(e.into()))?;
        let outcome = self.clusterer.cluster(&profiles)?;

        tracing::debug!("Step 2: Fetching live records...");
        let patients = self
            .records
            .fetch_patients()
            .map_err(|e| PipelineError::Source(e.into()))?;
        let cases = self
            .records
            .fetch_cases()
            .map_err(|e| PipelineError::Source(e.into()))?;

        let plain: Vec<PatientRow> = patients.iter().map(PatientRow::from).collect();
        check_referential_integrity(&plain, &cases, self.unresolved_tolerance)?;
        drop(plain);

        tracing::debug!("Step 3: Masking {} patients...", patients.len());
        let (masked, mask_map) = mask(&patients, &self.mask_fields)?;
        drop(patients);

        tracing::debug!("Step 4: Analyzing patterns...");
        let summary = self
            .analyzer
            .analyze(&masked, &cases, &outcome.districts, Some(&mask_map));
        drop(mask_map);

        tracing::debug!("Step 5: Publishing...");
        if let Err(e) = self.store.publish_model(&outcome.model, &outcome.districts) {
            tracing::warn!("Failed to persist risk model: {e}");
        }
        self.store.publish(&summary)?;

        Ok(summary)
    }

    /// Number of successful rebuilds so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<P> {
        &self.store
    }
}
