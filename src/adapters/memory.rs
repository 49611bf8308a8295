//! In-memory adapters for embedding and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::SourceError;
use crate::domain::{CaseRecord, DistrictProfile, DistrictSummary, PatientRecord};
use crate::ports::{PublishError, RecordSource, ReferenceSource, SnapshotStore};

/// Patient, case and district tables held in memory.
#[derive(Default)]
pub struct InMemorySource {
    patients: RwLock<Vec<PatientRecord>>,
    cases: RwLock<Vec<CaseRecord>>,
    districts: RwLock<Vec<DistrictProfile>>,
}

impl InMemorySource {
    #[must_use]
    pub fn new(districts: Vec<DistrictProfile>) -> Self {
        Self {
            districts: RwLock::new(districts),
            ..Self::default()
        }
    }

    /// Append patients and cases, as an upstream insert would.
    ///
    /// # Errors
    /// Returns `SourceError::LockPoisoned` if a writer panicked earlier.
    pub fn append(&self, patients: Vec<PatientRecord>, cases: Vec<CaseRecord>) -> Result<(), SourceError> {
        self.patients
            .write()
            .map_err(|_| SourceError::LockPoisoned)?
            .extend(patients);
        self.cases
            .write()
            .map_err(|_| SourceError::LockPoisoned)?
            .extend(cases);
        Ok(())
    }
}

impl RecordSource for InMemorySource {
    type Error = SourceError;

    fn fetch_patients(&self) -> Result<Vec<PatientRecord>, Self::Error> {
        Ok(self.patients.read().map_err(|_| SourceError::LockPoisoned)?.clone())
    }

    fn fetch_cases(&self) -> Result<Vec<CaseRecord>, Self::Error> {
        Ok(self.cases.read().map_err(|_| SourceError::LockPoisoned)?.clone())
    }
}

impl ReferenceSource for InMemorySource {
    type Error = SourceError;

    fn fetch_district_profiles(&self) -> Result<Vec<DistrictProfile>, Self::Error> {
        Ok(self.districts.read().map_err(|_| SourceError::LockPoisoned)?.clone())
    }
}

/// Summary artifact held in memory.
#[derive(Default)]
pub struct MemorySnapshotStore {
    current: RwLock<Option<DistrictSummary>>,
    publishes: AtomicUsize,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful publishes so far.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn publish(&self, summary: &DistrictSummary) -> Result<(), PublishError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| PublishError::Persist("snapshot lock poisoned".to_string()))?;
        *current = Some(summary.clone());
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<DistrictSummary>, PublishError> {
        let current = self
            .current
            .read()
            .map_err(|_| PublishError::Persist("snapshot lock poisoned".to_string()))?;
        Ok(current.clone())
    }
}
