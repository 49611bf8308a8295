//! Record source ports: live patient/case data and district reference data.
//!
//! These traits abstract the upstream stores (SQLite, CSV) from the
//! analytics pipeline. Implementations validate rows at the fetch boundary
//! and never hand back loosely-typed records.

use crate::domain::{CaseRecord, DistrictProfile, PatientRecord};

/// Source of live patient and case records.
pub trait RecordSource: Send + Sync {
    /// Error type for fetch operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch every patient.
    ///
    /// # Errors
    /// Returns error if the store is unreachable or a row fails validation.
    fn fetch_patients(&self) -> Result<Vec<PatientRecord>, Self::Error>;

    /// Fetch every disease case.
    ///
    /// # Errors
    /// Returns error if the store is unreachable or a row fails validation.
    fn fetch_cases(&self) -> Result<Vec<CaseRecord>, Self::Error>;
}

/// Source of static district reference profiles.
pub trait ReferenceSource: Send + Sync {
    /// Error type for fetch operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch every district profile.
    ///
    /// # Errors
    /// Returns error if the table is unreadable or missing required columns.
    fn fetch_district_profiles(&self) -> Result<Vec<DistrictProfile>, Self::Error>;
}
