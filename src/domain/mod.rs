//! Domain layer: Core record types and the masking codec.
//!
//! Types here carry no I/O. Validation of loosely-typed upstream rows
//! happens in the adapters, which convert failures into [`DataError`].

mod case;
mod cluster;
mod district;
mod error;
pub mod masking;
mod patient;
mod summary;

pub use case::{AdmissionRisk, CaseRecord, DiseaseCategory, Severity};
pub use cluster::{squared_distance, KMeansModel, RiskModel, StandardScaler};
pub use district::{
    ClusterAssignment, ClusteredDistrict, Coordinates, Demographics, DistrictProfile, FeatureVector,
    Infrastructure, RiskRatings, RiskSnapshot, FEATURE_COUNT, FEATURE_NAMES,
};
pub use error::DataError;
pub use masking::{mask, unmask, MaskMap, MaskingError};
pub use patient::{Gender, PatientField, PatientRecord, PatientRow};
pub use summary::{AgeBracket, DiseaseMap, DiseaseSummary, DistrictRiskEcho, DistrictSummary, MainlyAffected};
