//! Disease case records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Broad transmission category of a disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseCategory {
    WaterBorne,
    VectorBorne,
    Respiratory,
}

impl DiseaseCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaterBorne => "water_borne",
            Self::VectorBorne => "vector_borne",
            Self::Respiratory => "respiratory",
        }
    }
}

impl fmt::Display for DiseaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiseaseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "water_borne" => Ok(Self::WaterBorne),
            "vector_borne" => Ok(Self::VectorBorne),
            "respiratory" => Ok(Self::Respiratory),
            other => Err(format!("unknown disease category '{other}'")),
        }
    }
}

/// Clinical severity at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// District risk ratings captured when the patient was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdmissionRisk {
    pub water_risk: Option<f64>,
    pub crowding_risk: Option<f64>,
    pub overall_risk: Option<f64>,
}

/// A single disease case. Append-only upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,

    /// Foreign key into the patient batch
    pub patient_id: String,

    pub hospital_id: Option<String>,

    pub district: String,

    pub disease_name: String,

    pub disease_category: DiseaseCategory,

    pub severity: Severity,

    pub outcome: String,

    pub admitted_at: chrono::DateTime<chrono::Utc>,

    pub is_migrant_patient: bool,

    pub risk_at_admission: AdmissionRisk,
}

impl CaseRecord {
    /// Create a case admitted now with no recorded admission risk.
    #[must_use]
    pub fn new(
        case_id: impl Into<String>,
        patient_id: impl Into<String>,
        district: impl Into<String>,
        disease_name: impl Into<String>,
        disease_category: DiseaseCategory,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            patient_id: patient_id.into(),
            hospital_id: None,
            district: district.into(),
            disease_name: disease_name.into(),
            disease_category,
            severity: Severity::Moderate,
            outcome: "Recovered".to_string(),
            admitted_at: chrono::Utc::now(),
            is_migrant_patient: false,
            risk_at_admission: AdmissionRisk::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("water_borne".parse(), Ok(DiseaseCategory::WaterBorne));
        assert_eq!("vector_borne".parse(), Ok(DiseaseCategory::VectorBorne));
        assert_eq!("respiratory".parse(), Ok(DiseaseCategory::Respiratory));
        assert!("airborne".parse::<DiseaseCategory>().is_err());
    }

    #[test]
    fn test_category_serde_matches_display() {
        let json = serde_json::to_string(&DiseaseCategory::WaterBorne).expect("Should serialize");
        assert_eq!(json, "\"water_borne\"");
    }

    #[test]
    fn test_severity_parse_case_insensitive() {
        assert_eq!("SEVERE".parse(), Ok(Severity::Severe));
        assert!("critical".parse::<Severity>().is_err());
    }
}
