//! The published per-district, per-disease summary.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Gender, RiskSnapshot};

/// Fixed age brackets, youngest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "0-14")]
    Child,
    #[serde(rename = "15-24")]
    Youth,
    #[serde(rename = "25-44")]
    Adult,
    #[serde(rename = "45-64")]
    MiddleAged,
    #[serde(rename = "65+")]
    Senior,
}

impl AgeBracket {
    /// All brackets in enumeration order; earlier entries win ties.
    pub const ALL: [AgeBracket; 5] = [
        Self::Child,
        Self::Youth,
        Self::Adult,
        Self::MiddleAged,
        Self::Senior,
    ];

    #[must_use]
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=14 => Self::Child,
            15..=24 => Self::Youth,
            25..=44 => Self::Adult,
            45..=64 => Self::MiddleAged,
            _ => Self::Senior,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Child => "0-14",
            Self::Youth => "15-24",
            Self::Adult => "25-44",
            Self::MiddleAged => "45-64",
            Self::Senior => "65+",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dominant demographic of the patients affected by one disease.
///
/// When no case of the disease resolved to a patient the age group falls
/// back to the youngest bracket and the gender is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MainlyAffected {
    pub age_group: Option<AgeBracket>,
    pub gender: Option<Gender>,
}

/// District risk ratings echoed next to each disease entry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistrictRiskEcho {
    #[serde(flatten)]
    pub ratings: RiskSnapshot,
    pub risk_cluster: usize,
}

/// Summary of one disease within one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseSummary {
    /// Every case counts, resolved patient or not
    pub cases: usize,
    pub mainly_affected: MainlyAffected,
    pub possible_causes: Vec<String>,
    pub district_risk_snapshot: DistrictRiskEcho,
}

/// Disease name to summary for one district.
pub type DiseaseMap = BTreeMap<String, DiseaseSummary>;

/// District name to disease map. Rebuilt wholesale every run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictSummary {
    pub districts: BTreeMap<String, DiseaseMap>,
}

impl DistrictSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, district: &str) -> Option<&DiseaseMap> {
        self.districts.get(district)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Total cases across every district and disease.
    #[must_use]
    pub fn total_cases(&self) -> usize {
        self.districts
            .values()
            .flat_map(|diseases| diseases.values())
            .map(|d| d.cases)
            .sum()
    }
}
