//! District reference data: infrastructure coverage and risk ratings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of features used to cluster districts.
pub const FEATURE_COUNT: usize = 12;

/// Feature vector in [`FEATURE_NAMES`] order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Reference-table column names of the clustering features, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "piped_water_dwelling_pct",
    "own_well_pct",
    "community_water_pct",
    "surface_water_pct",
    "one_toilet_pct",
    "two_toilet_pct",
    "three_plus_toilet_pct",
    "water_risk_rating",
    "sanitation_risk_rating",
    "crowding_risk_rating",
    "healthcare_access_risk_rating",
    "overall_risk_rating",
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub population_2023: u64,
    pub total_emigrants_2023: u64,
    pub migrant_density_per_1000: f64,
}

/// Household infrastructure coverage, in percent. `None` means not reported.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Infrastructure {
    pub piped_water_pct: Option<f64>,
    pub own_well_pct: Option<f64>,
    pub community_water_pct: Option<f64>,
    pub surface_water_pct: Option<f64>,
    pub one_toilet_pct: Option<f64>,
    pub two_toilet_pct: Option<f64>,
    pub three_plus_toilet_pct: Option<f64>,
}

/// Risk ratings on the 0-10 scale. `None` means not reported.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskRatings {
    pub water: Option<f64>,
    pub sanitation: Option<f64>,
    pub crowding: Option<f64>,
    pub healthcare_access: Option<f64>,
    pub overall: Option<f64>,
}

/// A missing or non-finite measurement reads as zero.
fn zero_fill(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

impl RiskRatings {
    /// Ratings with every missing value read as zero.
    #[must_use]
    pub fn zero_filled(&self) -> RiskSnapshot {
        RiskSnapshot {
            water_risk: zero_fill(self.water),
            sanitation_risk: zero_fill(self.sanitation),
            crowding_risk: zero_fill(self.crowding),
            healthcare_access_risk: zero_fill(self.healthcare_access),
            overall_risk: zero_fill(self.overall),
        }
    }
}

/// Zero-filled risk ratings as echoed into the published summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub water_risk: f64,
    pub sanitation_risk: f64,
    pub crowding_risk: f64,
    pub healthcare_access_risk: f64,
    pub overall_risk: f64,
}

/// Static reference profile of one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictProfile {
    /// Unique key
    pub name: String,
    pub region: Option<String>,
    pub coordinates: Coordinates,
    pub demographics: Demographics,
    pub infrastructure: Infrastructure,
    pub risk: RiskRatings,
}

impl DistrictProfile {
    /// A profile with only a name and risk ratings; everything else zero.
    #[must_use]
    pub fn new(name: impl Into<String>, risk: RiskRatings) -> Self {
        Self {
            name: name.into(),
            region: None,
            coordinates: Coordinates::default(),
            demographics: Demographics::default(),
            infrastructure: Infrastructure::default(),
            risk,
        }
    }

    /// Clustering features in [`FEATURE_NAMES`] order, missing or NaN values as zero.
    #[must_use]
    pub fn feature_vector(&self) -> FeatureVector {
        let infra = &self.infrastructure;
        let risk = &self.risk;
        [
            infra.piped_water_pct,
            infra.own_well_pct,
            infra.community_water_pct,
            infra.surface_water_pct,
            infra.one_toilet_pct,
            infra.two_toilet_pct,
            infra.three_plus_toilet_pct,
            risk.water,
            risk.sanitation,
            risk.crowding,
            risk.healthcare_access,
            risk.overall,
        ]
        .map(zero_fill)
    }
}

/// A district profile annotated with its risk cluster for this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredDistrict {
    #[serde(flatten)]
    pub profile: DistrictProfile,
    pub risk_cluster: usize,
}

/// District name to cluster id, valid only within the run that produced it.
pub type ClusterAssignment = BTreeMap<String, usize>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_zero_fills() {
        let mut profile = DistrictProfile::new(
            "Idukki",
            RiskRatings {
                water: Some(6.5),
                sanitation: None,
                crowding: Some(2.0),
                healthcare_access: Some(7.0),
                overall: Some(5.1),
            },
        );
        profile.infrastructure.piped_water_pct = Some(40.0);

        let v = profile.feature_vector();
        assert_eq!(v.len(), FEATURE_COUNT);
        assert!((v[0] - 40.0).abs() < f64::EPSILON);
        assert_eq!(v[1], 0.0);
        assert!((v[7] - 6.5).abs() < f64::EPSILON);
        assert_eq!(v[8], 0.0);
        assert!((v[11] - 5.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_filled_snapshot() {
        let snapshot = RiskRatings {
            water: Some(7.0),
            ..Default::default()
        }
        .zero_filled();
        assert!((snapshot.water_risk - 7.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.overall_risk, 0.0);
    }

    #[test]
    fn test_non_finite_values_zero_filled() {
        let mut profile = DistrictProfile::new(
            "Alappuzha",
            RiskRatings {
                water: Some(f64::NAN),
                crowding: Some(f64::INFINITY),
                ..Default::default()
            },
        );
        profile.infrastructure.own_well_pct = Some(f64::NAN);

        let v = profile.feature_vector();
        assert!(v.iter().all(|x| x.is_finite()));
        assert_eq!(v[1], 0.0);
        assert_eq!(v[7], 0.0);
        assert_eq!(v[9], 0.0);

        let snapshot = profile.risk.zero_filled();
        assert_eq!(snapshot.water_risk, 0.0);
        assert_eq!(snapshot.crowding_risk, 0.0);
    }
}
