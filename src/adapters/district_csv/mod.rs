//! District CSV adapter: Implementation of ReferenceSource.
//!
//! Reads the district master table and exports the clustered table.
//! Empty cells and the usual missing markers (`NA`, `N/A`, `null`, `NaN`)
//! in numeric columns are read as missing and zero-filled later by the
//! clusterer; absent columns are an error.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer, Serialize};

use super::SourceError;
use crate::domain::{
    ClusteredDistrict, Coordinates, DataError, Demographics, DistrictProfile, Infrastructure, RiskRatings,
    FEATURE_NAMES,
};
use crate::ports::ReferenceSource;

const TABLE: &str = "districts";

/// Cell values read as missing, compared case-insensitively.
const MISSING_MARKERS: [&str; 9] = ["na", "n/a", "nan", "-nan", "null", "none", "<na>", "#n/a", "#na"];

/// Numeric cell that tolerates blanks and missing markers.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let cell = raw.trim();
    if cell.is_empty() || MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    let value = cell
        .parse::<f64>()
        .map_err(|e| de::Error::custom(format!("invalid number '{cell}': {e}")))?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

/// One row of the district master table.
#[derive(Debug, Deserialize)]
struct DistrictRow {
    district: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    population_2023: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_emigrants_2023: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    migrant_density_per_1000: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    piped_water_dwelling_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    own_well_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    community_water_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    surface_water_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    one_toilet_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    two_toilet_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    three_plus_toilet_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    water_risk_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sanitation_risk_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    crowding_risk_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    healthcare_access_risk_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    overall_risk_rating: Option<f64>,
}

impl From<DistrictRow> for DistrictProfile {
    fn from(row: DistrictRow) -> Self {
        Self {
            name: row.district.trim().to_string(),
            region: row.region.filter(|r| !r.trim().is_empty()),
            coordinates: Coordinates {
                lat: row.latitude.unwrap_or(0.0),
                lon: row.longitude.unwrap_or(0.0),
            },
            demographics: Demographics {
                population_2023: row.population_2023.unwrap_or(0.0).max(0.0) as u64,
                total_emigrants_2023: row.total_emigrants_2023.unwrap_or(0.0).max(0.0) as u64,
                migrant_density_per_1000: row.migrant_density_per_1000.unwrap_or(0.0),
            },
            infrastructure: Infrastructure {
                piped_water_pct: row.piped_water_dwelling_pct,
                own_well_pct: row.own_well_pct,
                community_water_pct: row.community_water_pct,
                surface_water_pct: row.surface_water_pct,
                one_toilet_pct: row.one_toilet_pct,
                two_toilet_pct: row.two_toilet_pct,
                three_plus_toilet_pct: row.three_plus_toilet_pct,
            },
            risk: RiskRatings {
                water: row.water_risk_rating,
                sanitation: row.sanitation_risk_rating,
                crowding: row.crowding_risk_rating,
                healthcare_access: row.healthcare_access_risk_rating,
                overall: row.overall_risk_rating,
            },
        }
    }
}

/// One row of the exported clustered table.
#[derive(Debug, Serialize)]
struct ClusteredRow<'a> {
    district: &'a str,
    latitude: f64,
    longitude: f64,
    water_risk_rating: Option<f64>,
    sanitation_risk_rating: Option<f64>,
    crowding_risk_rating: Option<f64>,
    healthcare_access_risk_rating: Option<f64>,
    overall_risk_rating: Option<f64>,
    risk_cluster: usize,
}

/// Parse a district master table.
///
/// # Errors
/// Returns `DataError::MissingColumn` if the header lacks the district key
/// or a clustering feature, `DataError::DuplicateKey` for a repeated
/// district, or a CSV error for unparsable cells.
pub fn read_profiles<R: io::Read>(reader: R) -> Result<Vec<DistrictProfile>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: HashSet<String> = rdr.headers()?.iter().map(str::to_string).collect();
    for column in std::iter::once("district").chain(FEATURE_NAMES) {
        if !headers.contains(column) {
            return Err(DataError::MissingColumn {
                table: TABLE,
                column: column.to_string(),
            }
            .into());
        }
    }

    let mut seen = HashSet::new();
    let mut profiles = Vec::new();
    for row in rdr.deserialize::<DistrictRow>() {
        let profile = DistrictProfile::from(row?);
        if !seen.insert(profile.name.clone()) {
            return Err(DataError::DuplicateKey {
                table: TABLE,
                key: profile.name,
            }
            .into());
        }
        profiles.push(profile);
    }

    Ok(profiles)
}

/// Write the clustered table (one row per district with its cluster id).
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn write_clustered<W: io::Write>(writer: W, districts: &[ClusteredDistrict]) -> Result<(), SourceError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for d in districts {
        let p = &d.profile;
        wtr.serialize(ClusteredRow {
            district: &p.name,
            latitude: p.coordinates.lat,
            longitude: p.coordinates.lon,
            water_risk_rating: p.risk.water,
            sanitation_risk_rating: p.risk.sanitation,
            crowding_risk_rating: p.risk.crowding,
            healthcare_access_risk_rating: p.risk.healthcare_access,
            overall_risk_rating: p.risk.overall,
            risk_cluster: d.risk_cluster,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// District master table stored as a CSV file.
pub struct CsvDistrictSource {
    path: PathBuf,
}

impl CsvDistrictSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReferenceSource for CsvDistrictSource {
    type Error = SourceError;

    fn fetch_district_profiles(&self) -> Result<Vec<DistrictProfile>, Self::Error> {
        let file = std::fs::File::open(&self.path)?;
        let profiles = read_profiles(file)?;
        tracing::debug!("Loaded {} districts from {}", profiles.len(), self.path.display());
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "district,region,latitude,longitude,population_2023,total_emigrants_2023,migrant_density_per_1000,piped_water_dwelling_pct,own_well_pct,community_water_pct,surface_water_pct,one_toilet_pct,two_toilet_pct,three_plus_toilet_pct,water_risk_rating,sanitation_risk_rating,crowding_risk_rating,healthcare_access_risk_rating,overall_risk_rating";

    #[test]
    fn test_read_profiles() {
        let data = format!(
            "{HEADER}\nKottayam,Central,9.59,76.52,1974551,220000,111.4,30.1,55.2,10.0,4.7,60,25,15,7,3,2,1,4.5\nWayanad,North,11.68,76.13,846637,40000,47.2,,70.0,5.0,,70,20,10,6,6,3,8,6.1\n"
        );
        let profiles = read_profiles(data.as_bytes()).expect("Should parse");
        assert_eq!(profiles.len(), 2);

        let kottayam = &profiles[0];
        assert_eq!(kottayam.name, "Kottayam");
        assert_eq!(kottayam.region.as_deref(), Some("Central"));
        assert_eq!(kottayam.demographics.population_2023, 1_974_551);
        assert_eq!(kottayam.risk.water, Some(7.0));
        assert_eq!(kottayam.risk.healthcare_access, Some(1.0));

        let wayanad = &profiles[1];
        assert_eq!(wayanad.infrastructure.piped_water_pct, None);
        assert_eq!(wayanad.infrastructure.surface_water_pct, None);
        assert_eq!(wayanad.feature_vector()[0], 0.0);
    }

    #[test]
    fn test_missing_markers_read_as_missing() {
        let data = format!(
            "{HEADER}\nThrissur,Central,10.5,76.2,NA,null,n/a,NaN,N/A,nan,,NULL,None,#N/A,7,3,2,1,4.5\n"
        );
        let profiles = read_profiles(data.as_bytes()).expect("Should parse");
        let thrissur = &profiles[0];

        assert_eq!(thrissur.demographics.population_2023, 0);
        assert_eq!(thrissur.infrastructure.piped_water_pct, None);
        assert_eq!(thrissur.infrastructure.own_well_pct, None);
        assert_eq!(thrissur.infrastructure.three_plus_toilet_pct, None);
        assert_eq!(thrissur.risk.water, Some(7.0));
        assert!(thrissur.feature_vector().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_garbage_number_rejected() {
        let data = format!("{HEADER}\nKannur,North,11.8,75.3,1,1,1,lots,1,1,1,1,1,1,1,1,1,1,1\n");
        let err = read_profiles(data.as_bytes()).expect_err("Should reject");
        assert!(matches!(err, SourceError::Csv(_)));
    }

    #[test]
    fn test_missing_feature_column() {
        let data = "district,water_risk_rating\nKottayam,7\n";
        let err = read_profiles(data.as_bytes()).expect_err("Should reject");
        assert!(matches!(
            err,
            SourceError::Data(DataError::MissingColumn { ref column, .. }) if column == "piped_water_dwelling_pct"
        ));
    }

    #[test]
    fn test_duplicate_district() {
        let row = "Kollam,South,8.9,76.6,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1";
        let data = format!("{HEADER}\n{row}\n{row}\n");
        let err = read_profiles(data.as_bytes()).expect_err("Should reject");
        assert!(matches!(err, SourceError::Data(DataError::DuplicateKey { .. })));
    }

    #[test]
    fn test_header_only_is_empty() {
        let profiles = read_profiles(format!("{HEADER}\n").as_bytes()).expect("Should parse");
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_write_clustered() {
        let profile = DistrictProfile::new(
            "Kottayam",
            RiskRatings {
                water: Some(7.0),
                ..Default::default()
            },
        );
        let rows = vec![ClusteredDistrict {
            profile,
            risk_cluster: 2,
        }];

        let mut out = Vec::new();
        write_clustered(&mut out, &rows).expect("Should write");
        let text = String::from_utf8(out).expect("Should be utf8");
        let mut lines = text.lines();
        assert!(lines.next().expect("Header").ends_with("risk_cluster"));
        let line = lines.next().expect("Row");
        assert!(line.starts_with("Kottayam,"));
        assert!(line.ends_with(",2"));
    }
}
