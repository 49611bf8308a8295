//! Console reports over a summary and the raw case table.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::{CaseRecord, DiseaseCategory, DistrictProfile, DistrictSummary, RiskSnapshot};

/// Coarse tag for the dominant risk of a district.
///
/// Joins every flagged tag with ", ", or `general` when none is flagged.
#[must_use]
pub fn risk_tag(ratings: &RiskSnapshot, threshold: f64) -> String {
    let mut tags = Vec::new();
    if ratings.water_risk > threshold || ratings.sanitation_risk > threshold {
        tags.push("water_sanitation");
    }
    if ratings.crowding_risk > threshold {
        tags.push("crowding");
    }
    if ratings.healthcare_access_risk > threshold {
        tags.push("healthcare_access");
    }
    if tags.is_empty() {
        tags.push("general");
    }
    tags.join(", ")
}

/// Human-readable summary, diseases sorted by case count (most first).
///
/// `top_n` limits the diseases listed per district.
#[must_use]
pub fn render_summary(summary: &DistrictSummary, top_n: Option<usize>, threshold: f64) -> String {
    let mut out = String::new();
    for (district, diseases) in &summary.districts {
        let _ = writeln!(out, "\n{district} disease summary:");

        let mut sorted: Vec<_> = diseases.iter().collect();
        // Stable: equal counts keep name order.
        sorted.sort_by(|a, b| b.1.cases.cmp(&a.1.cases));
        if let Some(n) = top_n {
            sorted.truncate(n);
        }

        for (disease, data) in sorted {
            let tag = risk_tag(&data.district_risk_snapshot.ratings, threshold);
            let age = data
                .mainly_affected
                .age_group
                .map_or("N/A", |a| a.label());
            let sex = data.mainly_affected.gender.map_or("N/A", |g| g.as_str());
            let causes = if data.possible_causes.is_empty() {
                "Unknown".to_string()
            } else {
                data.possible_causes.join(", ")
            };

            let _ = writeln!(out, "  {disease} [{tag}]: {} cases", data.cases);
            let _ = writeln!(out, "      - Primarily affected: Age {age}, Sex: {sex}");
            let _ = writeln!(out, "      - Possible causes: {causes}");
        }
    }
    out
}

/// Case count and mean water risk of one district for a disease category.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationRow {
    pub district: String,
    pub cases: usize,
    pub avg_water_risk: f64,
}

/// Districts with the most cases of `category`, with their mean water
/// risk. Cases in districts missing from the reference table are ignored.
#[must_use]
pub fn category_hotspots(
    cases: &[CaseRecord],
    districts: &[DistrictProfile],
    category: DiseaseCategory,
    top: usize,
) -> Vec<CorrelationRow> {
    let water: BTreeMap<&str, f64> = districts
        .iter()
        .map(|d| (d.name.as_str(), d.risk.water.unwrap_or(0.0)))
        .collect();

    let mut grouped: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for case in cases.iter().filter(|c| c.disease_category == category) {
        let Some(&risk) = water.get(case.district.as_str()) else {
            continue;
        };
        let entry = grouped.entry(case.district.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += risk;
    }

    let mut rows: Vec<CorrelationRow> = grouped
        .into_iter()
        .map(|(district, (count, risk_sum))| CorrelationRow {
            district: district.to_string(),
            cases: count,
            avg_water_risk: risk_sum / count as f64,
        })
        .collect();
    rows.sort_by(|a, b| b.cases.cmp(&a.cases));
    rows.truncate(top);
    rows
}
