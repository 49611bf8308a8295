//! Pattern analyzer: per-district, per-disease demographic breakdowns and
//! candidate causes.
//!
//! The analyzer is a pure function of its inputs. Masked patient rows are
//! unmasked first when a [`MaskMap`] is supplied; analysis always runs on
//! real values.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::domain::{
    unmask, AgeBracket, CaseRecord, ClusteredDistrict, DataError, DiseaseMap, DiseaseSummary, DistrictRiskEcho,
    DistrictSummary, Gender, MainlyAffected, MaskMap, PatientRecord, PatientRow, RiskRatings,
};

/// Ratings strictly above this flag a cause.
pub const DEFAULT_RISK_THRESHOLD: f64 = 5.0;

pub const CAUSE_WATER: &str = "High water risk";
pub const CAUSE_SANITATION: &str = "Poor sanitation";
pub const CAUSE_CROWDING: &str = "High population density / crowding";
pub const CAUSE_HEALTHCARE: &str = "Low healthcare access";

/// Joins patients, cases and the clustered district table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternAnalyzer {
    threshold: f64,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_THRESHOLD)
    }
}

impl PatternAnalyzer {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Summarize every district in the clustered table.
    ///
    /// Districts without cases map to an empty disease map.
    #[must_use]
    pub fn analyze(
        &self,
        patients: &[PatientRow],
        cases: &[CaseRecord],
        districts: &[ClusteredDistrict],
        mask_map: Option<&MaskMap>,
    ) -> DistrictSummary {
        let patients = resolve_patients(patients, mask_map);

        let mut summary = DistrictSummary::new();
        for district in districts {
            // First row wins for a repeated district name.
            if summary.districts.contains_key(&district.profile.name) {
                continue;
            }
            let diseases = self.summarize_district(district, &patients, cases);
            summary.districts.insert(district.profile.name.clone(), diseases);
        }

        tracing::info!(
            "Analyzed {} cases across {} districts",
            summary.total_cases(),
            summary.len()
        );
        summary
    }

    /// Summarize a single district.
    ///
    /// # Returns
    /// `None` if the district is not in the clustered table.
    #[must_use]
    pub fn analyze_district(
        &self,
        district: &str,
        patients: &[PatientRow],
        cases: &[CaseRecord],
        districts: &[ClusteredDistrict],
        mask_map: Option<&MaskMap>,
    ) -> Option<DiseaseMap> {
        let profile = districts.iter().find(|d| d.profile.name == district)?;

        // District is never masked, so filter before unmasking.
        let local: Vec<PatientRow> = patients.iter().filter(|p| p.district == district).cloned().collect();
        let patients = resolve_patients(&local, mask_map);
        Some(self.summarize_district(profile, &patients, cases))
    }

    /// Causes flagged by the district's ratings, in fixed order.
    #[must_use]
    pub fn possible_causes(&self, risk: &RiskRatings) -> Vec<String> {
        let snapshot = risk.zero_filled();
        [
            (snapshot.water_risk, CAUSE_WATER),
            (snapshot.sanitation_risk, CAUSE_SANITATION),
            (snapshot.crowding_risk, CAUSE_CROWDING),
            (snapshot.healthcare_access_risk, CAUSE_HEALTHCARE),
        ]
        .into_iter()
        .filter(|(rating, _)| *rating > self.threshold)
        .map(|(_, cause)| cause.to_string())
        .collect()
    }

    fn summarize_district(
        &self,
        district: &ClusteredDistrict,
        patients: &[PatientRecord],
        cases: &[CaseRecord],
    ) -> DiseaseMap {
        let name = district.profile.name.as_str();

        let mut local_patients: HashMap<&str, &PatientRecord> = HashMap::new();
        for patient in patients.iter().filter(|p| p.district == name) {
            local_patients.entry(patient.patient_id.as_str()).or_insert(patient);
        }

        let mut by_disease: BTreeMap<&str, Vec<&CaseRecord>> = BTreeMap::new();
        for case in cases.iter().filter(|c| c.district == name) {
            by_disease.entry(case.disease_name.as_str()).or_default().push(case);
        }

        let causes = self.possible_causes(&district.profile.risk);
        let echo = DistrictRiskEcho {
            ratings: district.profile.risk.zero_filled(),
            risk_cluster: district.risk_cluster,
        };

        by_disease
            .into_iter()
            .map(|(disease, disease_cases)| {
                let ids: BTreeSet<&str> = disease_cases.iter().map(|c| c.patient_id.as_str()).collect();
                let affected: Vec<&PatientRecord> =
                    ids.iter().filter_map(|id| local_patients.get(id).copied()).collect();

                let summary = DiseaseSummary {
                    cases: disease_cases.len(),
                    mainly_affected: mainly_affected(&affected),
                    possible_causes: causes.clone(),
                    district_risk_snapshot: echo,
                };
                (disease.to_string(), summary)
            })
            .collect()
    }
}

/// Dominant age bracket and gender. Ties go to the youngest bracket and to
/// the alphabetically first gender.
///
/// With no resolved patients every bracket ties at zero, so the youngest
/// bracket is reported while the gender stays unknown.
#[must_use]
pub fn mainly_affected(patients: &[&PatientRecord]) -> MainlyAffected {
    let mut ages = [0usize; AgeBracket::ALL.len()];
    let mut genders: BTreeMap<Gender, usize> = BTreeMap::new();
    for patient in patients {
        let bracket = AgeBracket::for_age(patient.age);
        if let Some(slot) = AgeBracket::ALL.iter().position(|b| *b == bracket) {
            ages[slot] += 1;
        }
        *genders.entry(patient.gender).or_insert(0) += 1;
    }

    let mut age_group = AgeBracket::ALL[0];
    let mut best = ages[0];
    for (bracket, &count) in AgeBracket::ALL.iter().zip(&ages).skip(1) {
        if count > best {
            best = count;
            age_group = *bracket;
        }
    }

    let mut gender = None;
    let mut best = 0;
    for (g, &count) in &genders {
        if count > best {
            best = count;
            gender = Some(*g);
        }
    }

    MainlyAffected {
        age_group: Some(age_group),
        gender,
    }
}

/// Unmask (when a map is given) and type every row, skipping rows that do
/// not convert.
fn resolve_patients(rows: &[PatientRow], mask_map: Option<&MaskMap>) -> Vec<PatientRecord> {
    let unmasked;
    let rows = match mask_map {
        Some(map) => {
            unmasked = unmask(rows, map);
            unmasked.as_slice()
        }
        None => rows,
    };

    rows.iter()
        .filter_map(|row| match row.to_record() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping patient row: {e}");
                None
            }
        })
        .collect()
}

/// How well cases join to patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinReport {
    pub total_cases: usize,
    /// Cases whose patient id is not in the patient batch
    pub unresolved_cases: usize,
}

impl JoinReport {
    #[must_use]
    pub fn unresolved_fraction(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.unresolved_cases as f64 / self.total_cases as f64
        }
    }
}

/// Count cases that reference unknown patients and enforce a tolerance.
///
/// Patient ids are compared as given, so pass both sides in the same
/// (masked or unmasked) form.
///
/// # Errors
/// Returns `DataError::UnresolvedPatients` if the unresolved fraction
/// exceeds `tolerance`.
pub fn check_referential_integrity(
    patients: &[PatientRow],
    cases: &[CaseRecord],
    tolerance: f64,
) -> Result<JoinReport, DataError> {
    let known: HashSet<&str> = patients.iter().map(|p| p.patient_id.as_str()).collect();
    let unresolved_cases = cases
        .iter()
        .filter(|c| !known.contains(c.patient_id.as_str()))
        .count();
    let report = JoinReport {
        total_cases: cases.len(),
        unresolved_cases,
    };

    if report.unresolved_fraction() > tolerance {
        return Err(DataError::UnresolvedPatients {
            unresolved: report.unresolved_cases,
            total: report.total_cases,
            tolerance,
        });
    }
    if report.unresolved_cases > 0 {
        tracing::warn!(
            "{} of {} cases reference unknown patients; excluded from demographics",
            report.unresolved_cases,
            report.total_cases
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{mask, DiseaseCategory, DistrictProfile, PatientField};

    fn kottayam() -> ClusteredDistrict {
        ClusteredDistrict {
            profile: DistrictProfile::new(
                "Kottayam",
                RiskRatings {
                    water: Some(7.0),
                    sanitation: Some(3.0),
                    crowding: Some(2.0),
                    healthcare_access: Some(1.0),
                    overall: Some(4.0),
                },
            ),
            risk_cluster: 2,
        }
    }

    fn wayanad() -> ClusteredDistrict {
        ClusteredDistrict {
            profile: DistrictProfile::new("Wayanad", RiskRatings::default()),
            risk_cluster: 0,
        }
    }

    fn cholera_patients() -> Vec<PatientRecord> {
        vec![
            PatientRecord::new("KL00000001", "Anu", 10, Gender::Female, "Kottayam"),
            PatientRecord::new("KL00000002", "Biju", 30, Gender::Male, "Kottayam"),
            PatientRecord::new("KL00000003", "Chinnamma", 70, Gender::Female, "Kottayam"),
        ]
    }

    fn cholera_cases() -> Vec<CaseRecord> {
        (1..=3)
            .map(|i| {
                CaseRecord::new(
                    format!("CASE0000000{i}"),
                    format!("KL0000000{i}"),
                    "Kottayam",
                    "Cholera",
                    DiseaseCategory::WaterBorne,
                )
            })
            .collect()
    }

    fn rows(records: &[PatientRecord]) -> Vec<PatientRow> {
        records.iter().map(PatientRow::from).collect()
    }

    #[test]
    fn test_kottayam_cholera() {
        let summary = PatternAnalyzer::default().analyze(
            &rows(&cholera_patients()),
            &cholera_cases(),
            &[kottayam()],
            None,
        );

        let cholera = &summary.get("Kottayam").expect("Should have district")["Cholera"];
        assert_eq!(cholera.cases, 3);
        // One patient per bracket: youngest wins the tie.
        assert_eq!(cholera.mainly_affected.age_group, Some(AgeBracket::Child));
        assert_eq!(cholera.mainly_affected.gender, Some(Gender::Female));
        assert_eq!(cholera.possible_causes, vec![CAUSE_WATER.to_string()]);
        assert_eq!(cholera.district_risk_snapshot.risk_cluster, 2);
        assert!((cholera.district_risk_snapshot.ratings.water_risk - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_masked_input_matches_plain() {
        let patients = cholera_patients();
        let fields: BTreeSet<PatientField> = PatientField::ALL.into_iter().collect();
        let (masked, map) = mask(&patients, &fields).expect("Should mask");
        let analyzer = PatternAnalyzer::default();

        let plain = analyzer.analyze(&rows(&patients), &cholera_cases(), &[kottayam()], None);
        let unmasked = analyzer.analyze(&masked, &cholera_cases(), &[kottayam()], Some(&map));
        assert_eq!(plain, unmasked);
    }

    #[test]
    fn test_district_without_cases() {
        let summary = PatternAnalyzer::default().analyze(
            &rows(&cholera_patients()),
            &cholera_cases(),
            &[kottayam(), wayanad()],
            None,
        );
        assert_eq!(summary.len(), 2);
        assert!(summary.get("Wayanad").expect("Should be present").is_empty());
    }

    #[test]
    fn test_unresolved_patient_still_counted() {
        let mut cases = cholera_cases();
        cases.push(CaseRecord::new(
            "CASE00000009",
            "KL00000099",
            "Kottayam",
            "Cholera",
            DiseaseCategory::WaterBorne,
        ));
        cases.push(CaseRecord::new(
            "CASE00000010",
            "KL00000098",
            "Kottayam",
            "Typhoid",
            DiseaseCategory::WaterBorne,
        ));

        let summary = PatternAnalyzer::default().analyze(&rows(&cholera_patients()), &cases, &[kottayam()], None);
        let diseases = summary.get("Kottayam").expect("Should have district");

        assert_eq!(diseases["Cholera"].cases, 4);
        assert_eq!(diseases["Cholera"].mainly_affected.gender, Some(Gender::Female));
        assert_eq!(diseases["Typhoid"].cases, 1);
        let typhoid = diseases["Typhoid"].mainly_affected;
        assert_eq!(typhoid.age_group, Some(AgeBracket::Child));
        assert_eq!(typhoid.gender, None);
    }

    #[test]
    fn test_patient_from_other_district_not_affected() {
        let patients = vec![PatientRecord::new("KL00000001", "Anu", 50, Gender::Male, "Wayanad")];
        let cases = vec![CaseRecord::new(
            "CASE00000001",
            "KL00000001",
            "Kottayam",
            "Dengue",
            DiseaseCategory::VectorBorne,
        )];

        let summary = PatternAnalyzer::default().analyze(&rows(&patients), &cases, &[kottayam(), wayanad()], None);
        let dengue = &summary.get("Kottayam").expect("Should have district")["Dengue"];
        assert_eq!(dengue.cases, 1);
        assert_eq!(dengue.mainly_affected.age_group, Some(AgeBracket::Child));
        assert_eq!(dengue.mainly_affected.gender, None);
        assert!(summary.get("Wayanad").expect("Should be present").is_empty());
    }

    #[test]
    fn test_gender_tie_is_alphabetical() {
        let patients = [
            PatientRecord::new("1", "a", 30, Gender::Male, "X"),
            PatientRecord::new("2", "b", 30, Gender::Female, "X"),
        ];
        let refs: Vec<&PatientRecord> = patients.iter().collect();
        assert_eq!(mainly_affected(&refs).gender, Some(Gender::Female));
    }

    #[test]
    fn test_possible_causes_order_and_threshold() {
        let analyzer = PatternAnalyzer::default();
        let all = RiskRatings {
            water: Some(9.0),
            sanitation: Some(6.0),
            crowding: Some(5.5),
            healthcare_access: Some(8.0),
            overall: None,
        };
        assert_eq!(
            analyzer.possible_causes(&all),
            vec![CAUSE_WATER, CAUSE_SANITATION, CAUSE_CROWDING, CAUSE_HEALTHCARE]
        );

        let at_threshold = RiskRatings {
            water: Some(5.0),
            ..Default::default()
        };
        assert!(analyzer.possible_causes(&at_threshold).is_empty());
        assert_eq!(PatternAnalyzer::new(4.0).possible_causes(&at_threshold), vec![CAUSE_WATER]);
    }

    #[test]
    fn test_analyze_is_pure() {
        let analyzer = PatternAnalyzer::default();
        let patients = rows(&cholera_patients());
        let first = analyzer.analyze(&patients, &cholera_cases(), &[kottayam(), wayanad()], None);
        let second = analyzer.analyze(&patients, &cholera_cases(), &[kottayam(), wayanad()], None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyze_district() {
        let analyzer = PatternAnalyzer::default();
        let patients = rows(&cholera_patients());
        let districts = [kottayam(), wayanad()];

        let one = analyzer
            .analyze_district("Kottayam", &patients, &cholera_cases(), &districts, None)
            .expect("Should find district");
        let all = analyzer.analyze(&patients, &cholera_cases(), &districts, None);
        assert_eq!(Some(&one), all.get("Kottayam"));
        assert!(analyzer
            .analyze_district("Thrissur", &patients, &cholera_cases(), &districts, None)
            .is_none());
    }

    #[test]
    fn test_referential_integrity() {
        let patients = rows(&cholera_patients());
        let mut cases = cholera_cases();
        let report = check_referential_integrity(&patients, &cases, 0.0).expect("Should pass");
        assert_eq!(report.unresolved_cases, 0);

        cases.push(CaseRecord::new("CASE1", "ghost", "Kottayam", "Cholera", DiseaseCategory::WaterBorne));
        let report = check_referential_integrity(&patients, &cases, 0.5).expect("Should tolerate");
        assert_eq!(report.unresolved_cases, 1);
        assert!((report.unresolved_fraction() - 0.25).abs() < f64::EPSILON);

        let err = check_referential_integrity(&patients, &cases, 0.1).expect_err("Should reject");
        assert_eq!(
            err,
            DataError::UnresolvedPatients {
                unresolved: 1,
                total: 4,
                tolerance: 0.1
            }
        );
    }

    #[test]
    fn test_no_resolved_patients_defaults_to_youngest_bracket() {
        let cases = vec![CaseRecord::new(
            "CASE00000001",
            "ghost",
            "Kottayam",
            "Leptospirosis",
            DiseaseCategory::WaterBorne,
        )];

        let summary = PatternAnalyzer::default().analyze(&[], &cases, &[kottayam()], None);
        let entry = &summary.get("Kottayam").expect("Should have district")["Leptospirosis"];
        assert_eq!(entry.mainly_affected.age_group, Some(AgeBracket::Child));
        assert_eq!(entry.mainly_affected.gender, None);

        let json = serde_json::to_value(entry.mainly_affected).expect("Should serialize");
        assert_eq!(json["age_group"], "0-14");
        assert!(json["gender"].is_null());
    }
}
