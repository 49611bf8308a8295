//! SQLite adapter: Implementation of RecordSource.
//!
//! Holds the live `patients` and `disease_cases` tables. Rows are validated
//! as they are read; a malformed row fails the whole fetch with a
//! `DataError` instead of surfacing later as a missing field.
//!
//! # Mutex Behavior
//!
//! The connection is protected by `Mutex`. A poisoned mutex fails the
//! operation with `SourceError::LockPoisoned`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, Row};

use super::SourceError;
use crate::domain::{AdmissionRisk, CaseRecord, DataError, DiseaseCategory, Gender, PatientRecord, Severity};
use crate::ports::RecordSource;

/// SQLite-backed live record store.
pub struct SqliteRecordSource {
    conn: Mutex<Connection>,
}

impl SqliteRecordSource {
    /// Open (or create) the store at the given path.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let conn = Connection::open(path)?;
        let source = Self {
            conn: Mutex::new(conn),
        };
        source.init_schema()?;
        Ok(source)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, SourceError> {
        let conn = Connection::open_in_memory()?;
        let source = Self {
            conn: Mutex::new(conn),
        };
        source.init_schema()?;
        Ok(source)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SourceError> {
        self.conn.lock().map_err(|_| SourceError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), SourceError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS patients (
                patient_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                district TEXT NOT NULL,
                is_migrant INTEGER NOT NULL DEFAULT 0,
                address TEXT
            );

            CREATE TABLE IF NOT EXISTS disease_cases (
                case_id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                hospital_id TEXT,
                district TEXT NOT NULL,
                disease_name TEXT NOT NULL,
                disease_category TEXT NOT NULL,
                severity TEXT NOT NULL,
                outcome TEXT NOT NULL,
                admission_date TEXT NOT NULL,
                is_migrant_patient INTEGER NOT NULL DEFAULT 0,
                water_risk REAL,
                crowding_risk REAL,
                overall_risk REAL
            );

            CREATE INDEX IF NOT EXISTS idx_cases_district
                ON disease_cases(district);
            ",
        )?;

        Ok(())
    }

    /// Insert or replace patients in one transaction.
    ///
    /// # Errors
    /// Returns error if any insert fails; nothing is written in that case.
    pub fn insert_patients(&self, patients: &[PatientRecord]) -> Result<(), SourceError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r"
                INSERT OR REPLACE INTO patients (
                    patient_id, name, age, gender, district, is_migrant, address
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )?;
            for p in patients {
                stmt.execute(params![
                    p.patient_id,
                    p.name,
                    i64::from(p.age),
                    p.gender.as_str(),
                    p.district,
                    p.is_migrant as i64,
                    p.address,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} patients", patients.len());
        Ok(())
    }

    /// Insert or replace cases in one transaction.
    ///
    /// # Errors
    /// Returns error if any insert fails; nothing is written in that case.
    pub fn insert_cases(&self, cases: &[CaseRecord]) -> Result<(), SourceError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r"
                INSERT OR REPLACE INTO disease_cases (
                    case_id, patient_id, hospital_id, district, disease_name,
                    disease_category, severity, outcome, admission_date,
                    is_migrant_patient, water_risk, crowding_risk, overall_risk
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ",
            )?;
            for c in cases {
                stmt.execute(params![
                    c.case_id,
                    c.patient_id,
                    c.hospital_id,
                    c.district,
                    c.disease_name,
                    c.disease_category.as_str(),
                    c.severity.as_str(),
                    c.outcome,
                    c.admitted_at.to_rfc3339(),
                    c.is_migrant_patient as i64,
                    c.risk_at_admission.water_risk,
                    c.risk_at_admission.crowding_risk,
                    c.risk_at_admission.overall_risk,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} disease cases", cases.len());
        Ok(())
    }

    /// Count rows in both live tables as `(patients, cases)`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn counts(&self) -> Result<(usize, usize), SourceError> {
        let conn = self.lock()?;
        let patients: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        let cases: i64 = conn.query_row("SELECT COUNT(*) FROM disease_cases", [], |row| row.get(0))?;
        Ok((patients as usize, cases as usize))
    }
}

/// Raw patient row before validation.
struct PatientColumns {
    patient_id: String,
    name: String,
    age: i64,
    gender: String,
    district: String,
    is_migrant: i64,
    address: Option<String>,
}

impl PatientColumns {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            patient_id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            district: row.get(4)?,
            is_migrant: row.get(5)?,
            address: row.get(6)?,
        })
    }

    fn validate(self) -> Result<PatientRecord, DataError> {
        let age = u32::try_from(self.age)
            .map_err(|_| DataError::invalid("patients", &self.patient_id, format!("age {} out of range", self.age)))?;

        Ok(PatientRecord {
            patient_id: self.patient_id,
            name: self.name,
            age,
            gender: Gender::parse_lenient(&self.gender),
            district: self.district,
            is_migrant: self.is_migrant != 0,
            address: self.address,
        })
    }
}

/// Raw case row before validation.
struct CaseColumns {
    case_id: String,
    patient_id: String,
    hospital_id: Option<String>,
    district: String,
    disease_name: String,
    disease_category: String,
    severity: String,
    outcome: String,
    admission_date: String,
    is_migrant_patient: i64,
    water_risk: Option<f64>,
    crowding_risk: Option<f64>,
    overall_risk: Option<f64>,
}

impl CaseColumns {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            patient_id: row.get(1)?,
            hospital_id: row.get(2)?,
            district: row.get(3)?,
            disease_name: row.get(4)?,
            disease_category: row.get(5)?,
            severity: row.get(6)?,
            outcome: row.get(7)?,
            admission_date: row.get(8)?,
            is_migrant_patient: row.get(9)?,
            water_risk: row.get(10)?,
            crowding_risk: row.get(11)?,
            overall_risk: row.get(12)?,
        })
    }

    fn validate(self) -> Result<CaseRecord, DataError> {
        let disease_category = self
            .disease_category
            .parse::<DiseaseCategory>()
            .map_err(|reason: String| DataError::invalid("disease_cases", &self.case_id, reason))?;
        let severity = self
            .severity
            .parse::<Severity>()
            .map_err(|reason: String| DataError::invalid("disease_cases", &self.case_id, reason))?;
        let admitted_at = chrono::DateTime::parse_from_rfc3339(&self.admission_date)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| {
                DataError::invalid(
                    "disease_cases",
                    &self.case_id,
                    format!("admission_date '{}': {e}", self.admission_date),
                )
            })?;

        Ok(CaseRecord {
            case_id: self.case_id,
            patient_id: self.patient_id,
            hospital_id: self.hospital_id,
            district: self.district,
            disease_name: self.disease_name,
            disease_category,
            severity,
            outcome: self.outcome,
            admitted_at,
            is_migrant_patient: self.is_migrant_patient != 0,
            risk_at_admission: AdmissionRisk {
                water_risk: self.water_risk,
                crowding_risk: self.crowding_risk,
                overall_risk: self.overall_risk,
            },
        })
    }
}

impl RecordSource for SqliteRecordSource {
    type Error = SourceError;

    fn fetch_patients(&self) -> Result<Vec<PatientRecord>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT patient_id, name, age, gender, district, is_migrant, address
            FROM patients
            ORDER BY patient_id
            ",
        )?;

        let rows = stmt
            .query_map([], PatientColumns::read)?
            .collect::<Result<Vec<_>, _>>()?;

        let patients = rows
            .into_iter()
            .map(PatientColumns::validate)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Fetched {} patients", patients.len());
        Ok(patients)
    }

    fn fetch_cases(&self) -> Result<Vec<CaseRecord>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT case_id, patient_id, hospital_id, district, disease_name,
                   disease_category, severity, outcome, admission_date,
                   is_migrant_patient, water_risk, crowding_risk, overall_risk
            FROM disease_cases
            ORDER BY case_id
            ",
        )?;

        let rows = stmt
            .query_map([], CaseColumns::read)?
            .collect::<Result<Vec<_>, _>>()?;

        let cases = rows
            .into_iter()
            .map(CaseColumns::validate)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Fetched {} disease cases", cases.len());
        Ok(cases)
    }
}
