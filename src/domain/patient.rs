//! Patient records as fetched from the live store, plus the string-typed
//! row view used while records are masked for transport.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DataError;

/// Recorded gender of a patient.
///
/// Ordering is alphabetical by label and is used as the tie-break when
/// picking the dominant gender of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    /// Other or unrecorded
    Other,
}

impl Gender {
    /// Lenient parser: anything unrecognised is `Other`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient as stored upstream. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Stable unique identifier (e.g. `KL00000042`)
    pub patient_id: String,

    pub name: String,

    /// Age in whole years
    pub age: u32,

    pub gender: Gender,

    /// Foreign key into the district reference table
    pub district: String,

    pub is_migrant: bool,

    /// Free-text address, absent for most synthetic records
    pub address: Option<String>,
}

impl PatientRecord {
    #[must_use]
    pub fn new(
        patient_id: impl Into<String>,
        name: impl Into<String>,
        age: u32,
        gender: Gender,
        district: impl Into<String>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            name: name.into(),
            age,
            gender,
            district: district.into(),
            is_migrant: false,
            address: None,
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn migrant(mut self, is_migrant: bool) -> Self {
        self.is_migrant = is_migrant;
        self
    }
}

/// Patient fields that may be de-identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatientField {
    PatientId,
    Name,
    Age,
    Address,
}

impl PatientField {
    pub const ALL: [PatientField; 4] = [Self::PatientId, Self::Name, Self::Age, Self::Address];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientId => "patient_id",
            Self::Name => "name",
            Self::Age => "age",
            Self::Address => "address",
        }
    }
}

impl FromStr for PatientField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patient_id" => Ok(Self::PatientId),
            "name" => Ok(Self::Name),
            "age" => Ok(Self::Age),
            "address" => Ok(Self::Address),
            other => Err(format!("Unknown patient field '{other}'")),
        }
    }
}

/// String-typed view of a patient, able to carry masked tokens in any
/// maskable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRow {
    pub patient_id: String,
    pub name: String,
    pub age: String,
    pub gender: Gender,
    pub district: String,
    pub is_migrant: bool,
    pub address: Option<String>,
}

impl PatientRow {
    /// Value of a maskable field, `None` when the record does not carry it.
    #[must_use]
    pub fn field(&self, field: PatientField) -> Option<&str> {
        match field {
            PatientField::PatientId => Some(&self.patient_id),
            PatientField::Name => Some(&self.name),
            PatientField::Age => Some(&self.age),
            PatientField::Address => self.address.as_deref(),
        }
    }

    /// Mutable slot for a maskable field, `None` when the record does not carry it.
    pub fn field_mut(&mut self, field: PatientField) -> Option<&mut String> {
        match field {
            PatientField::PatientId => Some(&mut self.patient_id),
            PatientField::Name => Some(&mut self.name),
            PatientField::Age => Some(&mut self.age),
            PatientField::Address => self.address.as_mut(),
        }
    }

    /// Convert back to a typed record.
    ///
    /// # Errors
    /// Returns `DataError::InvalidRecord` if the age is not a whole number,
    /// which is the case for a row that is still masked.
    pub fn to_record(&self) -> Result<PatientRecord, DataError> {
        let age = self.age.trim().parse::<u32>().map_err(|_| {
            DataError::invalid("patients", &self.patient_id, format!("age '{}' is not a whole number", self.age))
        })?;

        Ok(PatientRecord {
            patient_id: self.patient_id.clone(),
            name: self.name.clone(),
            age,
            gender: self.gender,
            district: self.district.clone(),
            is_migrant: self.is_migrant,
            address: self.address.clone(),
        })
    }
}

impl From<&PatientRecord> for PatientRow {
    fn from(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.patient_id.clone(),
            name: record.name.clone(),
            age: record.age.to_string(),
            gender: record.gender,
            district: record.district.clone(),
            is_migrant: record.is_migrant,
            address: record.address.clone(),
        }
    }
}
