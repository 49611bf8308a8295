//! Reversible de-identification of patient fields.
//!
//! Identifiers, names and ages are replaced by a truncated SHA-256 digest;
//! free-text fields by a random alphanumeric string of similar length.
//! Reversal is a lookup in the run's [`MaskMap`], never a digest inversion.
//!
//! # Security
//!
//! The map holds original PII. It is not serializable, its `Debug` output
//! only reports the entry count, and original values are zeroized on drop.

use std::collections::{BTreeSet, HashMap};

use rand::distributions::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::{PatientField, PatientRecord, PatientRow};

/// Length of a digest token in hex characters.
pub const DIGEST_TOKEN_LEN: usize = 10;

/// Shortest random token, even for very short originals.
pub const MIN_RANDOM_TOKEN_LEN: usize = 5;

/// Errors raised while masking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskingError {
    #[error("Masked token '{masked}' would map to two distinct original values")]
    Collision { masked: String },
}

/// How a field is masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    /// Truncated one-way digest
    Digest,
    /// Cosmetic random string, length close to the original
    Random,
}

impl PatientField {
    #[must_use]
    pub fn strategy(&self) -> MaskStrategy {
        match self {
            Self::Address => MaskStrategy::Random,
            Self::PatientId | Self::Name | Self::Age => MaskStrategy::Digest,
        }
    }
}

/// Bidirectional masked/original mapping scoped to one pipeline run.
#[derive(Default)]
pub struct MaskMap {
    to_original: HashMap<String, String>,
    to_masked: HashMap<String, String>,
}

impl MaskMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct masked values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }

    /// Original value behind a masked token.
    #[must_use]
    pub fn original(&self, masked: &str) -> Option<&str> {
        self.to_original.get(masked).map(String::as_str)
    }

    /// Token already assigned to an original value in this run.
    #[must_use]
    pub fn masked(&self, original: &str) -> Option<&str> {
        self.to_masked.get(original).map(String::as_str)
    }

    /// Original value if `value` is a known token, otherwise `value` itself.
    #[must_use]
    pub fn resolve<'a>(&'a self, value: &'a str) -> &'a str {
        self.original(value).unwrap_or(value)
    }

    /// Record a token for an original value.
    ///
    /// # Errors
    /// Returns `MaskingError::Collision` if the token is already bound to a
    /// different original.
    pub fn record(&mut self, masked: String, original: &str) -> Result<(), MaskingError> {
        if let Some(existing) = self.to_original.get(&masked) {
            if existing != original {
                return Err(MaskingError::Collision { masked });
            }
            return Ok(());
        }
        self.to_masked.insert(original.to_string(), masked.clone());
        self.to_original.insert(masked, original.to_string());
        Ok(())
    }

    /// Mask one value, reusing the token if this original was seen before.
    fn mask_value<R: Rng + ?Sized>(
        &mut self,
        original: &str,
        strategy: MaskStrategy,
        rng: &mut R,
    ) -> Result<String, MaskingError> {
        if let Some(token) = self.to_masked.get(original) {
            return Ok(token.clone());
        }

        let token = match strategy {
            MaskStrategy::Digest => digest_token(original),
            MaskStrategy::Random => loop {
                let candidate = random_token(original, rng);
                if !self.to_original.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        self.record(token.clone(), original)?;
        Ok(token)
    }
}

impl std::fmt::Debug for MaskMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskMap")
            .field("entries", &self.to_original.len())
            .finish()
    }
}

impl Drop for MaskMap {
    fn drop(&mut self) {
        for original in self.to_original.values_mut() {
            original.zeroize();
        }
        // Keys of the reverse map are the originals.
        for (mut original, _) in self.to_masked.drain() {
            original.zeroize();
        }
    }
}

/// Truncated hex SHA-256 of the value's text.
#[must_use]
pub fn digest_token(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..DIGEST_TOKEN_LEN / 2]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn random_token<R: Rng + ?Sized>(original: &str, rng: &mut R) -> String {
    let len = original.chars().count().max(MIN_RANDOM_TOKEN_LEN);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Mask the given fields of every record.
///
/// Records missing a configured field (no address) keep that field absent.
/// Input records are not modified.
///
/// # Errors
/// Returns `MaskingError::Collision` if two distinct values share a digest.
pub fn mask(
    records: &[PatientRecord],
    fields: &BTreeSet<PatientField>,
) -> Result<(Vec<PatientRow>, MaskMap), MaskingError> {
    let mut rng = ChaCha20Rng::from_entropy();
    mask_with_rng(records, fields, &mut rng)
}

/// [`mask`] with a caller-supplied RNG for the random-string fields.
///
/// # Errors
/// Returns `MaskingError::Collision` if two distinct values share a digest.
pub fn mask_with_rng<R: Rng + ?Sized>(
    records: &[PatientRecord],
    fields: &BTreeSet<PatientField>,
    rng: &mut R,
) -> Result<(Vec<PatientRow>, MaskMap), MaskingError> {
    let mut map = MaskMap::new();
    let mut rows: Vec<PatientRow> = records.iter().map(PatientRow::from).collect();

    for &field in fields {
        let strategy = field.strategy();
        for row in &mut rows {
            let Some(slot) = row.field_mut(field) else {
                continue;
            };
            let token = map.mask_value(slot, strategy, rng)?;
            *slot = token;
        }
    }

    tracing::debug!(
        "Masked {} records over {} fields ({} distinct values)",
        rows.len(),
        fields.len(),
        map.len()
    );
    Ok((rows, map))
}

/// Replace every known token in the maskable fields with its original.
///
/// Unknown values pass through unchanged.
#[must_use]
pub fn unmask(rows: &[PatientRow], map: &MaskMap) -> Vec<PatientRow> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            for field in PatientField::ALL {
                if let Some(slot) = row.field_mut(field) {
                    if let Some(original) = map.original(slot) {
                        *slot = original.to_string();
                    }
                }
            }
            row
        })
        .collect()
}
