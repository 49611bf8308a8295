//! Pipeline configuration.
//!
//! Built once at process start and passed by reference to the adapters and
//! services that need it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use crate::application::{ClusterConfig, DEFAULT_RISK_THRESHOLD};
use crate::domain::PatientField;

/// Locations and tuning for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// District reference table
    pub districts_csv: PathBuf,

    /// SQLite database holding live patients and cases
    pub database: PathBuf,

    /// Published summary artifact
    pub artifact: PathBuf,

    /// Where the fitted model and clustered table go, if anywhere
    pub model_dir: Option<PathBuf>,

    pub clustering: ClusterConfig,

    /// Ratings strictly above this flag a possible cause
    pub risk_threshold: f64,

    /// Largest tolerated fraction of cases whose patient is unknown.
    ///
    /// 1.0 tolerates every unresolved case.
    pub unresolved_tolerance: f64,

    pub mask_fields: BTreeSet<PatientField>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            districts_csv: PathBuf::from("data/kerala_master_dataset.csv"),
            database: PathBuf::from("data/district_pulse.db"),
            artifact: PathBuf::from("district_data/district_data.json"),
            model_dir: None,
            clustering: ClusterConfig::default(),
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            unresolved_tolerance: 1.0,
            mask_fields: PatientField::ALL.into_iter().collect(),
        }
    }
}

impl PipelineConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Invalid values are ignored and the default kept.
    ///
    /// Supported:
    /// - DISTRICT_PULSE_DISTRICTS_CSV, DISTRICT_PULSE_DATABASE,
    ///   DISTRICT_PULSE_ARTIFACT, DISTRICT_PULSE_MODEL_DIR
    /// - DISTRICT_PULSE_CLUSTERS, DISTRICT_PULSE_SEED,
    ///   DISTRICT_PULSE_KMEANS_RUNS, DISTRICT_PULSE_KMEANS_MAX_ITER
    /// - DISTRICT_PULSE_RISK_THRESHOLD, DISTRICT_PULSE_UNRESOLVED_TOLERANCE
    /// - DISTRICT_PULSE_MASK_FIELDS="patient_id,name,age,address"
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("DISTRICT_PULSE_DISTRICTS_CSV") {
            cfg.districts_csv = PathBuf::from(v);
        }
        if let Some(v) = var("DISTRICT_PULSE_DATABASE") {
            cfg.database = PathBuf::from(v);
        }
        if let Some(v) = var("DISTRICT_PULSE_ARTIFACT") {
            cfg.artifact = PathBuf::from(v);
        }
        if let Some(v) = var("DISTRICT_PULSE_MODEL_DIR") {
            cfg.model_dir = Some(PathBuf::from(v));
        }

        if let Some(k) = var("DISTRICT_PULSE_CLUSTERS").and_then(|v| v.parse::<usize>().ok()) {
            if k > 0 {
                cfg.clustering.k = k;
            }
        }
        if let Some(seed) = var("DISTRICT_PULSE_SEED").and_then(|v| v.parse::<u64>().ok()) {
            cfg.clustering.seed = seed;
        }
        if let Some(runs) = var("DISTRICT_PULSE_KMEANS_RUNS").and_then(|v| v.parse::<usize>().ok()) {
            if runs > 0 {
                cfg.clustering.n_init = runs;
            }
        }
        if let Some(iters) = var("DISTRICT_PULSE_KMEANS_MAX_ITER").and_then(|v| v.parse::<usize>().ok()) {
            if iters > 0 {
                cfg.clustering.max_iter = iters;
            }
        }

        if let Some(x) = var("DISTRICT_PULSE_RISK_THRESHOLD").and_then(|v| v.parse::<f64>().ok()) {
            if x.is_finite() {
                cfg.risk_threshold = x;
            }
        }
        if let Some(x) = var("DISTRICT_PULSE_UNRESOLVED_TOLERANCE").and_then(|v| v.parse::<f64>().ok()) {
            if x.is_finite() && (0.0..=1.0).contains(&x) {
                cfg.unresolved_tolerance = x;
            }
        }

        if let Some(v) = var("DISTRICT_PULSE_MASK_FIELDS") {
            let parsed: Result<BTreeSet<PatientField>, _> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PatientField::from_str)
                .collect();
            match parsed {
                Ok(fields) => cfg.mask_fields = fields,
                Err(e) => tracing::warn!("Ignoring DISTRICT_PULSE_MASK_FIELDS: {e}"),
            }
        }

        cfg
    }
}
