//! # District Pulse
//!
//! District disease-risk analytics over live patient and case records.
//!
//! This crate provides:
//! - Reversible de-identification of patient fields for one pipeline run
//! - Seeded k-means clustering of districts by infrastructure and risk
//! - Per-district, per-disease demographic summaries with candidate causes
//! - An atomically published JSON snapshot and a read-only query surface
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core record types, summary shape and the masking codec
//! - `ports`: Trait definitions for record sources, the snapshot store and change feeds
//! - `adapters`: Concrete implementations (SQLite, CSV, JSON file, in-memory, mpsc)
//! - `application`: Clustering, pattern analysis, snapshot rebuilds and queries
//! - `config`: Pipeline configuration loaded once at startup

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use config::PipelineConfig;
pub use domain::{DataError, DistrictSummary, MaskingError};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid source data: {0}")]
    Data(#[from] DataError),

    #[error("Masking failed: {0}")]
    Masking(#[from] MaskingError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] ports::PublishError),

    #[error("Source unavailable: {0}")]
    Source(#[from] adapters::SourceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
