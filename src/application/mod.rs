//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the pipeline: clustering, pattern analysis, snapshot rebuilds,
//! queries and console reports.

mod clustering;
mod listener;
mod patterns;
mod query;
mod report;
mod snapshot;

pub use clustering::{assignments, ClusterConfig, ClusterOutcome, RiskClusterer};
pub use listener::watch;
pub use patterns::{
    check_referential_integrity, mainly_affected, JoinReport, PatternAnalyzer, CAUSE_CROWDING, CAUSE_HEALTHCARE,
    CAUSE_SANITATION, CAUSE_WATER, DEFAULT_RISK_THRESHOLD,
};
pub use query::{QueryError, QueryService};
pub use report::{category_hotspots, render_summary, risk_tag, CorrelationRow};
pub use snapshot::SnapshotService;
