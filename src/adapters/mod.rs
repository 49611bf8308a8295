//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: rusqlite-backed live patient/case store
//! - `district_csv`: district reference table and clustered export
//! - `json_store`: atomic JSON artifact publisher
//! - `memory`: in-process sources and store
//! - `channel`: mpsc-backed change feed
//! - `sanitize`: PII filtering for logs

pub mod channel;
pub mod district_csv;
mod error;
pub mod json_store;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use error::SourceError;
