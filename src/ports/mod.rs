//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the analytics pipeline and external systems (record stores,
//! the published artifact, change notifications).

mod notify;
mod records;
mod snapshot;

pub use notify::{ChangeEvent, ChangeFeed, ChangeKind, ListenerHandle};
pub use records::{RecordSource, ReferenceSource};
pub use snapshot::{PublishError, SnapshotStore};
