//! Wires a change feed to snapshot rebuilds.

use std::sync::Arc;

use super::SnapshotService;
use crate::adapters::SourceError;
use crate::ports::{ChangeFeed, ListenerHandle, RecordSource, ReferenceSource, SnapshotStore};

/// Rebuild the snapshot on every notification from `feed`.
///
/// Duplicate notifications cause redundant rebuilds, which is harmless.
/// A failed rebuild is logged and the listener keeps running.
pub fn watch<R, D, P, F>(service: Arc<SnapshotService<R, D, P>>, feed: F) -> ListenerHandle
where
    R: RecordSource + 'static,
    D: ReferenceSource + 'static,
    P: SnapshotStore + 'static,
    R::Error: Into<SourceError>,
    D::Error: Into<SourceError>,
    F: ChangeFeed,
{
    feed.on_change(move |event| {
        tracing::info!("Change detected in {} ({}), rebuilding snapshot", event.collection, event.kind);
        if service.rebuild().is_err() {
            tracing::warn!("Snapshot for change in {} not published", event.collection);
        }
    })
}
