//! Change notification port: upstream mutation signals.

use std::fmt;
use std::thread::JoinHandle;

/// Kind of upstream mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Replace,
    Delete,
    Other,
}

impl ChangeKind {
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "insert" => Self::Insert,
            "update" => Self::Update,
            "replace" => Self::Replace,
            "delete" => Self::Delete,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// One change notification. Carries no record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Upstream collection that changed (e.g. `patients`)
    pub collection: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(collection: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            collection: collection.into(),
            kind,
        }
    }
}

/// Handle to a running listener thread.
pub struct ListenerHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl ListenerHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, handle: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the feed to close and the listener to drain.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("Listener '{}' panicked", self.name);
        }
    }
}

/// Source of edge-triggered, at-least-once change notifications.
///
/// Delivery order and deduplication are not guaranteed; handlers must be
/// safe to run repeatedly.
pub trait ChangeFeed {
    /// Run `handler` for every notification on a dedicated thread until
    /// the feed closes.
    fn on_change<H>(self, handler: H) -> ListenerHandle
    where
        H: FnMut(ChangeEvent) + Send + 'static;
}
