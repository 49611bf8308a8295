//! Channel adapter: Implementation of ChangeFeed over `std::sync::mpsc`.
//!
//! Each upstream collection gets its own notifier/feed pair, so each
//! collection is watched on its own listener thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::ports::{ChangeEvent, ChangeFeed, ChangeKind, ListenerHandle};

/// Sending half: handed to whatever observes upstream mutations.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    collection: String,
    tx: Sender<ChangeEvent>,
}

impl ChangeNotifier {
    /// Signal a mutation. Returns `false` once the listener has gone away.
    pub fn notify(&self, kind: ChangeKind) -> bool {
        self.tx
            .send(ChangeEvent::new(self.collection.clone(), kind))
            .is_ok()
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Receiving half: consumed by [`ChangeFeed::on_change`].
pub struct ChannelFeed {
    collection: String,
    rx: Receiver<ChangeEvent>,
}

/// Create a notifier/feed pair for one collection.
#[must_use]
pub fn change_channel(collection: impl Into<String>) -> (ChangeNotifier, ChannelFeed) {
    let collection = collection.into();
    let (tx, rx) = mpsc::channel();
    (
        ChangeNotifier {
            collection: collection.clone(),
            tx,
        },
        ChannelFeed { collection, rx },
    )
}

impl ChangeFeed for ChannelFeed {
    fn on_change<H>(self, mut handler: H) -> ListenerHandle
    where
        H: FnMut(ChangeEvent) + Send + 'static,
    {
        let name = self.collection.clone();
        let rx = self.rx;

        let handle = thread::spawn(move || {
            // Ends once every notifier has been dropped.
            for event in rx {
                handler(event);
            }
        });

        tracing::info!("Listening for changes in {name}");
        ListenerHandle::new(name, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_events_delivered_in_order() {
        let (notifier, feed) = change_channel("patients");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let seen = Arc::clone(&seen);
            feed.on_change(move |event| {
                seen.lock().expect("Lock").push(event);
            })
        };
        assert_eq!(handle.name(), "patients");

        assert!(notifier.notify(ChangeKind::Insert));
        assert!(notifier.notify(ChangeKind::Delete));
        drop(notifier);
        handle.join();

        let seen = seen.lock().expect("Lock");
        assert_eq!(
            *seen,
            vec![
                ChangeEvent::new("patients", ChangeKind::Insert),
                ChangeEvent::new("patients", ChangeKind::Delete),
            ]
        );
    }

    #[test]
    fn test_notify_after_listener_gone() {
        let (notifier, feed) = change_channel("disease_cases");
        drop(feed);
        assert!(!notifier.notify(ChangeKind::Update));
        assert_eq!(notifier.collection(), "disease_cases");
    }
}
