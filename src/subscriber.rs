//! Subscriber state and the directory that owns it.
//!
//! The directory is confined to the dispatcher task (see [`crate::dispatcher`]):
//! it is mutated only on message receipt, so no locking is required here.
//! Followers are tracked by id rather than by direct reference, which is
//! what lets an A-follows-B-follows-A cycle unwind cleanly on
//! [`Directory::unsubscribe_all`] without weak references.

use std::collections::{HashMap, HashSet};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::event::Event;

/// Any byte sink a subscriber can be connected to: a TCP write half in
/// production, an in-memory duplex stream in tests.
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// A subscriber known to the directory, keyed by `id`.
///
/// A subscriber may exist with `connection == None` — either because it was
/// only ever referenced as someone else's follower/recipient, or because its
/// socket has since disconnected.
pub struct Subscriber {
    id: String,
    connection: Option<Sink>,
    followers: HashSet<String>,
}

impl Subscriber {
    pub fn new(id: impl Into<String>) -> Self {
        Subscriber {
            id: id.into(),
            connection: None,
            followers: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attach a sink, closing any previous one first.
    pub async fn connect(&mut self, sink: Sink) {
        self.disconnect().await;
        self.connection = Some(sink);
    }

    /// Close the current sink, if any, and forget it.
    pub async fn disconnect(&mut self) {
        if let Some(mut sink) = self.connection.take() {
            let _ = sink.shutdown().await;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Write `event.serialize() + "\n"` to the sink if connected. A write
    /// failure is logged and dropped — the subscriber stays registered,
    /// there is no at-least-once guarantee and no auto-disconnect.
    pub async fn send_event(&mut self, event: &Event) {
        let Some(sink) = self.connection.as_mut() else {
            return;
        };

        let line = format!("{}\n", event.serialize());
        if let Err(e) = sink.write_all(line.as_bytes()).await {
            warn!(subscriber_id = %self.id, error = %e, "failed to deliver event to subscriber");
        }
    }

    pub fn add_follower(&mut self, follower_id: impl Into<String>) {
        self.followers.insert(follower_id.into());
    }

    pub fn remove_follower(&mut self, follower_id: &str) {
        self.followers.remove(follower_id);
    }

    /// Ids of this subscriber's current followers. May contain stale ids of
    /// subscribers no longer in the directory; see [`Directory::unsubscribe_all`].
    pub fn follower_ids(&self) -> impl Iterator<Item = &String> {
        self.followers.iter()
    }
}

/// The in-memory table of all known subscribers, owned exclusively by the
/// dispatcher task.
#[derive(Default)]
pub struct Directory {
    storage: HashMap<String, Subscriber>,
}

impl Directory {
    pub fn new() -> Self {
        Directory {
            storage: HashMap::new(),
        }
    }

    /// Return the subscriber with `id`, creating a disconnected placeholder
    /// if it doesn't yet exist.
    pub fn get_or_create_mut(&mut self, id: &str) -> &mut Subscriber {
        self.storage
            .entry(id.to_owned())
            .or_insert_with(|| Subscriber::new(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Subscriber> {
        self.storage.get_mut(id)
    }

    pub fn get(&self, id: &str) -> Option<&Subscriber> {
        self.storage.get(id)
    }

    /// Insert or overwrite the entry for `sub.id()`.
    pub fn subscribe(&mut self, sub: Subscriber) {
        self.storage.insert(sub.id().to_owned(), sub);
    }

    /// Ensure both the sender and recipient of `event` exist in the
    /// directory (creating disconnected placeholders as needed) and return
    /// their ids. Events missing a sender or recipient field use the empty
    /// string, which is a valid, never-connected placeholder id.
    pub fn peers(&mut self, event: &Event) -> (String, String) {
        let sender_id = event.sender_id().to_owned();
        let recipient_id = event.recipient_id().to_owned();
        self.get_or_create_mut(&sender_id);
        self.get_or_create_mut(&recipient_id);
        (sender_id, recipient_id)
    }

    /// Send `event` to every subscriber currently in the directory.
    pub async fn broadcast(&mut self, event: &Event) {
        for subscriber in self.storage.values_mut() {
            subscriber.send_event(event).await;
        }
    }

    /// Disconnect and drop every subscriber. Called on event-source
    /// disconnect to reset directory state between sessions.
    pub async fn unsubscribe_all(&mut self) {
        for subscriber in self.storage.values_mut() {
            if subscriber.is_connected() {
                subscriber.disconnect().await;
            }
        }
        self.storage.clear();
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
