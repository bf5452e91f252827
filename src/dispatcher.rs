//! The dispatcher: the single task that owns the subscriber directory and
//! every follower graph, interprets event semantics, and delivers ordered
//! events to the correct sockets.
//!
//! The dispatcher is the only writer of the directory, which is what makes
//! locking unnecessary — all mutation happens in response to a message
//! received on one of its three channels.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::event::Event;
use crate::subscriber::Directory;
use crate::subscription::SubscriptionRequest;

pub struct Dispatcher {
    directory: Directory,
    dispatch_rx: mpsc::Receiver<Event>,
    subscription_rx: mpsc::Receiver<SubscriptionRequest>,
    control_rx: mpsc::Receiver<()>,
}

impl Dispatcher {
    pub fn new(
        dispatch_rx: mpsc::Receiver<Event>,
        subscription_rx: mpsc::Receiver<SubscriptionRequest>,
        control_rx: mpsc::Receiver<()>,
    ) -> Self {
        Dispatcher {
            directory: Directory::new(),
            dispatch_rx,
            subscription_rx,
            control_rx,
        }
    }

    /// Run until every input channel is closed.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.dispatch_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                request = self.subscription_rx.recv() => {
                    match request {
                        Some(request) => self.handle_subscription(request).await,
                        None => break,
                    }
                }
                reset = self.control_rx.recv() => {
                    match reset {
                        Some(()) => {
                            info!(subscribers = self.directory.len(), "event source disconnected; resetting directory");
                            self.directory.unsubscribe_all().await;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    async fn handle_subscription(&mut self, request: SubscriptionRequest) {
        let subscriber = self.directory.get_or_create_mut(&request.id);
        subscriber.connect(request.sink).await;
        info!(subscriber_id = %request.id, "subscriber connected");
    }

    async fn handle_event(&mut self, event: Event) {
        match event.event_type() {
            "B" => self.directory.broadcast(&event).await,

            "F" => {
                let (sender_id, recipient_id) = self.directory.peers(&event);
                if let Some(recipient) = self.directory.get_mut(&recipient_id) {
                    recipient.add_follower(sender_id);
                    recipient.send_event(&event).await;
                }
            }

            "U" => {
                let (sender_id, recipient_id) = self.directory.peers(&event);
                if let Some(recipient) = self.directory.get_mut(&recipient_id) {
                    recipient.remove_follower(&sender_id);
                }
            }

            "P" => {
                let (_sender_id, recipient_id) = self.directory.peers(&event);
                if let Some(recipient) = self.directory.get_mut(&recipient_id) {
                    recipient.send_event(&event).await;
                }
            }

            "S" => {
                let (sender_id, _recipient_id) = self.directory.peers(&event);
                let follower_ids: Vec<String> = self
                    .directory
                    .get(&sender_id)
                    .map(|sender| sender.follower_ids().cloned().collect())
                    .unwrap_or_default();

                for follower_id in follower_ids {
                    if let Some(follower) = self.directory.get_mut(&follower_id) {
                        follower.send_event(&event).await;
                    }
                }
            }

            other => warn!(event_type = other, sequence = event.sequence(), "unknown event type; dropping"),
        }
    }
}
