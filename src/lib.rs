//! followers-maze: reorders an unordered event-source stream by sequence
//! number and dispatches each event to subscribers by id and follower
//! graph.
//!
//! See `SPEC_FULL.md` for the full component design. In short:
//!
//! `event source → Listener → Resequencer → Dispatcher → subscriber sockets`
//!
//! with subscriber connections arriving independently on a second port via
//! [`subscription::SubscriptionServer`].

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod resequencer;
pub mod subscriber;
pub mod subscription;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::BindError;
use crate::event::Event;
use crate::listener::Listener;
use crate::subscription::{SubscriptionRequest, SubscriptionServer};

/// Channel capacity for the three dispatcher inputs. Spec §5 describes
/// unbuffered channels; a small bound keeps backpressure visible in tests
/// without the deadlock risk an actually-unbuffered (capacity 0) channel
/// would carry once a subscriber write is slow.
const CHANNEL_CAPACITY: usize = 64;

/// Wire up the listener, subscription server, and dispatcher per `config`
/// and run until the process is killed. Returns a [`BindError`] if either
/// TCP port cannot be bound — the only fatal condition in this system.
pub async fn run(config: Config) -> Result<(), BindError> {
    let (dispatch_tx, dispatch_rx) = mpsc::channel::<Event>(CHANNEL_CAPACITY);
    let (subscription_tx, subscription_rx) =
        mpsc::channel::<SubscriptionRequest>(CHANNEL_CAPACITY);
    let (control_tx, control_rx) = mpsc::channel::<()>(CHANNEL_CAPACITY);

    let listener = Listener::bind(
        config.event_source_port,
        dispatch_tx,
        control_tx,
        config.resequencer_type.clone(),
        config.resequencer_capacity,
        config.sequence_index,
    )
    .await?;

    let subscription_server = SubscriptionServer::bind(config.client_port, subscription_tx).await?;

    let dispatcher = Dispatcher::new(dispatch_rx, subscription_rx, control_rx);

    info!(
        event_source_port = config.event_source_port,
        client_port = config.client_port,
        resequencer_type = %config.resequencer_type,
        "followers-maze ready"
    );

    tokio::spawn(listener.serve());
    tokio::spawn(subscription_server.serve());
    dispatcher.run().await;

    Ok(())
}
