//! Event-source accept loop.
//!
//! Accepts the upstream event-source connection, decodes its line stream,
//! and feeds a fresh resequencer per connection. Every successfully parsed
//! event is either emitted to `dispatch_tx` or sits in the resequencer's
//! buffer until flush — nothing is silently dropped once parsed.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::BindError;
use crate::event::Event;
use crate::resequencer::{new_resequencer, Resequencer};

pub struct Listener {
    listener: TcpListener,
    dispatch_tx: mpsc::Sender<Event>,
    control_tx: mpsc::Sender<()>,
    resequencer_type: String,
    resequencer_capacity: usize,
    sequence_index: u64,
}

impl Listener {
    pub async fn bind(
        port: u16,
        dispatch_tx: mpsc::Sender<Event>,
        control_tx: mpsc::Sender<()>,
        resequencer_type: String,
        resequencer_capacity: usize,
        sequence_index: u64,
    ) -> Result<Self, BindError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| BindError::new(format!("event listener on port {port}"), e))?;
        Ok(Listener {
            listener,
            dispatch_tx,
            control_tx,
            resequencer_type,
            resequencer_capacity,
            sequence_index,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept event-source connections forever. Multiple connections are
    /// each handled independently but share the same dispatch channel —
    /// concurrent event sources would interleave, which this system does
    /// not support semantically.
    pub async fn serve(self) {
        info!(port = ?self.local_addr().ok(), "event listener waiting for connection");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "event source connected");
                    let resequencer =
                        new_resequencer(&self.resequencer_type, self.resequencer_capacity, self.sequence_index);
                    let dispatch_tx = self.dispatch_tx.clone();
                    let control_tx = self.control_tx.clone();
                    tokio::spawn(handle_event_source(stream, dispatch_tx, control_tx, resequencer));
                }
                Err(e) => warn!(error = %e, "cannot accept event source connection"),
            }
        }
    }
}

async fn handle_event_source(
    stream: TcpStream,
    dispatch_tx: mpsc::Sender<Event>,
    control_tx: mpsc::Sender<()>,
    mut resequencer: Box<dyn Resequencer>,
) {
    let mut lines = BufReader::new(stream).lines();
    let mut ordered = Vec::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Event::parse(&line) {
                Ok(event) => {
                    resequencer.accept(event, &mut ordered);
                    if !emit(&dispatch_tx, &mut ordered).await {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, %line, "malformed event; skipping"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "cannot read from event source");
                break;
            }
        }
    }

    info!("event source disconnected");
    resequencer.flush(&mut ordered);
    let _ = emit(&dispatch_tx, &mut ordered).await;
    let _ = control_tx.send(()).await;
}

/// Drain `ordered` onto `dispatch_tx`. Returns `false` once the dispatcher
/// has gone away, at which point the caller should stop reading.
async fn emit(dispatch_tx: &mpsc::Sender<Event>, ordered: &mut Vec<Event>) -> bool {
    for event in ordered.drain(..) {
        if dispatch_tx.send(event).await.is_err() {
            return false;
        }
    }
    true
}
