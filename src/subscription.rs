//! Subscription accept loop.
//!
//! Accepts subscriber connections on a second TCP port. Each connection
//! sends its id as a single `\n`-terminated line; the server hands the
//! `(id, socket)` pair to the dispatcher over `subscription_tx` and takes
//! no further part in that socket's lifecycle.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::BindError;
use crate::subscriber::Sink;

/// A subscriber id paired with the socket it connected on.
pub struct SubscriptionRequest {
    pub id: String,
    pub sink: Sink,
}

pub struct SubscriptionServer {
    listener: TcpListener,
    subscription_tx: mpsc::Sender<SubscriptionRequest>,
}

impl SubscriptionServer {
    pub async fn bind(
        port: u16,
        subscription_tx: mpsc::Sender<SubscriptionRequest>,
    ) -> Result<Self, BindError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| BindError::new(format!("subscription server on port {port}"), e))?;
        Ok(SubscriptionServer {
            listener,
            subscription_tx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, spawning one short-lived task per
    /// subscriber to read its id and forward the subscription request.
    pub async fn serve(self) {
        info!(port = ?self.local_addr().ok(), "subscription server listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = self.subscription_tx.clone();
                    tokio::spawn(async move {
                        handle_subscriber_connection(stream, tx).await;
                    });
                    info!(%addr, "subscriber connection accepted");
                }
                Err(e) => warn!(error = %e, "cannot accept subscriber connection"),
            }
        }
    }
}

async fn handle_subscriber_connection(stream: TcpStream, tx: mpsc::Sender<SubscriptionRequest>) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    match reader.read_line(&mut line).await {
        Ok(0) => warn!("subscriber disconnected before sending an id"),
        Ok(_) => {
            // Strip both bare `\n` and `\r\n`; the original only stripped
            // one byte and left a stray `\r` in the id on CRLF input.
            let id = line.trim_end_matches(['\n', '\r']).to_owned();
            let request = SubscriptionRequest {
                id,
                sink: Box::new(write_half),
            };
            if tx.send(request).await.is_err() {
                warn!("dispatcher is no longer accepting subscription requests");
            }
        }
        Err(e) => warn!(error = %e, "cannot read subscriber id"),
    }
}
