//! Websocket stream ingestor

use super::{publish_payload, Ingestor};
use crate::{Result, SyncError};
use async_trait::async_trait;
use futures::StreamExt;
use heartsync_core::SnapshotMailbox;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reads one JSON snapshot per inbound text frame.
pub struct StreamIngestor {
    url: String,
    liveness_timeout: Option<Duration>,
    connection: Option<WsStream>,
}

impl StreamIngestor {
    /// `liveness_timeout`: treat the connection as lost after this long without a frame.
    pub fn new(url: impl Into<String>, liveness_timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            liveness_timeout,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[async_trait]
impl Ingestor for StreamIngestor {
    fn kind(&self) -> &'static str {
        "stream"
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<()> {
        // Drop any half-dead connection from a previous attempt
        self.connection = None;

        let (ws, response) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");
        self.connection = Some(ws);
        Ok(())
    }

    async fn run(&mut self, mailbox: &SnapshotMailbox) -> Result<()> {
        let liveness = self.liveness_timeout;
        let ws = self.connection.as_mut().ok_or(SyncError::NotConnected)?;

        loop {
            let next = match liveness {
                Some(limit) => tokio::time::timeout(limit, ws.next())
                    .await
                    .map_err(|_| SyncError::Stale(limit))?,
                None => ws.next().await,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    publish_payload(mailbox, &text, "stream");
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "no reason given".to_string());
                    info!(reason = %reason, "Server closed the stream");
                    return Ok(());
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => {
                    debug!("WebSocket stream ended");
                    return Ok(());
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.connection.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "WebSocket close handshake failed");
            }
        }
    }
}
