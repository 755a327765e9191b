//! Solana Logs WebSocket Feed - Token Program Transaction Notices
//!
//! Subscribes to `logsSubscribe` for the monitored token program and
//! emits one `LogNotice` per transaction via a broadcast channel.
//! Reconnects after a fixed delay on disconnect and re-subscribes.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use crate::ports::{LogFeed, LogNotice};

/// Delay before reconnecting after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// `logsNotification` envelope.
#[derive(Debug, Deserialize)]
struct LogsNotification {
    method: String,
    params: NotificationParams,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: NotificationResult,
}

#[derive(Debug, Deserialize)]
struct NotificationResult {
    context: NotificationContext,
    value: LogsValue,
}

#[derive(Debug, Deserialize)]
struct NotificationContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct LogsValue {
    signature: String,
    #[serde(default)]
    err: Option<serde_json::Value>,
}

/// Parse one text frame into a notice. Subscription acks and other
/// frames yield `None`.
fn parse_notice(text: &str) -> Option<LogNotice> {
    let msg: LogsNotification = serde_json::from_str(text).ok()?;
    if msg.method != "logsNotification" {
        return None;
    }
    let result = msg.params.result;
    Some(LogNotice {
        signature: result.value.signature,
        failed: result.value.err.is_some_and(|e| !e.is_null()),
        slot: result.context.slot,
    })
}

/// Solana `logsSubscribe` feed.
pub struct LogsSubscriptionFeed {
    /// Broadcast sender for notices.
    notice_tx: broadcast::Sender<LogNotice>,
    /// WebSocket URL.
    ws_url: String,
    /// Program whose mentions we subscribe to.
    program_id: String,
    /// Commitment level of the subscription.
    commitment: String,
}

impl LogsSubscriptionFeed {
    pub fn new(ws_url: String, program_id: String, commitment: String) -> Self {
        let (notice_tx, _) = broadcast::channel(4096);
        Self {
            notice_tx,
            ws_url,
            program_id,
            commitment,
        }
    }

    /// Run the WebSocket connection loop.
    ///
    /// Reconnects automatically on disconnect; returns on shutdown.
    #[instrument(skip(self, shutdown_rx), fields(program = %self.program_id))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(url = %self.ws_url, "Connecting to Solana logs WebSocket");

        loop {
            match self.connect_and_stream(&mut shutdown_rx).await {
                Ok(()) => {
                    info!("Logs feed shut down gracefully");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        delay_secs = RECONNECT_DELAY.as_secs(),
                        "Logs WebSocket disconnected, reconnecting"
                    );
                    tokio::select! {
                        _ = shutdown_rx.recv() => return Ok(()),
                        () = tokio::time::sleep(RECONNECT_DELAY) => {},
                    }
                }
            }
        }
    }

    /// Single session: connect, subscribe, stream until error or shutdown.
    async fn connect_and_stream(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<()> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .context("Logs WebSocket connection failed")?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "logsSubscribe",
            "params": [
                { "mentions": [self.program_id] },
                { "commitment": self.commitment }
            ]
        });
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .context("Failed to send logsSubscribe")?;

        info!("Logs WebSocket connected and subscribed");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received in logs feed");
                    let _ = write.close().await;
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match parse_notice(&text) {
                                Some(notice) => {
                                    debug!(signature = %notice.signature, slot = notice.slot, "Log notice");
                                    // Broadcast (ignore if no receivers)
                                    let _ = self.notice_tx.send(notice);
                                }
                                None => debug!("Ignoring non-notification frame"),
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Pong is handled automatically by tungstenite
                            debug!(len = data.len(), "Logs feed ping received");
                        }
                        Some(Err(e)) => {
                            return Err(anyhow::anyhow!("WebSocket error: {e}"));
                        }
                        None => {
                            return Err(anyhow::anyhow!("WebSocket stream ended"));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

impl LogFeed for LogsSubscriptionFeed {
    fn subscribe(&self) -> broadcast::Receiver<LogNotice> {
        self.notice_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logs_notification() {
        let text = r#"{"jsonrpc":"2.0","method":"logsNotification","params":{"result":{"context":{"slot":5208469},"value":{"signature":"5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXFSDwt8GFXM7W5Ncn16wmqokgpiKRLuS83KUxyZyv2sUYv","err":null,"logs":["Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA invoke [1]"]}},"subscription":24040}}"#;
        let notice = parse_notice(text).unwrap();
        assert_eq!(notice.slot, 5_208_469);
        assert!(!notice.failed);
        assert!(notice.signature.starts_with("5h6x"));
    }

    #[test]
    fn test_failed_transaction_flagged() {
        let text = r#"{"jsonrpc":"2.0","method":"logsNotification","params":{"result":{"context":{"slot":1},"value":{"signature":"s","err":{"InstructionError":[0,"Custom"]},"logs":[]}},"subscription":1}}"#;
        assert!(parse_notice(text).unwrap().failed);
    }

    #[test]
    fn test_subscription_ack_ignored() {
        assert!(parse_notice(r#"{"jsonrpc":"2.0","result":24040,"id":1}"#).is_none());
    }
}
