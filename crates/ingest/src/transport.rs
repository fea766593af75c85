//! WebSocket transport listener with exponential-backoff reconnection.
//!
//! Each configured transport endpoint gets one [`run_subscription`] task.
//! The task connects, subscribes to its topics, and feeds every frame to
//! the router sequentially so per-sensor ordering is preserved. When the
//! connection drops it retries with growing delays until the
//! [`CancellationToken`] is triggered.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::router::IngestionRouter;

/// One inbound frame: the transport topic plus the raw payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportFrame {
    pub topic: String,
    pub payload: Value,
}

/// Tunable parameters for the exponential-backoff strategy.
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Build the subscription URL for an endpoint and its topic list.
pub fn subscription_url(endpoint: &str, topics: &[String]) -> String {
    if topics.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}?topics={}", topics.join(","))
    }
}

/// Run one transport subscription until cancelled.
///
/// Connection failures and dropped connections are retried forever with
/// exponential backoff; frame-level failures are handled inside the
/// router and never abort the subscription.
pub async fn run_subscription(
    endpoint: String,
    topics: Vec<String>,
    router: Arc<IngestionRouter>,
    config: ReconnectConfig,
    cancel: CancellationToken,
) {
    let url = subscription_url(&endpoint, &topics);
    let mut delay = config.initial_delay;

    loop {
        tracing::info!(endpoint = %endpoint, "Connecting to transport");

        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((stream, _)) => {
                tracing::info!(endpoint = %endpoint, "Transport connected");
                delay = config.initial_delay;
                read_frames(stream, &router, &cancel).await;
                if cancel.is_cancelled() {
                    return;
                }
                tracing::warn!(endpoint = %endpoint, "Transport connection closed");
            }
            Err(error) => {
                tracing::warn!(endpoint = %endpoint, %error, "Transport connect failed");
            }
        }

        // Wait before the next attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = next_delay(delay, &config);
    }
}

/// Consume frames from an open connection until it closes or we are
/// cancelled. Frames are routed one at a time to keep ordering.
async fn read_frames<S>(
    mut stream: tokio_tungstenite::WebSocketStream<S>,
    router: &IngestionRouter,
    cancel: &CancellationToken,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = stream.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(error)) => {
                tracing::warn!(%error, "Transport read error");
                return;
            }
            None => return,
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return,
            // Ping/pong is handled by the library; ignore the rest.
            _ => continue,
        };

        match serde_json::from_str::<TransportFrame>(&text) {
            Ok(frame) => {
                router.accept(&frame.topic, &frame.payload).await;
            }
            Err(error) => {
                tracing::warn!(%error, "Dropping malformed transport frame");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
