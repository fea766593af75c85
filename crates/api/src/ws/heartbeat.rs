use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::FeedManager;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to every
/// feed subscriber.
///
/// The returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(feeds: Arc<FeedManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = feeds.total_count().await;
            tracing::debug!(count, "Feed heartbeat ping");
            feeds.ping_all().await;
        }
    })
}
