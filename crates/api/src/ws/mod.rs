//! WebSocket live feed infrastructure.
//!
//! Clients subscribe to one feed topic per connection. Snapshot
//! broadcaster tasks push JSON frames through the [`manager::FeedManager`],
//! which isolates slow or dead subscribers from the rest.

pub mod handler;
pub mod heartbeat;
pub mod manager;
pub mod snapshots;

pub use handler::feed_handler;
pub use heartbeat::start_heartbeat;
pub use manager::FeedManager;
pub use snapshots::SnapshotBroadcasters;
