//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`TelemetryBus`] lets the live feed broadcasters react to pipeline
//! activity without polling. It is shared via `Arc<TelemetryBus>`.

use linewatch_core::reading::Status;
use linewatch_core::types::DbId;
use tokio::sync::broadcast;

/// A notification that the pipeline accepted new data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A reading was evaluated and stored (or at least evaluated, when
    /// the store write failed).
    ReadingAccepted { sensor_id: DbId, status: Status },
    /// An alert event was recorded.
    AlertRaised { sensor_id: DbId },
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`TelemetryEvent`]s.
pub struct TelemetryBus {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl TelemetryBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: TelemetryEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = TelemetryBus::default();
        let mut rx = bus.subscribe();

        bus.publish(TelemetryEvent::ReadingAccepted {
            sensor_id: 3,
            status: Status::High,
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(
            received,
            TelemetryEvent::ReadingAccepted {
                sensor_id: 3,
                status: Status::High,
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = TelemetryBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(TelemetryEvent::AlertRaised { sensor_id: 1 });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = TelemetryBus::default();
        bus.publish(TelemetryEvent::AlertRaised { sensor_id: 9 });
    }
}
