//! Notification sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::EngineEvent;

/// Trait for relaying engine events to connected clients.
///
/// Core services emit events through this trait after successful mutations
/// and on every health sweep.
///
/// # Design Rules
///
/// - Both methods must be fast and non-blocking (no network round-trips on
///   the caller's thread)
/// - Delivery is at-least-once, fire-and-forget; implementations queue for
///   async processing
/// - Failure to deliver must not affect domain operations (best-effort)
pub trait NotificationSink: Send + Sync {
    /// Delivers an event to a single user.
    fn notify_user(&self, user_id: &str, event: EngineEvent);

    /// Delivers an event to every connected client.
    fn broadcast(&self, event: EngineEvent);
}

/// No-op implementation for tests or contexts that don't need delivery.
#[derive(Clone, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn notify_user(&self, _user_id: &str, _event: EngineEvent) {
        // Intentionally empty - events are discarded
    }

    fn broadcast(&self, _event: EngineEvent) {
        // Intentionally empty - events are discarded
    }
}

/// A delivered record captured by the mock sink.
#[derive(Clone, Debug)]
pub struct SinkRecord {
    /// Target user, or `None` for broadcasts.
    pub user_id: Option<String>,
    pub event: EngineEvent,
}

/// Mock sink for testing - collects delivered events.
#[derive(Clone, Default)]
pub struct MockNotificationSink {
    records: Arc<Mutex<Vec<SinkRecord>>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured records.
    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Returns only the broadcast events.
    pub fn broadcasts(&self) -> Vec<EngineEvent> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id.is_none())
            .map(|r| r.event.clone())
            .collect()
    }

    /// Returns the events delivered to a specific user.
    pub fn events_for(&self, user_id: &str) -> Vec<EngineEvent> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .map(|r| r.event.clone())
            .collect()
    }

    /// Clears captured records.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Returns the number of captured records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Returns true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl NotificationSink for MockNotificationSink {
    fn notify_user(&self, user_id: &str, event: EngineEvent) {
        self.records.lock().unwrap().push(SinkRecord {
            user_id: Some(user_id.to_string()),
            event,
        });
    }

    fn broadcast(&self, event: EngineEvent) {
        self.records.lock().unwrap().push(SinkRecord {
            user_id: None,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn withdrawable() -> EngineEvent {
        EngineEvent::FundsWithdrawable {
            investment_id: "i1".to_string(),
            amount: dec!(1000),
        }
    }

    #[test]
    fn test_noop_sink_does_not_panic() {
        let sink = NoOpNotificationSink;
        sink.notify_user("u1", withdrawable());
        sink.broadcast(withdrawable());
    }

    #[test]
    fn test_mock_sink_separates_targets() {
        let sink = MockNotificationSink::new();
        assert!(sink.is_empty());

        sink.notify_user("u1", withdrawable());
        sink.broadcast(withdrawable());
        sink.notify_user("u2", withdrawable());

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.broadcasts().len(), 1);
        assert_eq!(sink.events_for("u1").len(), 1);
        assert_eq!(sink.events_for("u2").len(), 1);
        assert!(sink.events_for("u3").is_empty());

        sink.clear();
        assert!(sink.is_empty());
    }
}
