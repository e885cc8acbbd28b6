pub mod engine_event;
pub mod sink;

pub use engine_event::{AlertSeverity, EngineEvent};
pub use sink::{MockNotificationSink, NoOpNotificationSink, NotificationSink, SinkRecord};
