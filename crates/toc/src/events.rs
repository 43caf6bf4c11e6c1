//! Event Bus - outbound notifications of outline sessions
//!
//! Design: one closed enum, fanned out over a tokio broadcast channel.
//! Publishing never blocks and works without a runtime.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events a session or controller can publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TocEvent {
    Started { session_id: String },
    Shown { session_id: String },
    Hidden { session_id: String },
    /// Extracted content drifted; dispose the session and extract again
    Error { session_id: String, reason: String },
    /// Nothing to outline on this page
    Notice { message: String },
    /// One-time usage hint
    Tip { message: String },
    Disposed { session_id: String },
}

/// Simple event bus using tokio broadcast channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TocEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: TocEvent) {
        tracing::debug!(?event, "publish");
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<TocEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(TocEvent::Error {
            session_id: "s".to_string(),
            reason: "Article Changed".to_string(),
        });

        match rx.recv().await {
            Ok(TocEvent::Error { reason, .. }) => assert_eq!(reason, "Article Changed"),
            _ => panic!("Expected Error event"),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(TocEvent::Notice {
            message: "nothing here".to_string(),
        });
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(TocEvent::Tip {
            message: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "type": "tip", "message": "hi" }));
    }
}
