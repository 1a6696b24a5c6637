//! Event types and event bus for the dailycut generation pipeline
//!
//! Stage transitions and progress updates are broadcast on a
//! tokio::sync::broadcast channel; the SSE endpoint and tests
//! subscribe, the pipeline emits. Emission is lossy by design -
//! a slow or absent subscriber never blocks generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted during a generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenEvent {
    /// A generation run was admitted and started
    RunStarted {
        run_id: Uuid,
        owner_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The pipeline moved to a new stage
    StageChanged {
        run_id: Uuid,
        old_stage: String,
        new_stage: String,
        timestamp: DateTime<Utc>,
    },

    /// Coarse progress message while the audio synthesis job runs
    SynthesisProgress {
        run_id: Uuid,
        elapsed_seconds: u64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Weekly album artwork was generated (once per album)
    ArtworkGenerated {
        album_id: Uuid,
        tier: String,
        timestamp: DateTime<Utc>,
    },

    /// Run finished successfully
    RunCompleted {
        run_id: Uuid,
        song_id: Uuid,
        share_token: String,
        timestamp: DateTime<Utc>,
    },

    /// Run failed
    RunFailed {
        run_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for generation events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GenEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GenEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GenEvent) -> Result<usize, broadcast::error::SendError<GenEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GenEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(GenEvent::RunStarted {
            run_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GenEvent::RunStarted { .. }));
    }

    #[test]
    fn test_emit_lossy_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.emit_lossy(GenEvent::RunFailed {
            run_id: Uuid::new_v4(),
            reason: "test".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = GenEvent::StageChanged {
            run_id: Uuid::new_v4(),
            old_stage: "Gathering".to_string(),
            new_stage: "Composing".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"StageChanged\""));
    }
}
