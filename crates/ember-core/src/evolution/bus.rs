//! Broadcast of evolution events to interested subscribers.
//!
//! Slow subscribers miss events rather than blocking the tracker.

use tokio::sync::broadcast;

use super::events::EvolutionEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Fire-and-forget event bus; events with no subscribers are dropped.
#[derive(Clone)]
pub struct EvolutionEventBus {
    sender: broadcast::Sender<EvolutionEvent>,
}

impl EvolutionEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EvolutionSubscriber {
        EvolutionSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn emit(&self, event: EvolutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EvolutionEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`EvolutionEventBus`].
pub struct EvolutionSubscriber {
    receiver: broadcast::Receiver<EvolutionEvent>,
}

impl EvolutionSubscriber {
    /// Next event, or `None` once the bus is dropped. Lagged events are
    /// skipped.
    pub async fn recv(&mut self) -> Option<EvolutionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Evolution subscriber lagged");
                    continue;
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<EvolutionEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{EventSeverity, EvolutionEventType, LifecycleStage};
    use chrono::Utc;

    fn birth(id: &str) -> EvolutionEvent {
        EvolutionEvent::new(
            id,
            EvolutionEventType::Birth,
            EventSeverity::Minor,
            Utc::now(),
            None,
            LifecycleStage::Emerging,
        )
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EvolutionEventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(birth("p1"));
        assert_eq!(first.recv().await.unwrap().pattern_id, "p1");
        assert_eq!(second.recv().await.unwrap().pattern_id, "p1");
        assert!(first.try_recv().is_none());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EvolutionEventBus::new();
        bus.emit(birth("p1"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
