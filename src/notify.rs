use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::limits::NOTIFY_CHANNEL_CAPACITY;
use crate::model::Event;

/// Broadcast hub for appointment lifecycle events, one channel per book.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
    capacity: usize,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::with_capacity(NOTIFY_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events for a book. Creates the channel if needed.
    pub fn subscribe(&self, book_id: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(book_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        sender.subscribe()
    }

    /// Send to the event's book channel. No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        if let Some(sender) = self.channels.get(event.book_id()) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop channels whose receivers have all gone away.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("b1");

        let event = Event::AppointmentCreated {
            id: Ulid::new(),
            book_id: "b1".into(),
            user_id: "u1".into(),
        };
        hub.send(&event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn other_books_are_not_delivered() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("b1");
        hub.send(&Event::AppointmentRejected {
            id: Ulid::new(),
            book_id: "b2".into(),
        });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // no subscriber, no panic
        hub.send(&Event::AppointmentRejected {
            id: Ulid::new(),
            book_id: "b1".into(),
        });
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn prune_drops_abandoned_channels() {
        let hub = NotifyHub::new();
        let rx = hub.subscribe("b1");
        let _keep = hub.subscribe("b2");
        drop(rx);
        hub.prune();
        assert_eq!(hub.channel_count(), 1);
    }
}
