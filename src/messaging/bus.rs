//! Host event bus
//!
//! Fan-out of [`Event`]s to every subscribed coordinator. Each subscriber
//! gets its own unbounded channel and drains it on its own schedule.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use super::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriberId, Sender<Event>)>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new receiver. Keep the id to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self) -> (Receiver<Event>, SubscriberId) {
        let (tx, rx) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, tx));
        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|(sub, _)| *sub != id);
    }

    /// Deliver `event` to every subscriber.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn publish(&self, event: Event) {
        tracing::debug!("Publishing event: {}", event.description());
        self.subscribers
            .write()
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let (_rx, id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let (rx1, _) = bus.subscribe();
        let (rx2, _) = bus.subscribe();

        bus.publish(Event::scene_unloaded("menu"));

        for rx in [rx1, rx2] {
            match rx.try_recv().unwrap() {
                Event::SceneUnloaded { scene, .. } => assert_eq!(scene, "menu"),
                other => panic!("Unexpected event: {}", other.description()),
            }
        }
    }

    #[test]
    fn test_unsubscribed_receiver_gets_nothing() {
        let bus = EventBus::new();
        let (rx, id) = bus.subscribe();
        bus.unsubscribe(id);

        bus.publish(Event::Shutdown);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let (rx, _) = bus.subscribe();
        let (_kept, _) = bus.subscribe();
        drop(rx);

        bus.publish(Event::Shutdown);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
