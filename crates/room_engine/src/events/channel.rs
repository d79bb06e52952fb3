//! Typed event channels
//!
//! One channel per event kind. Publishing copies the event into every live
//! subscriber's queue; subscribers drain their queue when their system runs later
//! in the same frame. A [`Subscription`] is owned by the subscribing system, so
//! dropping the system drops its queue and the channel stops delivering to it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifies one subscriber of a channel
    pub struct SubscriberKey;
}

type Queue<E> = Rc<RefCell<VecDeque<E>>>;

/// Receiving end held by a subscribing system
pub struct Subscription<E> {
    key: SubscriberKey,
    queue: Queue<E>,
}

impl<E> Subscription<E> {
    /// Key under which the channel knows this subscriber
    pub fn key(&self) -> SubscriberKey {
        self.key
    }

    /// Take every pending event in publish order
    pub fn drain(&self) -> Vec<E> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Most recent pending event, discarding older ones
    pub fn latest(&self) -> Option<E> {
        let mut queue = self.queue.borrow_mut();
        let last = queue.pop_back();
        queue.clear();
        last
    }

    /// Number of undelivered events
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Fan-out channel for one event type
pub struct EventChannel<E> {
    subscribers: SlotMap<SubscriberKey, Weak<RefCell<VecDeque<E>>>>,
}

impl<E: Clone> EventChannel<E> {
    /// Create a channel with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: SlotMap::with_key(),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Subscription<E> {
        let queue: Queue<E> = Rc::new(RefCell::new(VecDeque::new()));
        let key = self.subscribers.insert(Rc::downgrade(&queue));
        Subscription { key, queue }
    }

    /// Explicitly remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&mut self, subscription: Subscription<E>) -> bool {
        self.subscribers.remove(subscription.key).is_some()
    }

    /// Deliver an event to every live subscriber
    pub fn publish(&mut self, event: E) {
        self.subscribers.retain(|_, weak| match weak.upgrade() {
            Some(queue) => {
                queue.borrow_mut().push_back(event.clone());
                true
            }
            None => false,
        });
    }

    /// Number of registered subscribers, including ones not yet pruned
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_fans_out_in_order() {
        let mut channel = EventChannel::new();
        let a = channel.subscribe();
        let b = channel.subscribe();

        channel.publish(1);
        channel.publish(2);

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.pending(), 2);
        assert_eq!(a.pending(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut channel = EventChannel::new();
        let a = channel.subscribe();
        let b = channel.subscribe();
        assert!(channel.unsubscribe(a));

        channel.publish("x");
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(b.drain(), vec!["x"]);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let mut channel = EventChannel::new();
        {
            let _short_lived = channel.subscribe();
        }
        channel.publish(0.5_f32);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_latest_discards_backlog() {
        let mut channel = EventChannel::new();
        let sub = channel.subscribe();
        channel.publish(1);
        channel.publish(3);
        assert_eq!(sub.latest(), Some(3));
        assert_eq!(sub.pending(), 0);
        assert_eq!(sub.latest(), None);
    }
}
