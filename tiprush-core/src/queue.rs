//! The admitted-event queue.
//!
//! Strict FIFO. Kind-based pacing is entirely the cooldown tracker's
//! responsibility; nothing here reorders.

use std::collections::VecDeque;
use uuid::Uuid;

use crate::donation::DonationEvent;

#[derive(Default)]
pub struct EventQueue {
    items: VecDeque<DonationEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: DonationEvent) {
        self.items.push_back(event);
    }

    pub fn dequeue(&mut self) -> Option<DonationEvent> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&DonationEvent> {
        self.items.front()
    }

    /// Administrative cancellation of a queued event.
    pub fn remove_by_id(&mut self, id: Uuid) -> bool {
        match self.items.iter().position(|e| e.id == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiprush_sdk::objects::{DonationKind, DonationParameters, DonationRequest};
    use tokio::time::Instant;

    fn event(actor: &str) -> DonationEvent {
        let request = DonationRequest {
            id: Uuid::new_v4(),
            actor_id: actor.into(),
            actor_name: actor.into(),
            amount_minor_units: 100,
            kind: DonationKind::Heal,
            parameters: DonationParameters {
                heal_amount: Some(10),
                ..Default::default()
            },
        };
        match DonationEvent::from_request(request, Instant::now()) {
            Ok(e) => e,
            Err(e) => unreachable!("test event must validate: {e}"),
        }
    }

    #[test]
    fn dequeue_preserves_arrival_order() {
        let mut queue = EventQueue::new();
        let first = event("a");
        let second = event("b");
        let first_id = first.id;
        let second_id = second.id;

        queue.enqueue(first);
        queue.enqueue(second);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue().map(|e| e.id), Some(first_id));
        assert_eq!(queue.dequeue().map(|e| e.id), Some(second_id));
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn remove_by_id_leaves_order_intact() {
        let mut queue = EventQueue::new();
        let first = event("a");
        let second = event("b");
        let third = event("c");
        let first_id = first.id;
        let second_id = second.id;
        let third_id = third.id;

        queue.enqueue(first);
        queue.enqueue(second);
        queue.enqueue(third);

        assert!(queue.remove_by_id(second_id));
        assert!(!queue.remove_by_id(second_id));
        assert_eq!(queue.dequeue().map(|e| e.id), Some(first_id));
        assert_eq!(queue.dequeue().map(|e| e.id), Some(third_id));
    }
}
