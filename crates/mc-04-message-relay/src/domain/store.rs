//! Bounded message store keyed by id.

use std::collections::{HashMap, VecDeque};

use shared_types::Message;

/// Messages by id, evicting the oldest once `capacity` is reached.
#[derive(Debug)]
pub struct MessageStore {
    messages: HashMap<String, Message>,
    /// Ids in first-posted order.
    order: VecDeque<String>,
    capacity: usize,
}

impl MessageStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert or replace. Returns the id evicted to make room, if any.
    /// Replacing keeps the message's original place in the eviction order.
    pub fn insert(&mut self, message: Message) -> Option<String> {
        if let Some(stored) = self.messages.get_mut(&message.id) {
            *stored = message;
            return None;
        }
        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|id| {
                self.messages.remove(id);
            })
        } else {
            None
        };
        self.order.push_back(message.id.clone());
        self.messages.insert(message.id.clone(), message);
        evicted
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
