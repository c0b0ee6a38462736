use std::collections::VecDeque;

use super::{ChatMessage, Role};

/// Sliding window over the conversation.
///
/// Holds at most `capacity` messages. A system message is pinned and counts
/// toward the capacity; the oldest other message is evicted first.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    capacity: usize,
    system: Option<ChatMessage>,
    messages: VecDeque<ChatMessage>,
}

impl ChatMemory {
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of retained messages (at least 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            system: None,
            messages: VecDeque::new(),
        }
    }

    /// Append a message, evicting the oldest non-system messages on overflow.
    pub fn add(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.system = Some(message);
        } else {
            self.messages.push_back(message);
        }
        self.evict();
    }

    fn evict(&mut self) {
        let pinned = usize::from(self.system.is_some());
        while self.messages.len() + pinned > self.capacity {
            if self.messages.pop_front().is_none() {
                break;
            }
        }
    }

    /// Messages in conversation order, system message first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system
            .iter()
            .chain(self.messages.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len() + usize::from(self.system.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
