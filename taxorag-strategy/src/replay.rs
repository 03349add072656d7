//! Bounded replay buffer of (context, action, reward) transitions — a
//! fixed-capacity ring (10k transitions by default) that feeds off-line
//! updates to the strategy selector.

use std::collections::VecDeque;
use taxorag_retrieval::SearchMode;

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub context: String,
    pub action: SearchMode,
    pub reward: f32,
}

pub struct ReplayBuffer {
    items: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(transition);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.items.iter()
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
