//! Bounded history of broadcast events

use std::collections::VecDeque;

use axum::body::Bytes;
use serde_json::Value;

/// One broadcast event, kept for reconnecting clients
#[derive(Debug, Clone)]
pub struct ReplayEntry {
    /// Event name; empty means the default `message` event
    pub event_name: String,
    pub payload: Value,
    /// Wire-ready chunk exactly as it was broadcast
    pub chunk: Bytes,
}

/// FIFO log holding at most `max_size` entries.
///
/// Appending past capacity evicts the oldest entry. A capacity of zero keeps
/// nothing.
#[derive(Debug)]
pub struct ReplayBuffer {
    entries: VecDeque<ReplayEntry>,
    max_size: usize,
}

impl ReplayBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    pub fn push(&mut self, entry: ReplayEntry) {
        if self.max_size == 0 {
            return;
        }
        while self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the capacity, dropping the oldest entries if it shrinks
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        let excess = self.entries.len().saturating_sub(max_size);
        self.entries.drain(..excess);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ReplayEntry> {
        self.entries.iter()
    }
}
