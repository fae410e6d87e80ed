//! Client Registry - the set of connected event streams

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;

use crate::error::WriteError;

/// Identity of a connected client, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Writable end of a client stream.
///
/// `write` must not block. Any error means the client is gone and it will be
/// dropped from the registry.
pub trait ClientSink: Send + Sync {
    fn write(&self, chunk: &Bytes) -> Result<(), WriteError>;
}

/// Registered client sinks
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Arc<dyn ClientSink>>,
    next_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Arc<dyn ClientSink>) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.clients.insert(id, sink);
        id
    }

    /// Remove a client. Returns false if it was already gone.
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }

    /// Write `chunk` to every client once.
    ///
    /// Clients whose write fails are collected during the pass and removed
    /// after it. Returns the removed ids.
    pub fn broadcast(&mut self, chunk: &Bytes) -> Vec<ClientId> {
        let mut failed = Vec::new();
        for (id, sink) in &self.clients {
            if let Err(e) = sink.write(chunk) {
                tracing::debug!(client = %id, error = %e, "SSE write failed");
                failed.push(*id);
            }
        }

        for id in &failed {
            self.clients.remove(id);
        }
        failed
    }
}
