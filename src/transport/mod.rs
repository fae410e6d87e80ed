//! Event streaming transport
//!
//! Pushes named JSON events to every client connected to a long-lived
//! Server-Sent Events endpoint. Recent events are kept in a bounded replay
//! buffer and a heartbeat comment keeps idle connections open.

mod channel;
mod clients;
mod heartbeat;
mod replay;
mod sse;

pub use clients::{ClientId, ClientSink};
pub use replay::ReplayEntry;
pub use sse::{
    DEFAULT_CLIENT_QUEUE_CAPACITY, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_BUFFER_SIZE,
    DEFAULT_SSE_PATH, ConnectQuery, ReplayMode, SseTransport, TransportConfig, encode_event,
};
