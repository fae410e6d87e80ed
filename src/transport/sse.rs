//! SSE transport: one streaming endpoint fanned out to every connected client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::extract::Query;
use axum::response::Response;
use axum::routing::get;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel::client_channel;
use super::clients::{ClientId, ClientRegistry, ClientSink};
use super::heartbeat::Heartbeat;
use super::replay::{ReplayBuffer, ReplayEntry};
use crate::error::TransportError;

pub const DEFAULT_SSE_PATH: &str = "/mcp/sse";
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(25_000);
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 64;

/// First chunk on every stream: reconnect after 3s
pub const RETRY_DIRECTIVE: &[u8] = b"retry: 3000\n\n";
/// Comment-only keep-alive chunk
pub const HEARTBEAT_CHUNK: &[u8] = b":\n\n";

const LAST_EVENT_ID: &str = "last-event-id";

/// Whether a reconnecting client is sent the buffered history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// History is kept but never sent
    #[default]
    Off,
    /// Send the whole buffer to connections carrying `Last-Event-ID`
    /// or requesting `?replay=all`
    Reconnect,
}

/// Query string accepted by the streaming endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    /// `all` asks for the buffered history
    pub replay: Option<String>,
}

impl ConnectQuery {
    fn wants_history(&self) -> bool {
        self.replay.as_deref() == Some("all")
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub path: String,
    pub max_buffer_size: usize,
    pub heartbeat_interval: Duration,
    pub client_queue_capacity: usize,
    pub replay_mode: ReplayMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SSE_PATH.to_string(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            replay_mode: ReplayMode::Off,
        }
    }
}

struct State {
    clients: ClientRegistry,
    replay: ReplayBuffer,
}

struct Inner {
    config: TransportConfig,
    state: Mutex<State>,
    heartbeat: Heartbeat,
    attached: AtomicBool,
}

impl State {
    /// Write `chunk` to every client; returns (dropped, remaining)
    fn broadcast(&mut self, chunk: &Bytes) -> (usize, usize) {
        let failed = self.clients.broadcast(chunk);
        (failed.len(), self.clients.len())
    }
}

fn log_pruned((dropped, remaining): (usize, usize)) {
    if dropped > 0 {
        tracing::warn!(dropped, remaining, "Removed SSE clients after failed write");
    }
}

impl Inner {
    fn broadcast(&self, chunk: &Bytes) {
        let pruned = self.state.lock().broadcast(chunk);
        log_pruned(pruned);
    }

    fn disconnect(&self, id: ClientId) {
        let removed = self.state.lock().clients.remove(id);
        if removed {
            tracing::debug!(client = %id, "SSE client disconnected");
        }
    }
}

/// Server-Sent Events broadcaster with bounded replay history.
///
/// Cloning is cheap; clones share the same clients and buffer.
#[derive(Clone)]
pub struct SseTransport {
    inner: Arc<Inner>,
}

impl SseTransport {
    pub fn new(config: TransportConfig) -> Self {
        let replay = ReplayBuffer::new(config.max_buffer_size);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    clients: ClientRegistry::new(),
                    replay,
                }),
                heartbeat: Heartbeat::new(),
                attached: AtomicBool::new(false),
            }),
        }
    }

    /// Mount the streaming endpoint on `router` and start the heartbeat.
    ///
    /// A transport can be attached once. Later calls, including after
    /// [`close`](Self::close), return [`TransportError::AlreadyAttached`].
    /// Must be called from within a tokio runtime.
    pub fn attach<S>(&self, router: Router<S>) -> Result<Router<S>, TransportError>
    where
        S: Clone + Send + Sync + 'static,
    {
        if self.inner.attached.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyAttached);
        }

        let transport = self.clone();
        let router = router.route(
            &self.inner.config.path,
            get(move |headers: HeaderMap, Query(query): Query<ConnectQuery>| {
                let transport = transport.clone();
                async move { transport.connect(&headers, &query) }
            }),
        );

        self.start_heartbeat();
        tracing::info!(path = %self.inner.config.path, "SSE transport attached");
        Ok(router)
    }

    fn start_heartbeat(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .heartbeat
            .start(self.inner.config.heartbeat_interval, move || {
                match weak.upgrade() {
                    Some(inner) => {
                        inner.broadcast(&Bytes::from_static(HEARTBEAT_CHUNK));
                        true
                    }
                    None => false,
                }
            });
    }

    /// Open a stream for one incoming request
    pub fn connect(&self, headers: &HeaderMap, query: &ConnectQuery) -> Response {
        let last_event_id = headers
            .get(LAST_EVENT_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let replay_wanted = self.inner.config.replay_mode == ReplayMode::Reconnect
            && (last_event_id.is_some() || query.wants_history());

        let (id, mut stream) = {
            let mut state = self.inner.state.lock();
            let history: Vec<Bytes> = if replay_wanted {
                state.replay.iter().map(|e| e.chunk.clone()).collect()
            } else {
                Vec::new()
            };

            // Sized so the directive and history always fit
            let capacity = self.inner.config.client_queue_capacity + history.len() + 1;
            let (sink, stream) = client_channel(capacity);
            let preamble = std::iter::once(Bytes::from_static(RETRY_DIRECTIVE)).chain(history);
            for chunk in preamble {
                if let Err(e) = sink.write(&chunk) {
                    tracing::warn!(error = %e, "Failed to queue SSE preamble");
                }
            }

            (state.clients.register(Arc::new(sink)), stream)
        };

        let weak = Arc::downgrade(&self.inner);
        stream.on_close(move || {
            if let Some(inner) = weak.upgrade() {
                inner.disconnect(id);
            }
        });

        tracing::info!(
            client = %id,
            last_event_id = last_event_id.as_deref().unwrap_or(""),
            replayed = replay_wanted,
            "SSE client connected"
        );

        let mut response = Response::new(Body::from_stream(stream));
        let response_headers = response.headers_mut();
        response_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream; charset=utf-8"),
        );
        response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        response
    }

    /// Register a sink directly, bypassing HTTP
    pub fn register_client(&self, sink: Arc<dyn ClientSink>) -> ClientId {
        let id = self.inner.state.lock().clients.register(sink);
        tracing::debug!(client = %id, "SSE client registered");
        id
    }

    /// Close notification for a client. Unknown ids are ignored.
    pub fn disconnect(&self, id: ClientId) {
        self.inner.disconnect(id);
    }

    /// Broadcast an event to every client and record it for replay.
    ///
    /// Never fails: clients that cannot be written to are dropped, and a
    /// payload that does not serialize is logged and discarded.
    pub fn emit_event<T>(&self, event_name: &str, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(event = event_name, error = %e, "Dropping unserializable SSE payload");
                return;
            }
        };

        let event_name = event_name.replace(['\r', '\n'], "");
        let chunk = encode_event(&event_name, &payload);

        let pruned = {
            let mut state = self.inner.state.lock();
            let pruned = state.broadcast(&chunk);
            state.replay.push(ReplayEntry {
                event_name,
                payload,
                chunk,
            });
            pruned
        };
        log_pruned(pruned);
    }

    pub fn client_count(&self) -> usize {
        self.inner.state.lock().clients.len()
    }

    pub fn replay_buffer_size(&self) -> usize {
        self.inner.state.lock().replay.len()
    }

    pub fn max_buffer_size(&self) -> usize {
        self.inner.state.lock().replay.max_size()
    }

    /// Buffered events, oldest first
    pub fn replay_entries(&self) -> Vec<ReplayEntry> {
        self.inner.state.lock().replay.iter().cloned().collect()
    }

    pub fn clear_replay_buffer(&self) {
        self.inner.state.lock().replay.clear();
    }

    /// Resize the replay buffer, trimming the oldest entries on shrink.
    ///
    /// Negative sizes are rejected and leave the buffer as it was.
    pub fn set_max_buffer_size(&self, size: i64) -> Result<(), TransportError> {
        let size = usize::try_from(size).map_err(|_| TransportError::InvalidBufferSize(size))?;
        self.inner.state.lock().replay.set_max_size(size);
        Ok(())
    }

    /// Stop the heartbeat and forget all clients.
    ///
    /// Open HTTP responses end once their sinks are dropped; the connections
    /// themselves belong to the HTTP server.
    pub fn close(&self) {
        self.inner.heartbeat.stop();
        let count = {
            let mut state = self.inner.state.lock();
            let count = state.clients.len();
            state.clients.clear();
            count
        };
        tracing::info!(clients = count, "SSE transport closed");
    }
}

/// Frame one event: `event:<name>\n` (omitted when empty) then `data:<json>\n\n`
pub fn encode_event(event_name: &str, payload: &Value) -> Bytes {
    let data = payload.to_string();
    let chunk = if event_name.is_empty() {
        format!("data:{data}\n\n")
    } else {
        format!("event:{event_name}\ndata:{data}\n\n")
    };
    Bytes::from(chunk)
}
