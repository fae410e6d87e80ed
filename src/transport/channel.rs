//! Channel-backed client sink and the response body stream it feeds

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_core::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;

use super::clients::ClientSink;
use crate::error::WriteError;

/// Sink half: a bounded queue in front of one HTTP response
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ClientSink for ChannelSink {
    fn write(&self, chunk: &Bytes) -> Result<(), WriteError> {
        self.tx.try_send(chunk.clone()).map_err(|e| match e {
            TrySendError::Full(_) => WriteError::Full,
            TrySendError::Closed(_) => WriteError::Closed,
        })
    }
}

/// Body half. Runs its close hook once when the HTTP stack drops it.
pub struct ClientStream {
    inner: ReceiverStream<Bytes>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ClientStream {
    /// Install the hook fired when the connection goes away
    pub fn on_close(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.on_close = Some(Box::new(hook));
    }
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx).map(|chunk| chunk.map(Ok))
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

/// Create a connected sink/stream pair with room for `capacity` chunks
pub fn client_channel(capacity: usize) -> (ChannelSink, ClientStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChannelSink { tx },
        ClientStream {
            inner: ReceiverStream::new(rx),
            on_close: None,
        },
    )
}
