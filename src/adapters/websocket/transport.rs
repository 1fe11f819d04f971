//! Frame-level transport seen by the connection pump.
//!
//! The pump never touches axum types directly. A socket is split into a
//! boxed [`FrameSink`] and [`FrameStream`], which lets tests drive a pump
//! with in-memory channels instead of a real upgrade.

use std::pin::Pin;

use axum::extract::ws::{Message, WebSocket};
use futures::channel::mpsc;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;

/// One WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Connection-fatal transport failures. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport error: {0}")]
    Io(String),

    #[error("frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("no pong within read deadline")]
    ReadDeadline,

    #[error("write did not complete within deadline")]
    WriteDeadline,

    #[error("transport closed")]
    Closed,
}

impl From<axum::Error> for TransportError {
    fn from(err: axum::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Outbound half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of a connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
            Frame::Ping(bytes) => Message::Ping(bytes),
            Frame::Pong(bytes) => Message::Pong(bytes),
            Frame::Close => Message::Close(None),
        }
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(bytes) => Frame::Binary(bytes),
            Message::Ping(bytes) => Frame::Ping(bytes),
            Message::Pong(bytes) => Frame::Pong(bytes),
            Message::Close(_) => Frame::Close,
        }
    }
}

/// Split an upgraded socket into pump halves.
pub fn split_websocket(socket: WebSocket) -> (FrameSink, FrameStream) {
    let (sink, stream) = socket.split();

    let sink = sink
        .sink_map_err(TransportError::from)
        .with(|frame: Frame| future::ready(Ok::<_, TransportError>(Message::from(frame))));
    let stream = stream.map(|result| result.map(Frame::from).map_err(TransportError::from));

    (Box::pin(sink), Box::pin(stream))
}

/// The far end of an in-memory transport.
///
/// `inbound` feeds frames to the pump's reader; `outbound` yields what the
/// pump's writer sent. Dropping `inbound` ends the pump's stream.
pub struct MemoryPeer {
    pub inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    pub outbound: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Send a text frame to the pump.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.inbound
            .unbounded_send(Ok(Frame::Text(text.into())))
            .is_ok()
    }

    pub fn send_frame(&self, frame: Frame) -> bool {
        self.inbound.unbounded_send(Ok(frame)).is_ok()
    }

    /// Next frame written by the pump, or `None` once the pump dropped its sink.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.outbound.next().await
    }
}

/// Channel-backed transport for driving a pump without a socket.
pub fn memory_transport() -> (FrameSink, FrameStream, MemoryPeer) {
    let (to_pump, from_peer) = mpsc::unbounded::<Result<Frame, TransportError>>();
    let (to_peer, from_pump) = mpsc::unbounded::<Frame>();

    let sink = to_peer.sink_map_err(|_| TransportError::Closed);
    let peer = MemoryPeer {
        inbound: to_pump,
        outbound: from_pump,
    };

    (Box::pin(sink), Box::pin(from_peer), peer)
}
