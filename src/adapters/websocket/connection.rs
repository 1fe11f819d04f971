//! Per-connection pump: one inbound and one outbound task.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────── read loop ────────────┐
//!  stream ──►│ deadline (pong_wait), size check  │──► Dispatcher ──► hub / queue
//!            └───────────────┬───────────────────┘
//!                            │ exit: unregister, close queue, departure notice
//!                            ▼
//!                       Lifecycle (watch)
//!                            ▲
//!            ┌───────────────┴───────────────────┐
//!  queue ───►│ write loop: burst + flush, pings  │──► sink
//!            └───────────────────────────────────┘
//! ```
//!
//! Either loop stopping moves the connection to `Draining`. Only the read
//! loop performs cleanup, so it happens once. The write loop ends when the
//! queue is closed, sending a close frame first. The last loop to exit
//! marks the connection `Closed`.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, timeout_at, Instant};

use crate::config::HubConfig;
use crate::domain::foundation::{RoomId, StateMachine};
use crate::domain::lobby::ConnectionState;

use super::dispatcher::{Dispatcher, HandlerError};
use super::hub::{DeliveryReport, HubHandle};
use super::messages::{Envelope, ResultKind};
use super::room::{Client, EnqueueError, OutboundMessage};
use super::transport::{Frame, FrameSink, FrameStream, TransportError};

/// Deadlines and limits for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub write_wait: Duration,
    pub max_message_size: usize,
}

impl From<&HubConfig> for PumpSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            pong_wait: config.pong_wait(),
            ping_period: config.ping_period(),
            write_wait: config.write_wait(),
            max_message_size: config.max_message_size,
        }
    }
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

/// Observable connection state, shared by the handshake and both loops.
#[derive(Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<ConnectionState>>,
    running: Arc<AtomicUsize>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            state: Arc::new(state),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Move to `next` if the state machine allows it.
    pub fn advance(&self, next: ConnectionState) -> bool {
        self.state
            .send_if_modified(|current| match current.transition_to(next) {
                Ok(state) => {
                    *current = state;
                    true
                }
                Err(_) => false,
            })
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Wait until the connection is `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.subscribe();
        while !rx.borrow_and_update().is_terminal() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn loop_started(&self) {
        self.running.fetch_add(1, Ordering::AcqRel);
    }

    fn loop_exited(&self) {
        if self.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.advance(ConnectionState::Closed);
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// What a handler may do on behalf of one connected client.
#[derive(Clone)]
pub struct ConnectionContext {
    client: Arc<Client>,
    hub: HubHandle,
}

impl ConnectionContext {
    pub fn new(client: Arc<Client>, hub: HubHandle) -> Self {
        Self { client, hub }
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn room_id(&self) -> &RoomId {
        self.client.room_id()
    }

    /// Queue a message for this client without waiting.
    ///
    /// A full queue evicts the client.
    pub async fn enqueue(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        match self.client.try_enqueue(message) {
            Err(EnqueueError::Full) => {
                self.hub.evict_client(&self.client).await;
                Err(EnqueueError::Full)
            }
            other => other,
        }
    }

    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        self.enqueue(envelope.encode()?).await?;
        Ok(())
    }

    pub async fn send_reply(
        &self,
        message_type: &str,
        result: ResultKind,
        data: serde_json::Value,
    ) -> Result<(), HandlerError> {
        self.send_envelope(&Envelope::reply(message_type, result, data))
            .await
    }

    /// Send `envelope` to every member of this client's room, sender
    /// included.
    pub async fn broadcast_to_room(&self, envelope: &Envelope) -> Result<DeliveryReport, HandlerError> {
        let message = envelope.encode()?;
        Ok(self.hub.broadcast(self.room_id(), message).await)
    }
}

/// Both loops of a running connection.
pub struct PumpHandle {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    lifecycle: Lifecycle,
}

impl PumpHandle {
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Wait for both loops to finish.
    pub async fn join(self) {
        if let Err(err) = self.reader.await {
            tracing::error!(error = %err, "read loop panicked");
        }
        if let Err(err) = self.writer.await {
            tracing::error!(error = %err, "write loop panicked");
        }
    }
}

/// Runs a registered client's connection until it ends.
pub struct ConnectionPump {
    ctx: ConnectionContext,
    dispatcher: Arc<Dispatcher>,
    settings: PumpSettings,
    lifecycle: Lifecycle,
}

impl ConnectionPump {
    pub fn new(
        ctx: ConnectionContext,
        dispatcher: Arc<Dispatcher>,
        settings: PumpSettings,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            ctx,
            dispatcher,
            settings,
            lifecycle,
        }
    }

    /// Start both loops. The connection becomes `Active`.
    pub fn spawn(
        self,
        outbound: mpsc::Receiver<OutboundMessage>,
        sink: FrameSink,
        stream: FrameStream,
    ) -> PumpHandle {
        let Self {
            ctx,
            dispatcher,
            settings,
            lifecycle,
        } = self;

        lifecycle.advance(ConnectionState::Active);
        lifecycle.loop_started();
        lifecycle.loop_started();
        tracing::debug!(client = %ctx.client(), "connection active");

        let writer = tokio::spawn(write_loop(
            ctx.client().clone(),
            settings,
            lifecycle.clone(),
            outbound,
            sink,
        ));
        let reader = tokio::spawn(read_loop(ctx, dispatcher, settings, lifecycle.clone(), stream));

        PumpHandle {
            reader,
            writer,
            lifecycle,
        }
    }
}

async fn read_loop(
    ctx: ConnectionContext,
    dispatcher: Arc<Dispatcher>,
    settings: PumpSettings,
    lifecycle: Lifecycle,
    mut stream: FrameStream,
) {
    let mut state = lifecycle.subscribe();
    let mut deadline = Instant::now() + settings.pong_wait;

    let outcome: Result<(), TransportError> = loop {
        if !state.borrow_and_update().is_active() {
            break Ok(());
        }

        let next = tokio::select! {
            next = timeout_at(deadline, stream.next()) => next,
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                continue;
            }
        };

        let frame = match next {
            Err(_) => break Err(TransportError::ReadDeadline),
            Ok(None) => break Err(TransportError::Closed),
            Ok(Some(Err(err))) => break Err(err),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Frame::Pong(_) => deadline = Instant::now() + settings.pong_wait,
            Frame::Ping(_) => {}
            Frame::Close => break Ok(()),
            Frame::Binary(_) => {
                tracing::warn!(client = %ctx.client(), "unsupported binary frame, skipping");
            }
            Frame::Text(text) => {
                if text.len() > settings.max_message_size {
                    break Err(TransportError::FrameTooLarge {
                        size: text.len(),
                        limit: settings.max_message_size,
                    });
                }
                let envelope = match Envelope::decode(&text) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        tracing::warn!(client = %ctx.client(), error = %err, "invalid envelope, skipping");
                        continue;
                    }
                };
                if let ControlFlow::Break(()) = dispatcher.dispatch(&ctx, envelope).await {
                    break Ok(());
                }
            }
        }
    };

    match &outcome {
        Ok(()) => tracing::debug!(client = %ctx.client(), "read loop finished"),
        Err(err) => tracing::debug!(client = %ctx.client(), error = %err, "read loop stopped"),
    }

    lifecycle.advance(ConnectionState::Draining);
    ctx.hub().unregister_client(ctx.client()).await;
    ctx.client().close_queue();
    dispatcher.departure_notice(&ctx).await;

    lifecycle.loop_exited();
}

async fn write_loop(
    client: Arc<Client>,
    settings: PumpSettings,
    lifecycle: Lifecycle,
    mut outbound: mpsc::Receiver<OutboundMessage>,
    mut sink: FrameSink,
) {
    let mut ticker = interval_at(Instant::now() + settings.ping_period, settings.ping_period);

    let outcome: Result<(), TransportError> = loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(first) = message else {
                    let _ = timeout(settings.write_wait, sink.send(Frame::Close)).await;
                    break Ok(());
                };
                // Only what was queued when the burst began; later messages
                // wait for the next turn so the ping ticker is not starved.
                let pending = outbound.len();
                let burst = async {
                    sink.feed(Frame::Text(first.to_string())).await?;
                    for _ in 0..pending {
                        let Ok(next) = outbound.try_recv() else {
                            break;
                        };
                        sink.feed(Frame::Text(next.to_string())).await?;
                    }
                    sink.flush().await
                };
                match timeout(settings.write_wait, burst).await {
                    Err(_) => break Err(TransportError::WriteDeadline),
                    Ok(Err(err)) => break Err(err),
                    Ok(Ok(())) => {}
                }
            }
            _ = ticker.tick() => {
                match timeout(settings.write_wait, sink.send(Frame::Ping(Vec::new()))).await {
                    Err(_) => break Err(TransportError::WriteDeadline),
                    Ok(Err(err)) => break Err(err),
                    Ok(Ok(())) => {}
                }
            }
        }
    };

    match &outcome {
        Ok(()) => tracing::debug!(client = %client, "write loop finished"),
        Err(err) => tracing::debug!(client = %client, error = %err, "write loop stopped"),
    }

    drop(sink);
    lifecycle.advance(ConnectionState::Draining);
    lifecycle.loop_exited();
}
