//! Routes decoded envelopes to message handlers.
//!
//! A [`Dispatcher`] is a table from type tag to [`Route`]:
//!
//! - [`Route::Reply`]: the handler computes data and the dispatcher sends a
//!   `success` reply echoing the request type.
//! - [`Route::Effect`]: the handler does its own sending (usually a room
//!   broadcast) and nothing is replied automatically.
//!
//! Failures are split by [`HandlerError::is_warning`]. Warnings go back to
//! the sender as an `error` reply and the connection continues; anything
//! else sends an `ERROR` envelope and stops the inbound loop.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::ports::{ContentRejected, ContentValidator};

use super::connection::ConnectionContext;
use super::messages::{self, Envelope, EnvelopeError, ResultKind};
use super::room::EnqueueError;

/// Errors raised while handling one inbound message.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Reported to the sender; the connection stays open.
    #[error("{0}")]
    Warning(String),

    #[error("could not queue message: {0}")]
    Queue(#[from] EnqueueError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("handler failed: {0}")]
    Fatal(String),
}

impl HandlerError {
    pub fn warning(message: impl Into<String>) -> Self {
        HandlerError::Warning(message.into())
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, HandlerError::Warning(_))
    }
}

impl From<ContentRejected> for HandlerError {
    fn from(rejected: ContentRejected) -> Self {
        HandlerError::Warning(rejected.to_string())
    }
}

/// Handler whose result becomes the `data` of a success reply.
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    async fn handle(&self, ctx: &ConnectionContext, payload: Value) -> Result<Value, HandlerError>;
}

/// Handler that performs its own side effects.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    async fn handle(&self, ctx: &ConnectionContext, payload: Value) -> Result<(), HandlerError>;
}

#[derive(Clone)]
pub enum Route {
    Reply(Arc<dyn ReplyHandler>),
    Effect(Arc<dyn EffectHandler>),
}

/// Message type → handler table, shared by every connection.
#[derive(Clone, Default)]
pub struct Dispatcher {
    routes: HashMap<String, Route>,
    validators: HashMap<String, Arc<dyn ContentValidator>>,
    departure: Option<String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply handler for `message_type`.
    pub fn reply(mut self, message_type: &str, handler: impl ReplyHandler + 'static) -> Self {
        self.routes
            .insert(message_type.to_string(), Route::Reply(Arc::new(handler)));
        self
    }

    /// Register an effect handler for `message_type`.
    pub fn effect(mut self, message_type: &str, handler: impl EffectHandler + 'static) -> Self {
        self.routes
            .insert(message_type.to_string(), Route::Effect(Arc::new(handler)));
        self
    }

    /// Check payloads of `message_type` before its handler runs.
    pub fn validate_with(
        mut self,
        message_type: &str,
        validator: impl ContentValidator + 'static,
    ) -> Self {
        self.validators
            .insert(message_type.to_string(), Arc::new(validator));
        self
    }

    /// Dispatch `message_type` on behalf of a client whose connection has
    /// ended, after it has left its room.
    pub fn announce_departure_as(mut self, message_type: &str) -> Self {
        self.departure = Some(message_type.to_string());
        self
    }

    pub fn handles(&self, message_type: &str) -> bool {
        self.routes.contains_key(message_type)
    }

    /// Handle one envelope from `ctx`'s client.
    ///
    /// Returns `Break` when the inbound loop must stop.
    pub async fn dispatch(&self, ctx: &ConnectionContext, envelope: Envelope) -> ControlFlow<()> {
        let Envelope {
            message_type,
            payload,
        } = envelope;

        let Some(route) = self.routes.get(&message_type) else {
            tracing::warn!(
                client = %ctx.client(),
                message_type = %message_type,
                "unknown message type, skipping"
            );
            return ControlFlow::Continue(());
        };

        tracing::trace!(client = %ctx.client(), message_type = %message_type, "dispatching");

        match self.run(route, ctx, &message_type, payload).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) if err.is_warning() => {
                tracing::debug!(
                    client = %ctx.client(),
                    message_type = %message_type,
                    error = %err,
                    "rejected message"
                );
                let reply = Envelope::reply(
                    message_type.as_str(),
                    ResultKind::Error,
                    Value::String(err.to_string()),
                );
                match ctx.send_envelope(&reply).await {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            }
            Err(err) => {
                tracing::error!(
                    client = %ctx.client(),
                    message_type = %message_type,
                    error = %err,
                    "handler failed, closing connection"
                );
                let notice = Envelope::error(messages::ERROR, "serverError");
                let _ = ctx.send_envelope(&notice).await;
                ControlFlow::Break(())
            }
        }
    }

    /// Run the departure route, if one is configured.
    pub async fn departure_notice(&self, ctx: &ConnectionContext) {
        let Some(message_type) = self.departure.as_deref() else {
            return;
        };
        let Some(route) = self.routes.get(message_type) else {
            return;
        };
        if let Err(err) = self.run(route, ctx, message_type, Value::Null).await {
            tracing::debug!(
                client = %ctx.client(),
                message_type,
                error = %err,
                "departure notice failed"
            );
        }
    }

    async fn run(
        &self,
        route: &Route,
        ctx: &ConnectionContext,
        message_type: &str,
        payload: Value,
    ) -> Result<(), HandlerError> {
        if let Some(validator) = self.validators.get(message_type) {
            validator.validate(&payload)?;
        }

        match route {
            Route::Reply(handler) => {
                let data = handler.handle(ctx, payload).await?;
                ctx.send_envelope(&Envelope::success(message_type, data))
                    .await
            }
            Route::Effect(handler) => handler.handle(ctx, payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::hub::Hub;
    use crate::adapters::websocket::room::{Client, OutboundMessage, Room};
    use crate::domain::foundation::RoomId;
    use crate::domain::lobby::Username;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct Echo;

    #[async_trait]
    impl ReplyHandler for Echo {
        async fn handle(&self, _ctx: &ConnectionContext, payload: Value) -> Result<Value, HandlerError> {
            Ok(payload)
        }
    }

    struct Fails(fn() -> HandlerError);

    #[async_trait]
    impl ReplyHandler for Fails {
        async fn handle(&self, _ctx: &ConnectionContext, _payload: Value) -> Result<Value, HandlerError> {
            Err((self.0)())
        }
    }

    #[derive(Clone, Default)]
    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl EffectHandler for Counter {
        async fn handle(&self, _ctx: &ConnectionContext, _payload: Value) -> Result<(), HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NeedsName;

    impl ContentValidator for NeedsName {
        fn validate(&self, payload: &Value) -> Result<(), ContentRejected> {
            match payload.get("name") {
                Some(_) => Ok(()),
                None => Err(ContentRejected::new("name is required")),
            }
        }
    }

    async fn context() -> (ConnectionContext, mpsc::Receiver<OutboundMessage>) {
        let hub = Hub::spawn();
        let room = Arc::new(Room::new(RoomId::new("r1").unwrap(), 4, "MAP"));
        hub.register_room(room.clone()).await;
        let (client, rx) = Client::new(Username::new("alice").unwrap(), &room, 8);
        hub.register_client(&client).await.unwrap();
        (ConnectionContext::new(client, hub), rx)
    }

    fn decode(message: Option<OutboundMessage>) -> Envelope {
        Envelope::decode(&message.expect("expected a queued message")).unwrap()
    }

    #[tokio::test]
    async fn reply_route_sends_success_with_request_type() {
        let (ctx, mut rx) = context().await;
        let dispatcher = Dispatcher::new().reply("echo", Echo);

        let flow = dispatcher
            .dispatch(&ctx, Envelope::new("echo", json!({"n": 1})))
            .await;

        assert_eq!(flow, ControlFlow::Continue(()));
        let reply = decode(rx.recv().await);
        assert_eq!(reply.message_type, "echo");
        let payload = reply.reply_payload().unwrap();
        assert_eq!(payload.result, ResultKind::Success);
        assert_eq!(payload.data, json!({"n": 1}));
    }

    #[tokio::test]
    async fn effect_route_sends_nothing_automatically() {
        let (ctx, mut rx) = context().await;
        let counter = Counter::default();
        let dispatcher = Dispatcher::new().effect("tick", counter.clone());

        let flow = dispatcher
            .dispatch(&ctx, Envelope::new("tick", Value::Null))
            .await;

        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_type_is_skipped() {
        let (ctx, mut rx) = context().await;
        let dispatcher = Dispatcher::new().reply("echo", Echo);

        let flow = dispatcher
            .dispatch(&ctx, Envelope::new("mystery", Value::Null))
            .await;

        assert_eq!(flow, ControlFlow::Continue(()));
        assert!(rx.try_recv().is_err());
        assert!(!dispatcher.handles("mystery"));
    }

    #[tokio::test]
    async fn validator_rejection_is_a_warning_reply() {
        let (ctx, mut rx) = context().await;
        let dispatcher = Dispatcher::new()
            .reply("greet", Echo)
            .validate_with("greet", NeedsName);

        let flow = dispatcher
            .dispatch(&ctx, Envelope::new("greet", json!({})))
            .await;

        assert_eq!(flow, ControlFlow::Continue(()));
        let reply = decode(rx.recv().await);
        assert_eq!(reply.message_type, "greet");
        let payload = reply.reply_payload().unwrap();
        assert_eq!(payload.result, ResultKind::Error);
        assert_eq!(payload.data, json!("name is required"));
    }

    #[tokio::test]
    async fn handler_warning_keeps_connection_open() {
        let (ctx, mut rx) = context().await;
        let dispatcher =
            Dispatcher::new().reply("try", Fails(|| HandlerError::warning("not now")));

        let flow = dispatcher.dispatch(&ctx, Envelope::new("try", Value::Null)).await;

        assert_eq!(flow, ControlFlow::Continue(()));
        let payload = decode(rx.recv().await).reply_payload().unwrap();
        assert_eq!(payload.data, json!("not now"));
    }

    #[tokio::test]
    async fn fatal_error_sends_server_error_and_stops() {
        let (ctx, mut rx) = context().await;
        let dispatcher =
            Dispatcher::new().reply("boom", Fails(|| HandlerError::Fatal("broken".into())));

        let flow = dispatcher.dispatch(&ctx, Envelope::new("boom", Value::Null)).await;

        assert_eq!(flow, ControlFlow::Break(()));
        let notice = decode(rx.recv().await);
        assert_eq!(notice.message_type, messages::ERROR);
        let payload = notice.reply_payload().unwrap();
        assert_eq!(payload.result, ResultKind::Error);
        assert_eq!(payload.data, json!("serverError"));
    }

    #[tokio::test]
    async fn departure_notice_runs_configured_route() {
        let (ctx, _rx) = context().await;
        let counter = Counter::default();
        let dispatcher = Dispatcher::new()
            .effect("bye", counter.clone())
            .announce_departure_as("bye");

        dispatcher.departure_notice(&ctx).await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn departure_notice_without_route_is_noop() {
        let (ctx, mut rx) = context().await;
        Dispatcher::new().departure_notice(&ctx).await;
        assert!(rx.try_recv().is_err());
    }
}
