use std::future::Future;

use thiserror::Error;

use crate::{callback::BotCallback, order_types::ChatTarget};

/// An inline keyboard button: a label and the typed callback the gateway will echo back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageButton {
    pub label: String,
    pub callback: BotCallback,
}

impl MessageButton {
    pub fn new<S: Into<String>>(label: S, callback: BotCallback) -> Self {
        Self { label: label.into(), callback }
    }
}

/// Opaque handle to a delivered message, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// The chat-bot send primitive. The wire protocol behind it is out of scope; the engine only needs
/// fire-and-forget delivery with an acknowledgement handle.
///
/// Sends are best-effort from the state machine's point of view: the triggering transition is already
/// durable by the time a send happens, and a failure here is logged, not propagated. Futures are `Send`
/// because notifications also go out from timer tasks.
pub trait MessagingGateway: Clone + Send + Sync {
    fn send_message(
        &self,
        target: &ChatTarget,
        text: &str,
    ) -> impl Future<Output = Result<MessageRef, MessagingError>> + Send;

    fn send_with_buttons(
        &self,
        target: &ChatTarget,
        text: &str,
        buttons: &[MessageButton],
    ) -> impl Future<Output = Result<MessageRef, MessagingError>> + Send;
}

#[derive(Debug, Clone, Error)]
#[error("Message delivery failed: {0}")]
pub struct MessagingError(pub String);
