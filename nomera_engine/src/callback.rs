//! Tagged callback payloads for inline keyboard buttons.
//!
//! Button presses come back from the messaging gateway as opaque strings. The payload is decoded exactly once,
//! here, into a [`BotCallback`]; the rest of the engine only ever sees the typed event. Actions and order ids
//! are JSON fields, so an id containing any particular character cannot corrupt the action.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order_types::OrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackAction {
    /// Admin: the numbers are in stock.
    Available,
    /// Admin: the numbers are gone.
    Unavailable,
    /// Customer: open the delivery-data form.
    FillForm,
    /// Customer: pay cash on delivery.
    PayCash,
    /// Customer: pay in TON at the discounted quote.
    PayTon,
    /// Customer: abandon the TON transfer and go back to the payment choice.
    CancelTon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCallback {
    pub action: CallbackAction,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Error)]
#[error("Could not decode callback payload: {0}")]
pub struct CallbackDecodeError(String);

impl BotCallback {
    pub fn new(action: CallbackAction, order_id: OrderId) -> Self {
        Self { action, order_id }
    }

    pub fn encode(&self) -> String {
        // A unit enum plus a string field cannot fail to serialize.
        serde_json::to_string(self).expect("callback payload serialization is infallible")
    }

    pub fn decode(payload: &str) -> Result<Self, CallbackDecodeError> {
        serde_json::from_str(payload).map_err(|e| CallbackDecodeError(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode() {
        let cb = BotCallback::new(CallbackAction::PayTon, OrderId::from("a1b2c3".to_string()));
        let decoded = BotCallback::decode(&cb.encode()).unwrap();
        assert_eq!(decoded, cb);
    }

    #[test]
    fn separator_characters_in_ids_are_harmless() {
        let cb = BotCallback::new(CallbackAction::Available, OrderId::from("weird_id:with_separators".to_string()));
        let decoded = BotCallback::decode(&cb.encode()).unwrap();
        assert_eq!(decoded.order_id.as_str(), "weird_id:with_separators");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(BotCallback::decode("available_abc123").is_err());
        assert!(BotCallback::decode("").is_err());
    }
}
