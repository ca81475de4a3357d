//! Nomera order engine.
//!
//! The engine runs the order workflow of a phone-number shop: a customer picks numbers from the catalog,
//! an admin confirms they are in stock, the customer submits delivery details and then pays either cash
//! on delivery or in TON at a 5% discount. The library is transport-agnostic: the chat bot, the market
//! API, the chain explorer and the catalog spreadsheet are all collaborators behind the traits in
//! [`mod@traits`], and the engine only ever talks to those.
//!
//! The library is divided into three main sections:
//! 1. The order flow API ([`OrderFlowApi`]), the state machine every inbound event goes through. Its
//!    companions are the caching [`ExchangeRateApi`], the [`PaymentVerifier`] that matches wallet
//!    transfers to pending orders, and the background workers in [`mod@workers`].
//! 2. Storage ([`MemoryStore`]), an in-memory order table with an optional write-behind mirror for crash
//!    recovery. The sqlite mirror ships behind the `sqlite` feature.
//! 3. Presentation: the catalog derivations in [`mod@catalog`] and the customer/admin texts in
//!    [`mod@messages`].
//!
//! Terminal transitions are also published as events ([`mod@events`]) so that fulfilment or audit hooks
//! can be attached without touching the engine.
pub mod api;
pub mod callback;
pub mod catalog;
pub mod config;
pub mod events;
pub mod messages;
pub mod order_types;
mod store;
pub mod test_utils;
pub mod timers;
pub mod traits;
pub mod verifier;
pub mod workers;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMirror;

pub use api::{
    errors::OrderFlowError,
    exchange_rate_api::ExchangeRateApi,
    order_flow_api::{OrderFlowApi, PAYMENT_TOLERANCE_PERCENT},
};
pub use store::{MemoryStore, NullMirror};
pub use verifier::PaymentVerifier;
