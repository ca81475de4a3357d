//! # The engine's public API.
//!
//! The pattern follows a constructor-injection style throughout: an API instance is created by supplying
//! the collaborators it drives, as trait implementations.
//!
//! * [`order_flow_api`] is the order state machine — the heart of the engine. Every inbound event
//!   (order submission, admin button press, delivery form, payment choice, transfer confirmation,
//!   timeout) goes through it.
//! * [`exchange_rate_api`] wraps the live price feed with the one-hour cache and fallback behaviour the
//!   quoting rules require.
pub mod errors;
pub mod exchange_rate_api;
pub mod order_flow_api;
