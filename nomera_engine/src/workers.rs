//! Long-running background tasks: the TON deadline sweep and the ledger verification loop.
//!
//! Both are interval-driven and idempotent, so running them alongside the per-order timers (or alongside
//! each other) is safe. They exist chiefly for restart recovery: in-process timers die with the process,
//! the sweep does not.
use std::time::Duration;

use log::*;
use tokio::task::JoinHandle;

use crate::{
    api::order_flow_api::OrderFlowApi,
    traits::{MessagingGateway, OrderStore, RateSource, TonLedger},
    verifier::PaymentVerifier,
};

/// Periodically falls orders with a lapsed TON deadline back to the payment choice.
pub fn start_payment_timeout_worker<B, G, S>(api: OrderFlowApi<B, G, S>, interval: Duration) -> JoinHandle<()>
where
    B: OrderStore + 'static,
    G: MessagingGateway + 'static,
    S: RateSource + 'static,
{
    tokio::spawn(async move {
        info!("🕰️ Payment timeout worker is starting. Sweep interval: {interval:?}");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match api.expire_overdue_ton_payments().await {
                Ok(0) => trace!("🕰️ Sweep complete. Nothing was overdue."),
                Ok(n) => info!("🕰️ Sweep complete. {n} overdue TON payment(s) expired."),
                Err(e) => warn!("🕰️ Sweep failed: {e}"),
            }
        }
    })
}

/// Periodically checks the wallet ledger for transfers settling pending orders.
pub fn start_payment_verifier_worker<B, G, S, L>(
    verifier: PaymentVerifier<B, G, S, L>,
    interval: Duration,
) -> JoinHandle<()>
where
    B: OrderStore + 'static,
    G: MessagingGateway + 'static,
    S: RateSource + 'static,
    L: TonLedger + 'static,
{
    tokio::spawn(async move {
        info!("🕰️ Payment verifier worker is starting. Poll interval: {interval:?}");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match verifier.poll_pending().await {
                Ok(0) => trace!("💱 Verification pass complete. No settlements."),
                Ok(n) => info!("💱 Verification pass complete. {n} order(s) settled."),
                Err(e) => warn!("💱 Verification pass failed: {e}"),
            }
        }
    })
}
