//! Matches incoming wallet transfers against orders awaiting TON payment.
//!
//! The verifier is read-only towards the ledger; settlement itself goes through
//! [`OrderFlowApi::confirm_ton_payment`], which owns the tolerance check and the terminal transition.
//! Polling the same order twice is harmless: the second confirmation finds the order already paid and
//! returns it unchanged.
use log::*;

use crate::{
    api::{errors::OrderFlowError, order_flow_api::{OrderFlowApi, PAYMENT_TOLERANCE_PERCENT}},
    order_types::{Order, OrderId, OrderState},
    traits::{MessagingGateway, OrderStore, RateSource, TonLedger},
};

pub struct PaymentVerifier<B, G, S, L>
where
    B: OrderStore,
    G: MessagingGateway,
    S: RateSource,
    L: TonLedger,
{
    api: OrderFlowApi<B, G, S>,
    ledger: L,
}

impl<B, G, S, L> Clone for PaymentVerifier<B, G, S, L>
where
    B: OrderStore,
    G: MessagingGateway,
    S: RateSource,
    L: TonLedger,
{
    fn clone(&self) -> Self {
        Self { api: self.api.clone(), ledger: self.ledger.clone() }
    }
}

impl<B, G, S, L> PaymentVerifier<B, G, S, L>
where
    B: OrderStore + 'static,
    G: MessagingGateway + 'static,
    S: RateSource + 'static,
    L: TonLedger + 'static,
{
    pub fn new(api: OrderFlowApi<B, G, S>, ledger: L) -> Self {
        Self { api, ledger }
    }

    /// Check the wallet for a transfer settling this order. Returns the settled order if one matched,
    /// `None` if the order is not waiting for TON or no qualifying transfer has arrived yet.
    pub async fn poll_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let Some(order) = self.api.fetch_order(order_id).await? else {
            return Ok(None);
        };
        if order.state != OrderState::AwaitingTonPayment {
            return Ok(None);
        }
        let Some(chosen_at) = order.ton_chosen_at else {
            return Ok(None);
        };
        // the grace window absorbs clock skew between the engine and the ledger
        let since = chosen_at - self.api.config().ton_grace;
        let wallet = self.api.config().ton_wallet.clone();
        let mut transfers =
            self.ledger.incoming_transfers(&wallet, since).await.map_err(|e| OrderFlowError::Upstream(e.to_string()))?;
        transfers.sort_by_key(|t| t.timestamp);
        let required = order.discounted_ton.percent(PAYMENT_TOLERANCE_PERCENT);
        let Some(transfer) = transfers.into_iter().find(|t| t.amount >= required) else {
            trace!("💱 No qualifying transfer for order {} yet.", order.order_id);
            return Ok(None);
        };
        debug!(
            "💱 Transfer {} ({}) qualifies for order {}. Confirming.",
            transfer.tx_ref, transfer.amount, order.order_id
        );
        match self.api.confirm_ton_payment(order_id, transfer.amount, &transfer.tx_ref).await {
            Ok(order) => Ok(Some(order)),
            // a cancel or timeout won the race between the fetch and the confirm
            Err(OrderFlowError::OrderNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One verification pass over every order awaiting TON payment. Returns how many orders settled.
    pub async fn poll_pending(&self) -> Result<usize, OrderFlowError> {
        let waiting = self.api.orders_awaiting_ton_payment().await?;
        let mut settled = 0;
        for order in waiting {
            match self.poll_order(&order.order_id).await {
                Ok(Some(_)) => settled += 1,
                Ok(None) => {},
                Err(e) => warn!("💱 Verification pass failed for order {}: {e}", order.order_id),
            }
        }
        Ok(settled)
    }
}
