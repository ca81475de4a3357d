//! The order state machine.
//!
//! Every inbound event funnels through a method here, and every method follows the same discipline:
//! acquire the per-order lock, re-check the state the event targets, apply the transition, persist it,
//! release the lock, and only then send notifications. Stale events (a timer firing after payment, an
//! admin double-tap) fail the state re-check and come back as [`OrderFlowError::OrderNotFound`], which
//! callers treat as "already handled". Notifications are best-effort: the transition is durable before
//! any message goes out, and a delivery failure is logged rather than unwinding the state change.
use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use chrono::Utc;
use log::*;
use npe_common::NanoTon;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    api::{errors::OrderFlowError, exchange_rate_api::ExchangeRateApi},
    config::{EngineConfig, TON_DISCOUNT_PERCENT},
    events::{EventProducers, OrderPaidEvent, OrderRejectedEvent},
    messages,
    order_types::{AdminDecision, ChatTarget, DeliveryData, NewOrder, Order, OrderId, OrderState, PaymentMethod},
    timers::TimerRegistry,
    traits::{MessageButton, MessagingGateway, OrderStore, RateSource},
};

/// A transfer below this share of the quoted amount is rejected as an underpayment. Covers transfer fees
/// and wallet rounding; overpayment is always accepted in full.
pub const PAYMENT_TOLERANCE_PERCENT: i64 = 98;

//--------------------------------------      OrderLocks      --------------------------------------------------------
/// One mutex per order id. Serializes concurrent events for the same order (timer vs. confirm, admin
/// double-tap) while leaving unrelated orders fully parallel. Lock entries are created on demand and kept
/// for the life of the process; the set of orders a single deployment sees is small.
#[derive(Clone, Default)]
struct OrderLocks {
    locks: Arc<Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>,
}

impl OrderLocks {
    async fn acquire(&self, order_id: &OrderId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.lock().await.entry(order_id.clone()).or_default());
        lock.lock_owned().await
    }
}

//--------------------------------------     OrderFlowApi     --------------------------------------------------------
pub struct OrderFlowApi<B, G, S>
where
    B: OrderStore,
    G: MessagingGateway,
    S: RateSource,
{
    store: B,
    gateway: G,
    rates: ExchangeRateApi<S>,
    config: Arc<EngineConfig>,
    locks: OrderLocks,
    timers: TimerRegistry,
    producers: EventProducers,
}

impl<B, G, S> Clone for OrderFlowApi<B, G, S>
where
    B: OrderStore,
    G: MessagingGateway,
    S: RateSource,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            rates: self.rates.clone(),
            config: Arc::clone(&self.config),
            locks: self.locks.clone(),
            timers: self.timers.clone(),
            producers: self.producers.clone(),
        }
    }
}

impl<B, G, S> std::fmt::Debug for OrderFlowApi<B, G, S>
where
    B: OrderStore,
    G: MessagingGateway,
    S: RateSource,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, G, S> OrderFlowApi<B, G, S>
where
    B: OrderStore + 'static,
    G: MessagingGateway + 'static,
    S: RateSource + 'static,
{
    pub fn new(store: B, gateway: G, rates: ExchangeRateApi<S>, config: EngineConfig, producers: EventProducers) -> Self {
        Self {
            store,
            gateway,
            rates,
            config: Arc::new(config),
            locks: OrderLocks::default(),
            timers: TimerRegistry::new(),
            producers,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    //------------------------------------    Order submission    ----------------------------------------------------

    /// Create a new order from the customer's cart.
    ///
    /// The current UAH/TON quote and the discounted TON amount are frozen into the order here; neither
    /// changes for the life of the order, whatever the market does. The admin gets the two-button
    /// availability card and the customer gets the order summary.
    pub async fn submit_order(&self, new_order: NewOrder) -> Result<Order, OrderFlowError> {
        if new_order.lines.is_empty() {
            return Err(OrderFlowError::InvalidOrder("an order needs at least one phone number".to_string()));
        }
        if new_order.lines.iter().any(|l| l.phone_number.trim().is_empty() || !l.price.is_positive()) {
            return Err(OrderFlowError::InvalidOrder(
                "every order line needs a phone number and a positive price".to_string(),
            ));
        }
        let total = new_order.total();
        let rate = self.rates.current_rate().await;
        let discounted_ton = rate.kopiyky_to_nanoton(total.to_kopiyky() * (100 - TON_DISCOUNT_PERCENT) / 100);
        let now = Utc::now();
        let mut order = Order {
            order_id: OrderId::random(),
            lines: new_order.lines,
            total,
            rate,
            discounted_ton,
            customer: new_order.customer,
            delivery: None,
            payment_method: None,
            state: OrderState::Created,
            created_at: now,
            updated_at: now,
            ton_deadline: None,
            ton_chosen_at: None,
            ton_tx_ref: None,
        };
        // a 96-bit id collision gets one retry; two in a row is a real fault
        if let Err(e) = self.store.insert(order.clone()).await {
            match e {
                crate::traits::OrderStoreError::DuplicateOrder(dup) => {
                    warn!("🔄️📦️ Order id collision on {dup}. Regenerating.");
                    order.order_id = OrderId::random();
                    self.store.insert(order.clone()).await?;
                },
                other => return Err(other.into()),
            }
        }
        order.state = OrderState::AwaitingAdminDecision;
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        info!(
            "🔄️📦️ New order {} from {}: {} ({} / {})",
            order.order_id,
            order.customer.display_name(),
            order.phone_list(),
            order.total,
            order.discounted_ton
        );
        let (admin_text, admin_buttons) = messages::admin_new_order(&order);
        self.send_buttons_to(&self.config.admin_chat, &admin_text, &admin_buttons).await;
        self.send_to(&order.customer.chat, &messages::customer_order_received(&order)).await;
        Ok(order)
    }

    //------------------------------------     Admin decision     ----------------------------------------------------

    /// Apply the admin's availability verdict. Only valid while the order awaits it; a second press of
    /// either button comes back as `OrderNotFound`.
    pub async fn admin_decision(&self, order_id: &OrderId, decision: AdminDecision) -> Result<Order, OrderFlowError> {
        let guard = self.locks.acquire(order_id).await;
        let mut order = self.fetch_in_state(order_id, OrderState::AwaitingAdminDecision).await?;
        match decision {
            AdminDecision::Available => {
                order.state = OrderState::AwaitingDeliveryData;
                order.updated_at = Utc::now();
                self.store.update(order.clone()).await?;
                info!("🔄️📦️ Order {} confirmed available. Requesting delivery data.", order.order_id);
                drop(guard);
                self.send_to(&self.config.admin_chat, messages::admin_available_ack()).await;
                let (text, buttons) = messages::customer_delivery_form_request(&order);
                self.send_buttons_to(&order.customer.chat, &text, &buttons).await;
            },
            AdminDecision::Unavailable => {
                order.state = OrderState::Rejected;
                order.updated_at = Utc::now();
                self.store.update(order.clone()).await?;
                info!("🔄️📦️ Order {} rejected: numbers unavailable.", order.order_id);
                drop(guard);
                for producer in &self.producers.order_rejected_producer {
                    producer.publish_event(OrderRejectedEvent::new(order.clone())).await;
                }
                self.send_to(&self.config.admin_chat, messages::admin_unavailable_ack()).await;
                self.send_to(&order.customer.chat, messages::customer_unavailable()).await;
            },
        }
        Ok(order)
    }

    //------------------------------------     Delivery data      ----------------------------------------------------

    /// Store the customer's delivery form and move on to the payment choice. Resubmitting while the
    /// payment choice is still open replaces the previous form.
    pub async fn submit_delivery_data(&self, order_id: &OrderId, data: DeliveryData) -> Result<Order, OrderFlowError> {
        let missing = data.missing_fields();
        if !missing.is_empty() {
            return Err(OrderFlowError::InvalidOrder(format!("delivery form is missing: {}", missing.join(", "))));
        }
        let guard = self.locks.acquire(order_id).await;
        let mut order = self.fetch_order_locked(order_id).await?;
        if !matches!(order.state, OrderState::AwaitingDeliveryData | OrderState::AwaitingPaymentChoice) {
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        order.delivery = Some(data);
        order.state = OrderState::AwaitingPaymentChoice;
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        info!("🔄️📦️ Order {} has delivery data. Offering payment options.", order.order_id);
        drop(guard);
        let (text, buttons) = messages::customer_payment_choice(&order);
        self.send_buttons_to(&order.customer.chat, &text, &buttons).await;
        Ok(order)
    }

    //------------------------------------     Payment choice     ----------------------------------------------------

    /// Commit the customer to a payment method.
    ///
    /// Cash is terminal immediately. TON opens the payment window: the deadline is stamped on the order
    /// and a timeout task is scheduled that will fall the order back to the payment choice if no transfer
    /// arrives in time.
    pub async fn choose_payment(&self, order_id: &OrderId, method: PaymentMethod) -> Result<Order, OrderFlowError> {
        let guard = self.locks.acquire(order_id).await;
        let mut order = self.fetch_in_state(order_id, OrderState::AwaitingPaymentChoice).await?;
        let now = Utc::now();
        order.payment_method = Some(method);
        order.updated_at = now;
        match method {
            PaymentMethod::CashOnDelivery => {
                order.state = OrderState::ConfirmedCash;
                order.ton_deadline = None;
                self.store.update(order.clone()).await?;
                info!("🔄️📦️ Order {} confirmed with cash on delivery.", order.order_id);
                drop(guard);
                self.send_to(&self.config.admin_chat, &messages::admin_cash_summary(&order)).await;
                self.send_to(&order.customer.chat, messages::customer_cash_ack()).await;
            },
            PaymentMethod::Ton => {
                order.state = OrderState::AwaitingTonPayment;
                order.ton_chosen_at = Some(now);
                order.ton_deadline = Some(now + self.config.payment_timeout);
                self.store.update(order.clone()).await?;
                info!(
                    "🔄️📦️ Order {} awaits a TON transfer of {} until {}.",
                    order.order_id,
                    order.discounted_ton,
                    order.ton_deadline.unwrap_or(now)
                );
                let delay = self.config.payment_timeout.to_std().unwrap_or(StdDuration::ZERO);
                let api = self.clone();
                let id = order_id.clone();
                self.timers
                    .schedule(order_id.clone(), delay, async move {
                        if let Err(e) = api.abandon_ton_payment(&id, true).await {
                            debug!("⏲️ TON timeout for order {id} had nothing to do: {e}");
                        }
                    })
                    .await;
                drop(guard);
                let (text, buttons) = messages::customer_ton_instructions(&order, &self.config.ton_wallet);
                self.send_buttons_to(&order.customer.chat, &text, &buttons).await;
                self.send_to(&self.config.admin_chat, &messages::admin_ton_pending(&order)).await;
            },
        }
        Ok(order)
    }

    //------------------------------------    TON confirmation    ----------------------------------------------------

    /// Accept an observed TON transfer against the order.
    ///
    /// Anything from 98% of the quote upwards settles the order; overpayment is accepted in full. An
    /// underpayment leaves the order waiting (the transfer fee may simply have been deducted twice, and
    /// the customer can top up within the window). Confirming an already-paid order returns the order
    /// unchanged, so a racing verifier poll and an explicit confirmation cannot double-fire.
    pub async fn confirm_ton_payment(
        &self,
        order_id: &OrderId,
        amount: NanoTon,
        tx_ref: &str,
    ) -> Result<Order, OrderFlowError> {
        let guard = self.locks.acquire(order_id).await;
        let mut order = self.fetch_order_locked(order_id).await?;
        if order.state == OrderState::Paid {
            debug!("💱 Order {} is already paid. Ignoring duplicate confirmation ({tx_ref}).", order.order_id);
            return Ok(order);
        }
        if order.state != OrderState::AwaitingTonPayment {
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        let required = order.discounted_ton.percent(PAYMENT_TOLERANCE_PERCENT);
        if amount < required {
            info!(
                "💱 Transfer {tx_ref} underpays order {}: {} observed, {} quoted.",
                order.order_id, amount, order.discounted_ton
            );
            return Err(OrderFlowError::Underpaid {
                order_id: order_id.clone(),
                expected: order.discounted_ton,
                observed: amount,
            });
        }
        order.state = OrderState::Paid;
        order.ton_tx_ref = Some(tx_ref.to_string());
        order.ton_deadline = None;
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        self.timers.cancel(order_id).await;
        info!("🔄️📦️ Order {} paid: {} via {tx_ref}.", order.order_id, amount);
        drop(guard);
        for producer in &self.producers.order_paid_producer {
            producer.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
        self.send_to(&order.customer.chat, &messages::customer_ton_paid(&order)).await;
        self.send_to(&self.config.admin_chat, &messages::admin_ton_receipt(&order, tx_ref)).await;
        Ok(order)
    }

    /// The customer backs out of the TON transfer. Same fallback as a timeout, minus the waiting.
    pub async fn cancel_ton_payment(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.abandon_ton_payment(order_id, false).await
    }

    /// The single fallback path out of `AwaitingTonPayment`, shared by the cancel button, the per-order
    /// timer and the sweep. The state re-check under the lock makes it idempotent: whichever of them runs
    /// first does the work, the rest get `OrderNotFound`.
    async fn abandon_ton_payment(&self, order_id: &OrderId, timed_out: bool) -> Result<Order, OrderFlowError> {
        let guard = self.locks.acquire(order_id).await;
        let mut order = self.fetch_in_state(order_id, OrderState::AwaitingTonPayment).await?;
        // a stale timer can fire into a window the customer has since re-opened; only a lapsed
        // deadline may time an order out
        if timed_out && order.ton_deadline.map(|d| d > Utc::now()).unwrap_or(false) {
            debug!("⏲️ Timeout for order {order_id} arrived before its deadline. Ignoring the stale event.");
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        order.state = OrderState::AwaitingPaymentChoice;
        order.payment_method = None;
        order.ton_deadline = None;
        order.updated_at = Utc::now();
        self.store.update(order.clone()).await?;
        self.timers.cancel(order_id).await;
        let reason = if timed_out { "window expired" } else { "cancelled by customer" };
        info!("🔄️📦️ Order {} falls back to the payment choice ({reason}).", order.order_id);
        drop(guard);
        let (text, buttons) = messages::customer_ton_fallback(&order, timed_out);
        self.send_buttons_to(&order.customer.chat, &text, &buttons).await;
        self.send_to(&self.config.admin_chat, &messages::admin_ton_cancelled(&order, timed_out)).await;
        Ok(order)
    }

    //------------------------------------     Sweep & lookup     ----------------------------------------------------

    /// Fall every order whose TON deadline has passed back to the payment choice. The safety net behind
    /// the per-order timers (which do not survive a restart). Returns how many orders were expired.
    pub async fn expire_overdue_ton_payments(&self) -> Result<usize, OrderFlowError> {
        let now = Utc::now();
        let waiting = self.store.list_by_state(OrderState::AwaitingTonPayment).await?;
        let mut expired = 0;
        for order in waiting {
            let overdue = order.ton_deadline.map(|d| d <= now).unwrap_or(true);
            if !overdue {
                continue;
            }
            match self.abandon_ton_payment(&order.order_id, true).await {
                Ok(_) => expired += 1,
                // lost the race to a confirm, cancel or timer; nothing to do
                Err(OrderFlowError::OrderNotFound(_)) => {},
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.store.fetch_order(order_id).await?)
    }

    /// Snapshot of every order currently waiting on a TON transfer. Used by the payment verifier.
    pub async fn orders_awaiting_ton_payment(&self) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.store.list_by_state(OrderState::AwaitingTonPayment).await?)
    }

    //------------------------------------       Internals        ----------------------------------------------------

    async fn fetch_order_locked(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.store.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }

    async fn fetch_in_state(&self, order_id: &OrderId, state: OrderState) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order_locked(order_id).await?;
        if order.state != state {
            debug!("🔄️📦️ Order {order_id} is in state {}, not {state}. Ignoring the event.", order.state);
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        Ok(order)
    }

    async fn send_to(&self, target: &ChatTarget, text: &str) {
        if let Err(e) = self.gateway.send_message(target, text).await {
            warn!("📨️ Could not deliver a message to {target}: {e}");
        }
    }

    async fn send_buttons_to(&self, target: &ChatTarget, text: &str, buttons: &[MessageButton]) {
        if let Err(e) = self.gateway.send_with_buttons(target, text, buttons).await {
            warn!("📨️ Could not deliver a message to {target}: {e}");
        }
    }
}
