//! The TON payment window: confirmation, tolerance, cancellation, the timeout fallback and the ledger
//! verifier.
mod helpers;

use chrono::{Duration, Utc};
use helpers::*;
use nomera_engine::{
    callback::CallbackAction,
    events::{EventHandlers, EventHooks},
    order_types::{OrderState, PaymentMethod},
    test_utils::StaticLedger,
    traits::TonTransfer,
    OrderFlowError,
    PaymentVerifier,
};
use npe_common::NanoTon;

// 5000 UAH minus 5%, at 180 UAH/TON
const QUOTED: i64 = 26_388_888_888;

#[tokio::test]
async fn choosing_ton_opens_the_payment_window() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;

    let waiting = h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();
    assert_eq!(waiting.state, OrderState::AwaitingTonPayment);
    assert_eq!(waiting.payment_method, Some(PaymentMethod::Ton));
    assert!(waiting.ton_deadline.is_some());
    assert!(waiting.ton_chosen_at.is_some());

    let instructions = h.gateway.last_to(&h.customer).unwrap();
    assert!(instructions.text.contains("UQtest-wallet"));
    assert!(instructions.text.contains("26.389 TON"));
    assert_eq!(instructions.buttons.len(), 1);
    assert_eq!(instructions.buttons[0].callback.action, CallbackAction::CancelTon);
}

#[tokio::test]
async fn a_matching_transfer_settles_the_order_and_cancels_the_timer() {
    let h = harness_with_timeout(Duration::milliseconds(100));
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    let paid = h.api.confirm_ton_payment(&order.order_id, NanoTon::from(QUOTED), "tx-001").await.unwrap();
    assert_eq!(paid.state, OrderState::Paid);
    assert_eq!(paid.ton_tx_ref.as_deref(), Some("tx-001"));
    assert!(paid.ton_deadline.is_none());

    let sent_before = h.gateway.count_to(&h.customer);
    // well past the original deadline; the cancelled timer must not fall the order back
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::Paid);
    assert_eq!(h.gateway.count_to(&h.customer), sent_before);
}

#[tokio::test]
async fn the_tolerance_covers_transfer_fees_and_overpayment() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    // exactly 98% of the quote is still accepted
    let at_tolerance = NanoTon::from(QUOTED).percent(98);
    let paid = h.api.confirm_ton_payment(&order.order_id, at_tolerance, "tx-fee").await.unwrap();
    assert_eq!(paid.state, OrderState::Paid);

    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();
    let generous = NanoTon::from(QUOTED * 2);
    let paid = h.api.confirm_ton_payment(&order.order_id, generous, "tx-generous").await.unwrap();
    assert_eq!(paid.state, OrderState::Paid);
}

#[tokio::test]
async fn an_underpayment_leaves_the_order_waiting() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    let short = NanoTon::from(QUOTED).percent(98) - NanoTon::from(1);
    let err = h.api.confirm_ton_payment(&order.order_id, short, "tx-short").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Underpaid { .. }));

    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingTonPayment);
    assert!(stored.ton_tx_ref.is_none());
}

#[tokio::test]
async fn a_duplicate_confirmation_is_silent() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    h.api.confirm_ton_payment(&order.order_id, NanoTon::from(QUOTED), "tx-first").await.unwrap();
    let sent_before = h.gateway.sent_messages().len();

    let again = h.api.confirm_ton_payment(&order.order_id, NanoTon::from(QUOTED), "tx-second").await.unwrap();
    assert_eq!(again.state, OrderState::Paid);
    // the first transaction reference wins and nothing is re-sent
    assert_eq!(again.ton_tx_ref.as_deref(), Some("tx-first"));
    assert_eq!(h.gateway.sent_messages().len(), sent_before);
}

#[tokio::test]
async fn the_timeout_falls_the_order_back_to_the_payment_choice() {
    let h = harness_with_timeout(Duration::milliseconds(50));
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingPaymentChoice);
    assert_eq!(stored.payment_method, None);
    assert!(stored.ton_deadline.is_none());

    let fallback = h.gateway.last_to(&h.customer).unwrap();
    assert!(fallback.text.contains("вичерпано"));
    assert_eq!(fallback.buttons.len(), 2);
    assert_eq!(fallback.buttons[0].callback.action, CallbackAction::PayCash);

    // the order is still very much alive: cash settles it
    let confirmed = h.api.choose_payment(&order.order_id, PaymentMethod::CashOnDelivery).await.unwrap();
    assert_eq!(confirmed.state, OrderState::ConfirmedCash);
}

#[tokio::test]
async fn cancelling_ton_returns_to_the_payment_choice_immediately() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    let back = h.api.cancel_ton_payment(&order.order_id).await.unwrap();
    assert_eq!(back.state, OrderState::AwaitingPaymentChoice);
    assert_eq!(back.payment_method, None);

    let fallback = h.gateway.last_to(&h.customer).unwrap();
    assert!(fallback.text.contains("скасовано"));
    assert_eq!(fallback.buttons.len(), 2);

    // the payment can no longer be confirmed against the closed window
    let err = h.api.confirm_ton_payment(&order.order_id, NanoTon::from(QUOTED), "tx-late").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)));
}

#[tokio::test]
async fn the_sweep_expires_only_overdue_orders() {
    use nomera_engine::traits::OrderStore;

    let h = harness_with_timeout(Duration::seconds(600));
    let overdue = order_at_payment_choice(&h).await;
    h.api.choose_payment(&overdue.order_id, PaymentMethod::Ton).await.unwrap();
    let fresh = {
        let order = h.api.submit_order(new_order()).await.unwrap();
        h.api.admin_decision(&order.order_id, nomera_engine::order_types::AdminDecision::Available).await.unwrap();
        h.api.submit_delivery_data(&order.order_id, delivery_data()).await.unwrap();
        h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap()
    };

    // simulate a deadline that lapsed while the process (and its timers) was down
    let mut lapsed = h.store.fetch_order(&overdue.order_id).await.unwrap().unwrap();
    lapsed.ton_deadline = Some(Utc::now() - Duration::seconds(1));
    h.store.update(lapsed).await.unwrap();

    let expired = h.api.expire_overdue_ton_payments().await.unwrap();
    assert_eq!(expired, 1);
    let stored = h.api.fetch_order(&overdue.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingPaymentChoice);
    let untouched = h.api.fetch_order(&fresh.order_id).await.unwrap().unwrap();
    assert_eq!(untouched.state, OrderState::AwaitingTonPayment);
}

#[tokio::test]
async fn a_settled_order_publishes_the_paid_event() {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let tx = event_tx.clone();
        Box::pin(async move {
            let _ = tx.send((ev.order.order_id.clone(), ev.order.ton_tx_ref.clone()));
        })
    });
    let handlers = EventHandlers::new(10, hooks);
    let h = harness_with(test_config(Duration::seconds(600)), handlers.producers());
    handlers.start_handlers().await;

    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();
    h.api.confirm_ton_payment(&order.order_id, NanoTon::from(QUOTED), "tx-event").await.unwrap();

    let (id, tx_ref) = tokio::time::timeout(std::time::Duration::from_secs(1), event_rx.recv()).await.unwrap().unwrap();
    assert_eq!(id, order.order_id);
    assert_eq!(tx_ref.as_deref(), Some("tx-event"));
}

#[tokio::test]
async fn a_stale_timer_never_closes_a_reopened_payment_window() {
    use nomera_engine::traits::OrderStore;

    let h = harness_with_timeout(Duration::milliseconds(50));
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    // the customer re-opened the window just as the first one was ending
    let mut reopened = h.store.fetch_order(&order.order_id).await.unwrap().unwrap();
    reopened.ton_deadline = Some(Utc::now() + Duration::hours(1));
    h.store.update(reopened).await.unwrap();

    // well past the first deadline; the first timer must recognise its window is gone
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingTonPayment);
    let expirations =
        h.gateway.messages_to(&h.customer).iter().filter(|m| m.text.contains("вичерпано")).count();
    assert_eq!(expirations, 0);
}

#[tokio::test]
async fn repeated_sweeps_offer_the_fallback_exactly_once() {
    use nomera_engine::traits::OrderStore;

    let h = harness_with_timeout(Duration::seconds(600));
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    let mut lapsed = h.store.fetch_order(&order.order_id).await.unwrap().unwrap();
    lapsed.ton_deadline = Some(Utc::now() - Duration::seconds(1));
    h.store.update(lapsed).await.unwrap();

    // two sweeps racing plus a third after the dust settles
    let (a, b) = tokio::join!(h.api.expire_overdue_ton_payments(), h.api.expire_overdue_ton_payments());
    let c = h.api.expire_overdue_ton_payments().await.unwrap();
    assert_eq!(a.unwrap() + b.unwrap() + c, 1);

    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingPaymentChoice);
    let fallbacks =
        h.gateway.messages_to(&h.customer).iter().filter(|m| m.text.contains("вичерпано")).count();
    assert_eq!(fallbacks, 1);
}

#[tokio::test]
async fn a_racing_confirm_and_cancel_have_exactly_one_winner() {
    let h = harness();
    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    let confirm = {
        let api = h.api.clone();
        let id = order.order_id.clone();
        tokio::spawn(async move { api.confirm_ton_payment(&id, NanoTon::from(QUOTED), "tx-race").await })
    };
    let cancel = {
        let api = h.api.clone();
        let id = order.order_id.clone();
        tokio::spawn(async move { api.cancel_ton_payment(&id).await })
    };

    let confirm = confirm.await.unwrap();
    let cancel = cancel.await.unwrap();
    // whichever grabbed the order lock first wins; the loser sees a stale state
    assert_ne!(confirm.is_ok(), cancel.is_ok(), "exactly one of the racing events must win");

    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    if confirm.is_ok() {
        assert_eq!(stored.state, OrderState::Paid);
    } else {
        assert_eq!(stored.state, OrderState::AwaitingPaymentChoice);
        assert!(matches!(confirm.unwrap_err(), OrderFlowError::OrderNotFound(_)));
    }
}

//--------------------------------------   Payment verifier    -------------------------------------------------------

#[tokio::test]
async fn the_verifier_settles_an_order_from_the_ledger() {
    let h = harness();
    let ledger = StaticLedger::new();
    let verifier = PaymentVerifier::new(h.api.clone(), ledger.clone());

    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    // nothing on chain yet
    assert!(verifier.poll_order(&order.order_id).await.unwrap().is_none());

    ledger.push_transfer(TonTransfer {
        tx_ref: "chain-tx-9".into(),
        amount: NanoTon::from(QUOTED),
        timestamp: Utc::now(),
    });
    let settled = verifier.poll_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(settled.state, OrderState::Paid);
    assert_eq!(settled.ton_tx_ref.as_deref(), Some("chain-tx-9"));
}

#[tokio::test]
async fn the_verifier_ignores_underpayments_and_stale_transfers() {
    let h = harness();
    let ledger = StaticLedger::new();
    let verifier = PaymentVerifier::new(h.api.clone(), ledger.clone());

    let order = order_at_payment_choice(&h).await;
    h.api.choose_payment(&order.order_id, PaymentMethod::Ton).await.unwrap();

    // below tolerance
    ledger.push_transfer(TonTransfer {
        tx_ref: "chain-short".into(),
        amount: NanoTon::from(QUOTED).percent(90),
        timestamp: Utc::now(),
    });
    // right amount, but from long before the payment window opened
    ledger.push_transfer(TonTransfer {
        tx_ref: "chain-old".into(),
        amount: NanoTon::from(QUOTED),
        timestamp: Utc::now() - Duration::minutes(30),
    });
    assert!(verifier.poll_order(&order.order_id).await.unwrap().is_none());
    let stored = h.api.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::AwaitingTonPayment);
}

#[tokio::test]
async fn a_verification_pass_covers_every_pending_order() {
    let h = harness();
    let ledger = StaticLedger::new();
    let verifier = PaymentVerifier::new(h.api.clone(), ledger.clone());

    let first = order_at_payment_choice(&h).await;
    h.api.choose_payment(&first.order_id, PaymentMethod::Ton).await.unwrap();
    let second = order_at_payment_choice(&h).await;
    h.api.choose_payment(&second.order_id, PaymentMethod::Ton).await.unwrap();

    ledger.push_transfer(TonTransfer {
        tx_ref: "chain-bulk-1".into(),
        amount: NanoTon::from(QUOTED),
        timestamp: Utc::now(),
    });
    ledger.push_transfer(TonTransfer {
        tx_ref: "chain-bulk-2".into(),
        amount: NanoTon::from(QUOTED),
        timestamp: Utc::now(),
    });
    let settled = verifier.poll_pending().await.unwrap();
    assert_eq!(settled, 2);
    for id in [&first.order_id, &second.order_id] {
        let stored = h.api.fetch_order(id).await.unwrap().unwrap();
        assert_eq!(stored.state, OrderState::Paid);
    }
}
