use npe_common::NanoTon;
use thiserror::Error;

use crate::{order_types::OrderId, traits::OrderStoreError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    /// The order request itself is malformed. Rejected before any side effect.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    /// Unknown id, or an event that arrived for an order no longer in the state it targets. The caller
    /// acknowledges this to the user as "not found / already handled"; it is never fatal.
    #[error("The requested order {0} does not exist or has already been handled")]
    OrderNotFound(OrderId),
    /// Two consecutive id collisions. The generator draws 96 random bits, so this indicates a broken RNG
    /// or a programming error, not bad luck.
    #[error("Cannot insert order, since it already exists with id {0}")]
    DuplicateOrder(OrderId),
    /// The observed transfer is below the accepted tolerance. The order stays in `AwaitingTonPayment`.
    #[error("Underpayment for order {order_id}: observed {observed}, expected {expected}")]
    Underpaid { order_id: OrderId, expected: NanoTon, observed: NanoTon },
    /// An external collaborator (ledger, catalog) could not be reached.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::DuplicateOrder(id) => OrderFlowError::DuplicateOrder(id),
            OrderStoreError::Storage(msg) => OrderFlowError::Storage(msg),
        }
    }
}
