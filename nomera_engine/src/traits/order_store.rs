use std::future::Future;

use thiserror::Error;

use crate::order_types::{Order, OrderId, OrderState};

/// The order table. One entry per order id; the entry is the authoritative state-machine state.
///
/// Terminal orders are retained for audit, never deleted. The futures are explicitly `Send` because the
/// flow API calls the store from spawned timer and sweep tasks.
pub trait OrderStore: Clone + Send + Sync {
    /// Insert a brand-new order. Fails with [`OrderStoreError::DuplicateOrder`] if the id is taken.
    fn insert(&self, order: Order) -> impl Future<Output = Result<(), OrderStoreError>> + Send;

    /// Fetch an order snapshot. Unknown ids return `None`, never an error.
    fn fetch_order(&self, order_id: &OrderId) -> impl Future<Output = Result<Option<Order>, OrderStoreError>> + Send;

    /// Whole-order replace. Called after every state transition.
    fn update(&self, order: Order) -> impl Future<Output = Result<(), OrderStoreError>> + Send;

    /// All orders currently in the given state. Diagnostics and sweep use only; not a hot path.
    fn list_by_state(&self, state: OrderState) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send;
}

/// The write-behind mirror behind [`OrderStore`] implementations that want crash recovery.
///
/// Writes happen on a detached task after the in-memory transition is already durable; a mirror failure is
/// logged and swallowed. On restart, a store may lazily repopulate an entry from the mirror on a lookup miss.
/// The futures are explicitly `Send` because mirror writes run on detached tokio tasks.
pub trait OrderMirror: Clone + Send + Sync {
    /// Last-write-wins snapshot write, keyed by order id.
    fn upsert(&self, order: &Order) -> impl Future<Output = Result<(), OrderStoreError>> + Send;

    /// Read back a snapshot, if one was ever written.
    fn fetch(&self, order_id: &OrderId) -> impl Future<Output = Result<Option<Order>, OrderStoreError>> + Send;
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Cannot insert order, since it already exists with id {0}")]
    DuplicateOrder(OrderId),
    #[error("Storage error: {0}")]
    Storage(String),
}
