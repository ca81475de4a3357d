use serde::{Deserialize, Serialize};

use crate::order_types::Order;

/// Published after an order reaches `Paid` via a confirmed TON transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after the admin marks an order's numbers as unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub order: Order,
}

impl OrderRejectedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
