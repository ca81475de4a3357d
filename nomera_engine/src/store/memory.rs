use std::{collections::HashMap, sync::Arc};

use log::*;
use tokio::sync::RwLock;

use crate::{
    order_types::{Order, OrderId, OrderState},
    traits::{OrderMirror, OrderStore, OrderStoreError},
};

/// The in-memory order table.
///
/// The map is the single source of truth. After every successful insert or update, a snapshot is handed to
/// the mirror on a detached task; a mirror failure is logged and never reaches the caller. On a lookup miss
/// the mirror is consulted once and a hit repopulates the map, which is how orders survive a restart.
#[derive(Clone)]
pub struct MemoryStore<M = NullMirror>
where M: OrderMirror + 'static
{
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    mirror: Option<M>,
}

impl MemoryStore<NullMirror> {
    pub fn new() -> Self {
        Self { orders: Arc::new(RwLock::new(HashMap::new())), mirror: None }
    }
}

impl Default for MemoryStore<NullMirror> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: OrderMirror + 'static> MemoryStore<M> {
    pub fn with_mirror(mirror: M) -> Self {
        Self { orders: Arc::new(RwLock::new(HashMap::new())), mirror: Some(mirror) }
    }

    fn write_behind(&self, order: Order) {
        if let Some(mirror) = &self.mirror {
            let mirror = mirror.clone();
            tokio::spawn(async move {
                if let Err(e) = mirror.upsert(&order).await {
                    warn!("🗄️ Mirror write for order {} failed: {e}", order.order_id);
                }
            });
        }
    }
}

impl<M: OrderMirror + 'static> OrderStore for MemoryStore<M> {
    async fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
        {
            let mut orders = self.orders.write().await;
            if orders.contains_key(&order.order_id) {
                return Err(OrderStoreError::DuplicateOrder(order.order_id.clone()));
            }
            orders.insert(order.order_id.clone(), order.clone());
        }
        trace!("🗄️ Order {} inserted in state {}", order.order_id, order.state);
        self.write_behind(order);
        Ok(())
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        if let Some(order) = self.orders.read().await.get(order_id) {
            return Ok(Some(order.clone()));
        }
        let Some(mirror) = &self.mirror else { return Ok(None) };
        match mirror.fetch(order_id).await {
            Ok(Some(order)) => {
                debug!("🗄️ Order {order_id} repopulated from the mirror");
                let mut orders = self.orders.write().await;
                let entry = orders.entry(order_id.clone()).or_insert_with(|| order.clone());
                Ok(Some(entry.clone()))
            },
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("🗄️ Mirror lookup for order {order_id} failed: {e}");
                Ok(None)
            },
        }
    }

    async fn update(&self, order: Order) -> Result<(), OrderStoreError> {
        {
            let mut orders = self.orders.write().await;
            if !orders.contains_key(&order.order_id) {
                return Err(OrderStoreError::Storage(format!("update for unknown order {}", order.order_id)));
            }
            orders.insert(order.order_id.clone(), order.clone());
        }
        trace!("🗄️ Order {} updated to state {}", order.order_id, order.state);
        self.write_behind(order);
        Ok(())
    }

    async fn list_by_state(&self, state: OrderState) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| o.state == state).cloned().collect())
    }
}

/// Mirror that drops every write. Used when crash recovery is not required (and in most tests).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMirror;

impl OrderMirror for NullMirror {
    async fn upsert(&self, _order: &Order) -> Result<(), OrderStoreError> {
        Ok(())
    }

    async fn fetch(&self, _order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use npe_common::{NanoTon, Uah};

    use super::*;
    use crate::order_types::{CustomerRef, ExchangeRate, OrderLine};

    fn test_order(id: &str, state: OrderState) -> Order {
        Order {
            order_id: OrderId::from(id.to_string()),
            lines: vec![OrderLine::new("+380671234567", Uah::from(5000))],
            total: Uah::from(5000),
            rate: ExchangeRate::fallback(),
            discounted_ton: NanoTon::from_ton(26),
            customer: CustomerRef::new("chat-1", Some("alice".into())),
            delivery: None,
            payment_method: None,
            state,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ton_deadline: None,
            ton_chosen_at: None,
            ton_tx_ref: None,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert(test_order("dup", OrderState::AwaitingAdminDecision)).await.unwrap();
        let err = store.insert(test_order("dup", OrderState::AwaitingAdminDecision)).await.unwrap_err();
        assert!(matches!(err, OrderStoreError::DuplicateOrder(_)));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_errors() {
        let store = MemoryStore::new();
        assert!(store.fetch_order(&OrderId::from("nope".to_string())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_and_list_filters() {
        let store = MemoryStore::new();
        store.insert(test_order("a", OrderState::AwaitingAdminDecision)).await.unwrap();
        store.insert(test_order("b", OrderState::AwaitingTonPayment)).await.unwrap();

        let mut order = store.fetch_order(&OrderId::from("a".to_string())).await.unwrap().unwrap();
        order.state = OrderState::Rejected;
        store.update(order).await.unwrap();

        let rejected = store.list_by_state(OrderState::Rejected).await.unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].order_id.as_str(), "a");
        assert!(store.list_by_state(OrderState::AwaitingAdminDecision).await.unwrap().is_empty());
    }

    #[derive(Clone, Default)]
    struct FixedMirror {
        order: Option<Order>,
    }

    impl OrderMirror for FixedMirror {
        async fn upsert(&self, _order: &Order) -> Result<(), OrderStoreError> {
            Ok(())
        }

        async fn fetch(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
            Ok(self.order.clone().filter(|o| &o.order_id == order_id))
        }
    }

    #[tokio::test]
    async fn lookup_miss_repopulates_from_mirror() {
        let recovered = test_order("lost", OrderState::AwaitingPaymentChoice);
        let store = MemoryStore::with_mirror(FixedMirror { order: Some(recovered.clone()) });

        let fetched = store.fetch_order(&recovered.order_id).await.unwrap().unwrap();
        assert_eq!(fetched, recovered);
        // now present in the primary map as well
        let listed = store.list_by_state(OrderState::AwaitingPaymentChoice).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
