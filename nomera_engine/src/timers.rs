//! Cancellable deferred tasks, keyed by order id.
//!
//! Used for the TON payment window: choosing the TON path schedules a timeout task, and an early payment
//! confirmation cancels it. Scheduling a second timer for the same order replaces (and thereby cancels)
//! the first. Cancellation is cooperative through a oneshot, and every scheduled timer carries a
//! generation token: a fired timer only removes and acts on the registry entry it created itself, so a
//! timer whose sleep completes just as it is being replaced cannot clobber its successor. The scheduled
//! task body is still responsible for re-checking order state under the order lock, which is what makes
//! timer-vs-confirm races safe.
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::{oneshot, Mutex};

use crate::order_types::OrderId;

struct PendingTimer {
    generation: u64,
    cancel_tx: oneshot::Sender<()>,
}

#[derive(Clone, Default)]
pub struct TimerRegistry {
    pending: Arc<Mutex<HashMap<OrderId, PendingTimer>>>,
    generations: Arc<AtomicU64>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless [`TimerRegistry::cancel`] is called first.
    pub async fn schedule<F>(&self, order_id: OrderId, delay: Duration, task: F)
    where F: Future<Output = ()> + Send + 'static {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        // dropping a displaced sender resolves its receiver, so rescheduling cancels the old timer
        self.pending.lock().await.insert(order_id.clone(), PendingTimer { generation, cancel_tx });
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx => {
                    debug!("⏲️ Timer for order {order_id} cancelled");
                },
                _ = tokio::time::sleep(delay) => {
                    let owns_entry = {
                        let mut pending = pending.lock().await;
                        match pending.get(&order_id) {
                            Some(entry) if entry.generation == generation => {
                                pending.remove(&order_id);
                                true
                            },
                            // replaced or cancelled between the sleep resolving and this lock
                            _ => false,
                        }
                    };
                    if owns_entry {
                        debug!("⏲️ Timer for order {order_id} fired");
                        task.await;
                    } else {
                        debug!("⏲️ Timer for order {order_id} was superseded before it could fire");
                    }
                },
            }
        });
    }

    /// Cancel the pending timer for the order, if any. Cancelling a fired or absent timer is a no-op.
    pub async fn cancel(&self, order_id: &OrderId) {
        if let Some(timer) = self.pending.lock().await.remove(order_id) {
            let _ = timer.cancel_tx.send(());
        }
    }

    pub async fn is_scheduled(&self, order_id: &OrderId) -> bool {
        self.pending.lock().await.contains_key(order_id)
    }
}
