//! Order status transition engine.
//!
//! One transition at a time per order: an in-process lock serializes local
//! callers and the store's compare-and-set commit rejects anything that raced
//! past it. The notification fan-out runs after the commit, still under the
//! order's lock so edits land in commit order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::entities::orders;
use crate::models::status::OrderStatus;
use crate::services::notifier::OrderNotifier;
use crate::store::{now, order_status, OrderStore, StoreError, TransitionChange};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("order {0} not found")]
    OrderNotFound(i32),
    #[error("transition {} -> {} is not allowed", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    notifier: OrderNotifier,
    locks: Mutex<HashMap<i32, Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn OrderStore>, notifier: OrderNotifier) -> OrderLifecycle {
        OrderLifecycle {
            store,
            notifier,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn order_lock(&self, order_id: i32) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(order_id).or_default().clone()
    }

    /// Moves the order to `target` if the transition matrix allows it from the
    /// current status, records the audit row and notifies all channels.
    pub async fn apply(
        &self,
        order_id: i32,
        target: OrderStatus,
        changed_by: Option<String>,
        note: Option<String>,
    ) -> Result<orders::Model, LifecycleError> {
        let lock = self.order_lock(order_id);
        let _held = lock.lock().await;

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound(order_id))?;
        let current = order_status(&order)?;
        if !current.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let updated = self
            .store
            .commit_transition(
                order_id,
                current,
                TransitionChange {
                    to: target,
                    changed_by,
                    note,
                    at: now(),
                },
            )
            .await?;

        tracing::info!(
            order_id,
            from = current.as_str(),
            to = target.as_str(),
            "order transition committed"
        );

        self.notifier.sync(&updated).await;

        // Terminal orders reject every further transition, so their lock
        // entry can go
        if target.is_terminal() {
            self.locks.lock().remove(&order_id);
        }

        Ok(updated)
    }
}
