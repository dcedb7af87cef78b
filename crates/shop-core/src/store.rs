//! # Order Repository
//!
//! Persistence seam for orders. The repository owns id assignment and the
//! unique constraint on `orderNumber`.

use crate::error::{ShopError, ShopResult};
use crate::order::{NewOrder, Order, OrderPatch};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert and return the stored order.
    ///
    /// Fails with `DuplicateOrderNumber` if the order number is taken.
    async fn insert(&self, order: NewOrder) -> ShopResult<Order>;

    /// All orders, oldest first
    async fn list(&self) -> ShopResult<Vec<Order>>;

    async fn get(&self, id: i64) -> ShopResult<Option<Order>>;

    async fn find_by_number(&self, order_number: &str) -> ShopResult<Option<Order>>;

    /// Apply `patch`; `None` if no order has `id`
    async fn update(&self, id: i64, patch: OrderPatch) -> ShopResult<Option<Order>>;

    /// Remove every order, returning how many were removed
    async fn clear(&self) -> ShopResult<u64>;
}

/// Type alias for a shared order repository (dynamic dispatch)
pub type BoxedOrderRepository = Arc<dyn OrderRepository>;

#[derive(Debug, Default)]
struct OrderTable {
    next_id: i64,
    rows: BTreeMap<i64, Order>,
    by_number: HashMap<String, i64>,
}

/// Process-local order storage
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    table: RwLock<OrderTable>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: NewOrder) -> ShopResult<Order> {
        let mut table = self.table.write().await;
        if table.by_number.contains_key(&order.order_number) {
            return Err(ShopError::DuplicateOrderNumber(order.order_number));
        }

        table.next_id += 1;
        let id = table.next_id;
        let order = order.into_order(id);
        table.by_number.insert(order.order_number.clone(), id);
        table.rows.insert(id, order.clone());
        Ok(order)
    }

    async fn list(&self) -> ShopResult<Vec<Order>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> ShopResult<Option<Order>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> ShopResult<Option<Order>> {
        let table = self.table.read().await;
        Ok(table
            .by_number
            .get(order_number)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn update(&self, id: i64, patch: OrderPatch) -> ShopResult<Option<Order>> {
        let mut table = self.table.write().await;
        let Some(order) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(order)?;
        Ok(Some(order.clone()))
    }

    async fn clear(&self) -> ShopResult<u64> {
        let mut table = self.table.write().await;
        let removed = table.rows.len() as u64;
        table.rows.clear();
        table.by_number.clear();
        Ok(removed)
    }
}
