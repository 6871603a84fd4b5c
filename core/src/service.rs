//! Order reads through the cache, and mutations that invalidate it.
//!
//! Mutations never patch the cached list. A successful create, status change
//! or delete invalidates `"orders"` and the list is fetched again from the
//! server; failures leave the cache as it was.

use std::sync::Arc;

use futures::FutureExt;
use tracing::info;

use crate::api::OrderApi;
use crate::error::ApiResult;
use crate::store::{CacheEntry, Fetcher, SyncStore};
use crate::transport::Transport;
use crate::types::{filter_by_status, NewOrder, Order, OrderStatus};

pub const ORDERS_KEY: &str = "orders";

pub struct OrderService<T> {
    api: Arc<OrderApi<T>>,
    store: SyncStore<Vec<Order>>,
}

impl<T> Clone for OrderService<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
        }
    }
}

impl<T: Transport + 'static> OrderService<T> {
    pub fn new(api: OrderApi<T>, store: SyncStore<Vec<Order>>) -> Self {
        Self {
            api: Arc::new(api),
            store,
        }
    }

    pub fn api(&self) -> &OrderApi<T> {
        &self.api
    }

    pub fn store(&self) -> &SyncStore<Vec<Order>> {
        &self.store
    }

    fn list_fetcher(&self) -> Fetcher<Vec<Order>> {
        let api = Arc::clone(&self.api);
        Arc::new(move || {
            let api = Arc::clone(&api);
            async move { api.list_orders().await }.boxed()
        })
    }

    /// Cached order list, starting a fetch if none has succeeded yet.
    ///
    /// Outside a tokio runtime no fetch can run and the entry comes back as
    /// an `Error`.
    pub fn orders(&self) -> CacheEntry<Vec<Order>> {
        self.store.ensure(ORDERS_KEY, self.list_fetcher());
        self.store.read(ORDERS_KEY)
    }

    /// Cached orders with `status`, or all of them for `None`.
    pub fn orders_with_status(&self, status: Option<OrderStatus>) -> Vec<Order> {
        self.orders()
            .data
            .map(|orders| filter_by_status(&orders, status))
            .unwrap_or_default()
    }

    pub fn refresh(&self) {
        self.store.invalidate(ORDERS_KEY);
    }

    pub async fn create_order(&self, input: &NewOrder) -> ApiResult<Order> {
        let order = self.api.create_order(input).await?;
        info!(id = order.id, "order created");
        self.refresh();
        Ok(order)
    }

    pub async fn set_order_status(&self, id: i64, status: OrderStatus) -> ApiResult<Order> {
        let order = self.api.set_order_status(id, status).await?;
        info!(id, %status, "order status changed");
        self.refresh();
        Ok(order)
    }

    pub async fn delete_order(&self, id: i64) -> ApiResult<()> {
        self.api.delete_order(id).await?;
        info!(id, "order deleted");
        self.refresh();
        Ok(())
    }
}
