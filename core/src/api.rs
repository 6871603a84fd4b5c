//! Typed order operations over a `Transport`.

use crate::client::OrderClient;
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::transport::{HttpTransport, Transport};
use crate::types::{NewOrder, Order, OrderStatus};

/// Pairs the request builder with a transport. Failures from the transport
/// are returned unchanged and nothing is retried.
#[derive(Debug, Clone)]
pub struct OrderApi<T> {
    client: OrderClient,
    transport: T,
}

impl OrderApi<HttpTransport> {
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(OrderClient::new(&config.base_url), transport))
    }
}

impl<T: Transport> OrderApi<T> {
    pub fn new(client: OrderClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &OrderClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn list_orders(&self) -> ApiResult<Vec<Order>> {
        let payload = self.transport.send(self.client.build_list_orders()).await?;
        self.client.parse_list_orders(&payload)
    }

    pub async fn create_order(&self, input: &NewOrder) -> ApiResult<Order> {
        let payload = self
            .transport
            .send(self.client.build_create_order(input))
            .await?;
        self.client.parse_create_order(&payload)
    }

    pub async fn set_order_status(&self, id: i64, status: OrderStatus) -> ApiResult<Order> {
        let payload = self
            .transport
            .send(self.client.build_set_order_status(id, status))
            .await?;
        self.client.parse_set_order_status(&payload)
    }

    pub async fn delete_order(&self, id: i64) -> ApiResult<()> {
        let payload = self.transport.send(self.client.build_delete_order(id)).await?;
        self.client.parse_delete_order(&payload)
    }
}
