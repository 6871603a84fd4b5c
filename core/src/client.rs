//! Stateless request builder and payload parser for the order API.
//!
//! # Design
//! `OrderClient` holds only a `base_url`. Each operation is split into a
//! `build_*` method producing an `HttpRequest` and a `parse_*` method
//! consuming the raw payload of a successful response. Status handling lives
//! in the transport, so parsers only ever see 2xx bodies.
//!
//! The backend takes form-encoded bodies for writes, not JSON. That choice is
//! made here, per route, and travels to the transport as an ordinary
//! `content-type` header.

use url::form_urlencoded;

use crate::error::{ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{NewOrder, Order, OrderStatus};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct OrderClient {
    base_url: String,
}

impl OrderClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_orders(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, format!("{}/orders", self.base_url))
    }

    pub fn build_create_order(&self, input: &NewOrder) -> HttpRequest {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("customerName", &input.customer_name)
            .append_pair("productName", &input.product_name)
            .append_pair("quantity", &input.quantity.to_string())
            .finish();

        let mut request = HttpRequest::new(HttpMethod::Post, format!("{}/orders", self.base_url));
        request
            .headers
            .push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        request.body = Some(body);
        request
    }

    pub fn build_set_order_status(&self, id: i64, status: OrderStatus) -> HttpRequest {
        let mut request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/orders/{id}/status", self.base_url),
        );
        request
            .query
            .push(("status".to_string(), status.as_str().to_string()));
        request
    }

    pub fn build_delete_order(&self, id: i64) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Post,
            format!("{}/orders/{id}/delete", self.base_url),
        )
    }

    pub fn parse_list_orders(&self, payload: &str) -> ApiResult<Vec<Order>> {
        decode(payload)
    }

    pub fn parse_create_order(&self, payload: &str) -> ApiResult<Order> {
        decode(payload)
    }

    pub fn parse_set_order_status(&self, payload: &str) -> ApiResult<Order> {
        decode(payload)
    }

    /// Delete carries no payload; whatever the server sent is ignored.
    pub fn parse_delete_order(&self, _payload: &str) -> ApiResult<()> {
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &str) -> ApiResult<T> {
    serde_json::from_str(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OrderClient {
        OrderClient::new("http://localhost:8088/api")
    }

    #[test]
    fn build_list_orders_produces_correct_request() {
        let req = client().build_list_orders();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8088/api/orders");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
        assert!(req.query.is_empty());
    }

    #[test]
    fn build_create_order_uses_form_encoding() {
        let input = NewOrder::new("Alice", "Widget", 2);
        let req = client().build_create_order(&input);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8088/api/orders");
        assert_eq!(req.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(
            req.body.as_deref(),
            Some("customerName=Alice&productName=Widget&quantity=2")
        );
    }

    #[test]
    fn build_create_order_escapes_reserved_characters() {
        let input = NewOrder::new("Bob & Co", "Gear=1", 3);
        let req = client().build_create_order(&input);
        assert_eq!(
            req.body.as_deref(),
            Some("customerName=Bob+%26+Co&productName=Gear%3D1&quantity=3")
        );
    }

    #[test]
    fn build_set_order_status_sends_status_as_query() {
        let req = client().build_set_order_status(7, OrderStatus::Completed);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8088/api/orders/7/status");
        assert_eq!(
            req.query,
            vec![("status".to_string(), "COMPLETED".to_string())]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn build_delete_order_posts_to_delete_route() {
        let req = client().build_delete_order(9);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8088/api/orders/9/delete");
        assert!(req.body.is_none());
    }

    #[test]
    fn parse_list_orders_keeps_server_order() {
        let payload = r#"[
            {"id":2,"customerName":"Bob","productName":"Gear","quantity":1,"status":"PENDING"},
            {"id":1,"customerName":"Alice","productName":"Widget","quantity":2,"status":"COMPLETED"}
        ]"#;
        let orders = client().parse_list_orders(payload).unwrap();
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(orders[1].status, OrderStatus::Completed);
    }

    #[test]
    fn parse_create_order_returns_server_id() {
        let payload =
            r#"{"id":42,"customerName":"Alice","productName":"Widget","quantity":2,"status":"PENDING"}"#;
        let order = client().parse_create_order(payload).unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.customer_name, "Alice");
    }

    #[test]
    fn parse_set_order_status_bad_json() {
        let err = client().parse_set_order_status("not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_delete_order_ignores_payload() {
        assert!(client().parse_delete_order("").is_ok());
        assert!(client().parse_delete_order("{}").is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = OrderClient::new("http://localhost:8088/api/");
        assert_eq!(client.base_url(), "http://localhost:8088/api");
        assert_eq!(client.build_list_orders().url, "http://localhost:8088/api/orders");
    }
}
