//! Domain types for the order API.
//!
//! # Design
//! These mirror the backend's JSON schema (camelCase fields, upper-case
//! status names) but are defined independently of the mock server; the
//! integration tests catch drift between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// An order as returned by the backend. `id` is assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub product_name: String,
    pub quantity: u32,
    pub status: OrderStatus,
}

/// Fields submitted when creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub product_name: String,
    pub quantity: u32,
}

impl NewOrder {
    pub fn new(customer_name: impl Into<String>, product_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            customer_name: customer_name.into(),
            product_name: product_name.into(),
            quantity,
        }
    }

    /// Check the same rules the create form enforces before submitting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.customer_name.trim().is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }
        if self.product_name.trim().is_empty() {
            return Err(ValidationError::MissingProductName);
        }
        if self.quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity);
        }
        Ok(())
    }
}

/// Orders matching `status`, in their original order. `None` keeps all.
pub fn filter_by_status(orders: &[Order], status: Option<OrderStatus>) -> Vec<Order> {
    orders
        .iter()
        .filter(|order| status.map_or(true, |status| order.status == status))
        .cloned()
        .collect()
}
