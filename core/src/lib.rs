//! Client core for the order admin console.
//!
//! # Overview
//! Three layers, leaves first:
//! - **Transport** ([`transport`], [`http`]): one HTTP attempt per request,
//!   every failure normalized into [`ApiError`].
//! - **Resource operations** ([`client`], [`api`]): typed list / create /
//!   set-status / delete calls. [`OrderClient`] builds requests and parses
//!   payloads without I/O; [`OrderApi`] runs them over a [`Transport`].
//! - **Synchronization store** ([`store`]): a key-addressed cache of server
//!   state with fetch deduplication, generation-checked responses and
//!   per-key listeners.
//!
//! [`OrderService`] ties them together: reads go through the cache and every
//! successful mutation invalidates the `"orders"` key.
//!
//! # Design
//! - The store is an explicitly owned handle passed to whoever needs it;
//!   there is no process-wide cache.
//! - Write bodies are form-encoded, chosen per route in [`OrderClient`];
//!   the transport never rewrites content types.
//! - DTOs are defined independently from the mock-server crate; the
//!   integration tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod store;
pub mod transport;
pub mod types;

pub use api::OrderApi;
pub use client::OrderClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult, ConfigError, ValidationError, GENERIC_ERROR_MESSAGE};
pub use http::{normalize, HttpMethod, HttpRequest, HttpResponse, RawPayload};
pub use service::{OrderService, ORDERS_KEY};
pub use store::{
    CacheEntry, FetchStatus, Fetcher, Subscription, SyncStore, Watch, FETCH_PANICKED_MESSAGE,
    NO_RUNTIME_MESSAGE,
};
pub use transport::{HttpTransport, Transport};
pub use types::{filter_by_status, NewOrder, Order, OrderStatus};
