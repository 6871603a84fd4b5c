use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub product_name: String,
    pub quantity: u32,
    pub status: OrderStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub customer_name: String,
    pub product_name: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct StatusParam {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Default)]
pub struct Backend {
    orders: BTreeMap<i64, Order>,
    next_id: i64,
}

pub type Db = Arc<RwLock<Backend>>;

type Rejection = (StatusCode, Json<ErrorBody>);

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn not_found(id: i64) -> Rejection {
    reject(StatusCode::NOT_FOUND, format!("order {id} not found"))
}

/// Order routes, nested under `/api` like the real backend.
pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    let orders = Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}/status", post(update_status))
        .route("/orders/{id}/delete", post(delete_order))
        .with_state(db);
    Router::new().nest("/api", orders)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_orders(State(db): State<Db>) -> Json<Vec<Order>> {
    let backend = db.read().await;
    Json(backend.orders.values().cloned().collect())
}

async fn create_order(
    State(db): State<Db>,
    Form(input): Form<CreateOrder>,
) -> Result<(StatusCode, Json<Order>), Rejection> {
    if input.customer_name.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "customerName must not be blank"));
    }
    if input.product_name.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "productName must not be blank"));
    }
    let quantity = u32::try_from(input.quantity)
        .ok()
        .filter(|quantity| *quantity > 0)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "quantity must be positive"))?;

    let mut backend = db.write().await;
    backend.next_id += 1;
    let order = Order {
        id: backend.next_id,
        customer_name: input.customer_name,
        product_name: input.product_name,
        quantity,
        status: OrderStatus::Pending,
    };
    backend.orders.insert(order.id, order.clone());
    tracing::info!(id = order.id, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

async fn update_status(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Query(param): Query<StatusParam>,
) -> Result<Json<Order>, Rejection> {
    let mut backend = db.write().await;
    let order = backend.orders.get_mut(&id).ok_or_else(|| not_found(id))?;
    order.status = param.status;
    Ok(Json(order.clone()))
}

async fn delete_order(State(db): State<Db>, Path(id): Path<i64>) -> Result<StatusCode, Rejection> {
    let mut backend = db.write().await;
    backend
        .orders
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(id))
}
