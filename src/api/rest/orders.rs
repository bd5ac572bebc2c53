use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::order::{Order, OrderId, OrderStatus};
use crate::state::AppState;
use crate::store::OrderStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/pending", get(list_pending_orders))
        .route("/orders/:id", get(get_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub address: String,
    pub total_price: f64,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("address cannot be empty".to_string()));
    }

    if !payload.total_price.is_finite() || payload.total_price < 0.0 {
        return Err(AppError::BadRequest("total_price must be >= 0".to_string()));
    }

    let order = state.orders.create(
        payload.customer_name.trim().to_string(),
        payload.address.trim().to_string(),
        payload.total_price,
    );

    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<Order>> {
    Json(state.orders.list(query.status))
}

async fn list_pending_orders(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list_pending().await?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order))
}
