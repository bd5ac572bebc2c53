use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Assigned,
    Enroute,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub address: String,
    pub total_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
