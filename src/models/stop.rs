use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::order::OrderId;
use crate::models::route::RouteId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// One order's position within a route. `stop_number` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub route_id: RouteId,
    pub order_id: OrderId,
    pub stop_number: u32,
    pub status: StopStatus,
    #[serde(default, with = "crate::models::time::local_option")]
    pub estimated_arrival_time: Option<NaiveDateTime>,
}
