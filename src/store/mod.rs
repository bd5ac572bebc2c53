//! Storage ports consumed by the coordinator.
//!
//! The hosted deployment binds these to a relational database; `memory`
//! provides the in-process implementation used by the server and the tests.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::order::{Order, OrderId, OrderStatus};
use crate::models::route::{Route, RouteAttributes, RouteId, RouteStatus};
use crate::models::stop::Stop;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn list_pending(&self) -> Result<Vec<Order>, RepoError>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError>;
    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), RepoError>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync + 'static {
    async fn create_route(&self, attributes: RouteAttributes) -> Result<RouteId, RepoError>;
    async fn update_route(&self, id: RouteId, attributes: RouteAttributes) -> Result<(), RepoError>;
    async fn get_route(&self, id: RouteId) -> Result<Option<Route>, RepoError>;
    async fn set_route_status(&self, id: RouteId, status: RouteStatus) -> Result<(), RepoError>;

    /// Removes every stop of the route. Succeeds when there were none.
    async fn delete_stops(&self, route_id: RouteId) -> Result<(), RepoError>;

    /// Inserts the whole batch or nothing.
    async fn insert_stops(&self, stops: &[Stop]) -> Result<(), RepoError>;

    /// Stops of the route ordered by stop number.
    async fn list_stops(&self, route_id: RouteId) -> Result<Vec<Stop>, RepoError>;

    /// The non-completed route currently holding a stop for the order, if any.
    async fn active_route_for_order(&self, order_id: OrderId) -> Result<Option<RouteId>, RepoError>;
}

#[async_trait]
pub trait DriverDirectory: Send + Sync + 'static {
    async fn exists(&self, driver_id: &str) -> Result<bool, RepoError>;
    async fn is_eligible(&self, driver_id: &str) -> Result<bool, RepoError>;
}
