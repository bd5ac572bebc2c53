use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::coordinator::RouteCoordinator;
use crate::models::route::RouteEvent;
use crate::observability::metrics::Metrics;
use crate::store::memory::{MemoryDriverDirectory, MemoryOrderStore, MemoryRouteRepository};

pub struct AppState {
    pub orders: Arc<MemoryOrderStore>,
    pub routes: Arc<MemoryRouteRepository>,
    pub drivers: Arc<MemoryDriverDirectory>,
    pub coordinator: RouteCoordinator,
    pub route_events_tx: broadcast::Sender<RouteEvent>,
    pub metrics: Metrics,
    pub default_completion_horizon: chrono::Duration,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let orders = Arc::new(MemoryOrderStore::new());
        let routes = Arc::new(MemoryRouteRepository::new());
        let drivers = Arc::new(MemoryDriverDirectory::new());
        let (route_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let coordinator = RouteCoordinator::new(orders.clone(), routes.clone(), drivers.clone());

        Self {
            orders,
            routes,
            drivers,
            coordinator,
            route_events_tx,
            metrics: Metrics::new(),
            default_completion_horizon: chrono::Duration::hours(config.default_completion_horizon_hours),
        }
    }
}
