use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::driver::{Driver, DriverId, DriverStatus};
use crate::models::order::{Order, OrderId, OrderStatus};
use crate::models::route::{Route, RouteAttributes, RouteId, RouteStatus, RouteSummary};
use crate::models::stop::Stop;
use crate::store::{DriverDirectory, OrderStore, RepoError, RouteRepository};

pub struct MemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    next_id: AtomicI64,
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn create(&self, customer_name: String, address: String, total_price: f64) -> Order {
        let order = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            customer_name,
            address,
            total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        self.orders.insert(order.id, order.clone());
        order
    }

    /// Stores an order under its own id, keeping generated ids clear of it.
    pub fn insert(&self, order: Order) {
        self.next_id.fetch_max(order.id + 1, Ordering::SeqCst);
        self.orders.insert(order.id, order);
    }

    /// Newest first, optionally restricted to one status.
    pub fn list(&self, status: Option<OrderStatus>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| status.is_none_or(|status| entry.status == status))
            .map(|entry| entry.value().clone())
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn list_pending(&self) -> Result<Vec<Order>, RepoError> {
        Ok(self.list(Some(OrderStatus::Pending)))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), RepoError> {
        let mut order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("order {id}")))?;

        order.status = status;
        Ok(())
    }
}

pub struct MemoryRouteRepository {
    routes: DashMap<RouteId, Route>,
    stops: DashMap<RouteId, Vec<Stop>>,
    // Serializes stop mutations so constraint checks see a stable view.
    stop_writes: Mutex<()>,
}

impl Default for MemoryRouteRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRouteRepository {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
            stops: DashMap::new(),
            stop_writes: Mutex::new(()),
        }
    }

    pub fn list_routes(&self) -> Vec<RouteSummary> {
        let mut routes: Vec<RouteSummary> = self
            .routes
            .iter()
            .map(|entry| RouteSummary {
                route: entry.value().clone(),
                order_count: self.stops.get(entry.key()).map_or(0, |stops| stops.len()),
            })
            .collect();

        routes.sort_by(|a, b| b.route.created_at.cmp(&a.route.created_at));
        routes
    }

    pub fn routes_for_driver(&self, driver_id: &str) -> usize {
        self.routes
            .iter()
            .filter(|entry| entry.driver_id == driver_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn is_active(&self, route_id: &RouteId) -> bool {
        self.routes
            .get(route_id)
            .is_some_and(|route| route.is_active())
    }

    fn holder_of(&self, order_id: OrderId, excluding: Option<RouteId>) -> Option<RouteId> {
        self.stops
            .iter()
            .filter(|entry| Some(*entry.key()) != excluding)
            .filter(|entry| entry.iter().any(|stop| stop.order_id == order_id))
            .map(|entry| *entry.key())
            .find(|route_id| self.is_active(route_id))
    }

    fn check_batch(&self, route_id: RouteId, stops: &[&Stop]) -> Result<(), RepoError> {
        if !self.routes.contains_key(&route_id) {
            return Err(RepoError::NotFound(format!("route {route_id}")));
        }

        if self.stops.get(&route_id).is_some_and(|existing| !existing.is_empty()) {
            return Err(RepoError::Conflict(format!(
                "route {route_id} already has stops"
            )));
        }

        let mut seen = HashSet::new();
        for (index, stop) in stops.iter().enumerate() {
            let expected = index as u32 + 1;
            if stop.stop_number != expected {
                return Err(RepoError::Conflict(format!(
                    "route {route_id} stop numbers must be contiguous from 1, found {} at position {expected}",
                    stop.stop_number
                )));
            }

            if !seen.insert(stop.order_id) {
                return Err(RepoError::Conflict(format!(
                    "order {} appears twice on route {route_id}",
                    stop.order_id
                )));
            }

            if let Some(holder) = self.holder_of(stop.order_id, Some(route_id)) {
                return Err(RepoError::Conflict(format!(
                    "order {} is already a stop on active route {holder}",
                    stop.order_id
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RouteRepository for MemoryRouteRepository {
    async fn create_route(&self, attributes: RouteAttributes) -> Result<RouteId, RepoError> {
        let route = Route::from_attributes(Uuid::new_v4(), attributes);
        let id = route.id;
        self.routes.insert(id, route);
        Ok(id)
    }

    async fn update_route(&self, id: RouteId, attributes: RouteAttributes) -> Result<(), RepoError> {
        let mut route = self
            .routes
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("route {id}")))?;

        route.apply(attributes);
        Ok(())
    }

    async fn get_route(&self, id: RouteId) -> Result<Option<Route>, RepoError> {
        Ok(self.routes.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete_stops(&self, route_id: RouteId) -> Result<(), RepoError> {
        let _guard = self.stop_writes.lock().await;
        self.stops.remove(&route_id);
        Ok(())
    }

    async fn insert_stops(&self, stops: &[Stop]) -> Result<(), RepoError> {
        let _guard = self.stop_writes.lock().await;

        let mut route_ids: Vec<RouteId> = Vec::new();
        for stop in stops {
            if !route_ids.contains(&stop.route_id) {
                route_ids.push(stop.route_id);
            }
        }

        for route_id in &route_ids {
            let batch: Vec<&Stop> = stops.iter().filter(|stop| stop.route_id == *route_id).collect();
            self.check_batch(*route_id, &batch)?;
        }

        for route_id in route_ids {
            let batch: Vec<Stop> = stops
                .iter()
                .filter(|stop| stop.route_id == route_id)
                .cloned()
                .collect();
            self.stops.insert(route_id, batch);
        }

        Ok(())
    }

    async fn list_stops(&self, route_id: RouteId) -> Result<Vec<Stop>, RepoError> {
        let mut stops = self
            .stops
            .get(&route_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        stops.sort_by_key(|stop| stop.stop_number);
        Ok(stops)
    }

    async fn active_route_for_order(&self, order_id: OrderId) -> Result<Option<RouteId>, RepoError> {
        Ok(self.holder_of(order_id, None))
    }

    async fn set_route_status(&self, id: RouteId, status: RouteStatus) -> Result<(), RepoError> {
        let mut route = self
            .routes
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("route {id}")))?;

        route.status = status;
        route.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDriverDirectory {
    drivers: DashMap<DriverId, Driver>,
}

impl MemoryDriverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, full_name: String, phone: Option<String>) -> Driver {
        let driver = Driver {
            id: format!("drv_{}", Uuid::new_v4().simple()),
            full_name,
            phone,
            driver_status: DriverStatus::Active,
            created_at: Utc::now(),
        };

        self.drivers.insert(driver.id.clone(), driver.clone());
        driver
    }

    pub fn insert(&self, driver: Driver) {
        self.drivers.insert(driver.id.clone(), driver);
    }

    pub fn get(&self, id: &str) -> Option<Driver> {
        self.drivers.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self, available_only: bool) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .filter(|entry| !available_only || entry.is_available())
            .map(|entry| entry.value().clone())
            .collect();

        drivers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        drivers
    }

    pub fn set_status(&self, id: &str, status: DriverStatus) -> Result<Driver, RepoError> {
        let mut driver = self
            .drivers
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(format!("driver {id}")))?;

        driver.driver_status = status;
        Ok(driver.clone())
    }

    pub fn remove(&self, id: &str) -> Result<Driver, RepoError> {
        self.drivers
            .remove(id)
            .map(|(_, driver)| driver)
            .ok_or_else(|| RepoError::NotFound(format!("driver {id}")))
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[async_trait]
impl DriverDirectory for MemoryDriverDirectory {
    async fn exists(&self, driver_id: &str) -> Result<bool, RepoError> {
        Ok(self.drivers.contains_key(driver_id))
    }

    async fn is_eligible(&self, driver_id: &str) -> Result<bool, RepoError> {
        Ok(self
            .drivers
            .get(driver_id)
            .is_some_and(|driver| driver.is_available()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::stop::StopStatus;

    fn attributes(name: &str) -> RouteAttributes {
        RouteAttributes {
            name: name.to_string(),
            driver_id: "D1".to_string(),
            status: RouteStatus::Scheduled,
            start_address: "123 Main St".to_string(),
            estimated_completion_time: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            notes: String::new(),
        }
    }

    fn stop(route_id: RouteId, order_id: OrderId, stop_number: u32) -> Stop {
        Stop {
            route_id,
            order_id,
            stop_number,
            status: StopStatus::Pending,
            estimated_arrival_time: None,
        }
    }

    #[tokio::test]
    async fn rejects_order_already_on_another_active_route() {
        let repo = MemoryRouteRepository::new();
        let first = repo.create_route(attributes("first")).await.unwrap();
        let second = repo.create_route(attributes("second")).await.unwrap();

        repo.insert_stops(&[stop(first, 7, 1)]).await.unwrap();
        let err = repo.insert_stops(&[stop(second, 7, 1)]).await.unwrap_err();

        assert!(matches!(err, RepoError::Conflict(_)));
        assert!(repo.list_stops(second).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_routes_release_their_orders() {
        let repo = MemoryRouteRepository::new();
        let first = repo.create_route(attributes("first")).await.unwrap();
        let second = repo.create_route(attributes("second")).await.unwrap();

        repo.insert_stops(&[stop(first, 7, 1)]).await.unwrap();
        repo.set_route_status(first, RouteStatus::Completed).await.unwrap();

        repo.insert_stops(&[stop(second, 7, 1)]).await.unwrap();
        assert_eq!(repo.active_route_for_order(7).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn gap_in_stop_numbers_inserts_nothing() {
        let repo = MemoryRouteRepository::new();
        let route = repo.create_route(attributes("gappy")).await.unwrap();

        let err = repo
            .insert_stops(&[stop(route, 1, 1), stop(route, 2, 3)])
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::Conflict(_)));
        assert!(repo.list_stops(route).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserting_over_existing_stops_requires_delete_first() {
        let repo = MemoryRouteRepository::new();
        let route = repo.create_route(attributes("busy")).await.unwrap();

        repo.insert_stops(&[stop(route, 1, 1)]).await.unwrap();
        assert!(repo.insert_stops(&[stop(route, 2, 1)]).await.is_err());

        repo.delete_stops(route).await.unwrap();
        repo.insert_stops(&[stop(route, 2, 1)]).await.unwrap();

        let stops = repo.list_stops(route).await.unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].order_id, 2);
    }

    #[tokio::test]
    async fn pending_orders_are_listed_newest_first() {
        let store = MemoryOrderStore::new();
        let older = store.create("alice".into(), "1 A St".into(), 10.0);
        let newer = store.create("bob".into(), "2 B St".into(), 20.0);
        let assigned = store.create("carol".into(), "3 C St".into(), 30.0);
        store.set_status(assigned.id, OrderStatus::Assigned).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        let ids: Vec<OrderId> = pending.iter().map(|order| order.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn inserted_orders_do_not_collide_with_generated_ids() {
        let store = MemoryOrderStore::new();
        store.insert(Order {
            id: 101,
            customer_name: "dave".into(),
            address: "4 D St".into(),
            total_price: 5.0,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        });

        let generated = store.create("erin".into(), "5 E St".into(), 6.0);
        assert_eq!(generated.id, 102);
    }

    #[tokio::test]
    async fn only_active_drivers_are_eligible() {
        let directory = MemoryDriverDirectory::new();
        let driver = directory.register("Dana".into(), None);

        assert!(directory.is_eligible(&driver.id).await.unwrap());

        directory.set_status(&driver.id, DriverStatus::OffDuty).unwrap();
        assert!(directory.exists(&driver.id).await.unwrap());
        assert!(!directory.is_eligible(&driver.id).await.unwrap());
        assert!(!directory.is_eligible("nobody").await.unwrap());
    }
}
