//! Route assignment: writes a route, replaces its stops and flips the selected
//! orders to `ASSIGNED`.
//!
//! Every check that can reject the request runs before the first write. The
//! writes themselves are independent calls against the stores, in this order:
//! route, stop delete (updates only), stop insert, one status flip per order.
//! A failure part-way leaves the earlier writes in place; the returned
//! [`AssignmentError::Persistence`] names the step so the caller can retry the
//! whole request against the same route id, which replaces the stops again.
//!
//! Edits obey the route status lifecycle and keep the route's own driver
//! assignable even when that driver is out on delivery.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::sequencer::{self, SequenceError};
use crate::models::order::{OrderId, OrderStatus};
use crate::models::route::{Route, RouteAttributes, RouteId, RouteStatus};
use crate::models::stop::Stop;
use crate::store::{DriverDirectory, OrderStore, RepoError, RouteRepository};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("route name is required")]
    MissingName,

    #[error("a driver must be assigned")]
    MissingDriver,

    #[error("start address is required")]
    MissingStartAddress,

    #[error("you must select at least one order for the route")]
    EmptySelection,

    #[error("driver {0} does not exist")]
    UnknownDriver(String),

    #[error("driver {0} is not available for new routes")]
    IneligibleDriver(String),

    #[error("order {0} does not exist")]
    UnknownOrder(OrderId),

    #[error("order {order_id} is {status:?} and cannot be put on a route")]
    OrderNotAssignable { order_id: OrderId, status: OrderStatus },

    #[error("order {order_id} is already a stop on route {route_id}")]
    OrderOnAnotherRoute { order_id: OrderId, route_id: RouteId },

    #[error("route cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: RouteStatus, to: RouteStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStep {
    LookupDriver,
    LookupOrder,
    LookupRoute,
    WriteRoute,
    ClearStops,
    InsertStops,
    MarkAssigned(OrderId),
}

impl AssignmentStep {
    /// Whether this step can have left anything behind in storage.
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            AssignmentStep::LookupDriver | AssignmentStep::LookupOrder | AssignmentStep::LookupRoute
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            AssignmentStep::LookupDriver => "lookup_driver",
            AssignmentStep::LookupOrder => "lookup_order",
            AssignmentStep::LookupRoute => "lookup_route",
            AssignmentStep::WriteRoute => "write_route",
            AssignmentStep::ClearStops => "clear_stops",
            AssignmentStep::InsertStops => "insert_stops",
            AssignmentStep::MarkAssigned(_) => "mark_assigned",
        }
    }
}

impl fmt::Display for AssignmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStep::MarkAssigned(order_id) => write!(f, "mark_assigned(order {order_id})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("{step} failed: {source}")]
    Persistence {
        step: AssignmentStep,
        source: RepoError,
    },
}

impl AssignmentError {
    pub fn failed_step(&self) -> Option<AssignmentStep> {
        match self {
            AssignmentError::Persistence { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn at(step: AssignmentStep) -> impl FnOnce(RepoError) -> AssignmentError {
    move |source| AssignmentError::Persistence { step, source }
}

#[derive(Debug, Clone)]
pub struct AssignRouteRequest {
    /// Present when editing an existing route.
    pub route_id: Option<RouteId>,
    pub attributes: RouteAttributes,
    pub selection: Vec<OrderId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub route_id: RouteId,
    pub stop_count: usize,
    pub stops: Vec<Stop>,
    pub created: bool,
}

#[derive(Clone)]
pub struct RouteCoordinator {
    orders: Arc<dyn OrderStore>,
    routes: Arc<dyn RouteRepository>,
    drivers: Arc<dyn DriverDirectory>,
}

impl RouteCoordinator {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        routes: Arc<dyn RouteRepository>,
        drivers: Arc<dyn DriverDirectory>,
    ) -> Self {
        Self {
            orders,
            routes,
            drivers,
        }
    }

    pub async fn assign(&self, request: AssignRouteRequest) -> Result<AssignmentOutcome, AssignmentError> {
        let AssignRouteRequest {
            route_id,
            attributes,
            selection,
        } = request;

        let attributes = normalize(attributes)?;
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        sequencer::check_selection(&selection)?;

        let existing = match route_id {
            Some(id) => Some(self.load_route(id).await?),
            None => None,
        };

        if let Some(existing) = &existing {
            if !existing.status.can_transition_to(attributes.status) {
                return Err(ValidationError::InvalidTransition {
                    from: existing.status,
                    to: attributes.status,
                }
                .into());
            }
        }

        // The route's own driver is usually on-delivery while it runs; editing
        // must not require them to be free again.
        let keeps_driver = existing
            .as_ref()
            .is_some_and(|existing| existing.driver_id == attributes.driver_id);
        self.check_driver(&attributes.driver_id, !keeps_driver).await?;
        self.check_orders(route_id, &selection).await?;

        let (route_id, created) = match route_id {
            Some(id) => {
                self.routes
                    .update_route(id, attributes)
                    .await
                    .map_err(at(AssignmentStep::WriteRoute))?;
                (id, false)
            }
            None => {
                let id = self
                    .routes
                    .create_route(attributes)
                    .await
                    .map_err(at(AssignmentStep::WriteRoute))?;
                (id, true)
            }
        };
        debug!(route_id = %route_id, created, "route written");

        if !created {
            self.routes
                .delete_stops(route_id)
                .await
                .map_err(at(AssignmentStep::ClearStops))?;
        }

        let stops = sequencer::sequence_stops(route_id, &selection)?;
        self.routes
            .insert_stops(&stops)
            .await
            .map_err(at(AssignmentStep::InsertStops))?;
        debug!(route_id = %route_id, stops = stops.len(), "stops inserted");

        for order_id in &selection {
            if let Err(err) = self.orders.set_status(*order_id, OrderStatus::Assigned).await {
                warn!(
                    route_id = %route_id,
                    order_id,
                    error = %err,
                    "order status update failed; route and stops stay persisted"
                );
                return Err(at(AssignmentStep::MarkAssigned(*order_id))(err));
            }
        }

        info!(
            route_id = %route_id,
            stop_count = stops.len(),
            created,
            "route assigned"
        );

        Ok(AssignmentOutcome {
            route_id,
            stop_count: stops.len(),
            stops,
            created,
        })
    }

    pub async fn set_route_status(
        &self,
        route_id: RouteId,
        status: RouteStatus,
    ) -> Result<Route, AssignmentError> {
        let route = self.load_route(route_id).await?;

        if !route.status.can_transition_to(status) {
            return Err(ValidationError::InvalidTransition {
                from: route.status,
                to: status,
            }
            .into());
        }

        self.routes
            .set_route_status(route_id, status)
            .await
            .map_err(at(AssignmentStep::WriteRoute))?;

        info!(route_id = %route_id, from = ?route.status, to = ?status, "route status changed");

        Ok(Route {
            status,
            ..route
        })
    }

    async fn load_route(&self, route_id: RouteId) -> Result<Route, AssignmentError> {
        self.routes
            .get_route(route_id)
            .await
            .map_err(at(AssignmentStep::LookupRoute))?
            .ok_or_else(|| {
                at(AssignmentStep::LookupRoute)(RepoError::NotFound(format!("route {route_id}")))
            })
    }

    async fn check_driver(&self, driver_id: &str, require_available: bool) -> Result<(), AssignmentError> {
        let exists = self
            .drivers
            .exists(driver_id)
            .await
            .map_err(at(AssignmentStep::LookupDriver))?;
        if !exists {
            return Err(ValidationError::UnknownDriver(driver_id.to_string()).into());
        }

        if !require_available {
            return Ok(());
        }

        let eligible = self
            .drivers
            .is_eligible(driver_id)
            .await
            .map_err(at(AssignmentStep::LookupDriver))?;
        if !eligible {
            return Err(ValidationError::IneligibleDriver(driver_id.to_string()).into());
        }

        Ok(())
    }

    /// Pending orders, and assigned orders no other active route holds, may be selected.
    async fn check_orders(
        &self,
        route_id: Option<RouteId>,
        selection: &[OrderId],
    ) -> Result<(), AssignmentError> {
        for order_id in selection {
            let order = self
                .orders
                .get(*order_id)
                .await
                .map_err(at(AssignmentStep::LookupOrder))?
                .ok_or(ValidationError::UnknownOrder(*order_id))?;

            if !matches!(order.status, OrderStatus::Pending | OrderStatus::Assigned) {
                return Err(ValidationError::OrderNotAssignable {
                    order_id: order.id,
                    status: order.status,
                }
                .into());
            }

            let holder = self
                .routes
                .active_route_for_order(order.id)
                .await
                .map_err(at(AssignmentStep::LookupOrder))?;

            if let Some(holder) = holder.filter(|holder| Some(*holder) != route_id) {
                return Err(ValidationError::OrderOnAnotherRoute {
                    order_id: order.id,
                    route_id: holder,
                }
                .into());
            }
        }

        Ok(())
    }
}

fn normalize(attributes: RouteAttributes) -> Result<RouteAttributes, ValidationError> {
    let name = attributes.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let driver_id = attributes.driver_id.trim().to_string();
    if driver_id.is_empty() {
        return Err(ValidationError::MissingDriver);
    }

    let start_address = attributes.start_address.trim().to_string();
    if start_address.is_empty() {
        return Err(ValidationError::MissingStartAddress);
    }

    Ok(RouteAttributes {
        name,
        driver_id,
        start_address,
        ..attributes
    })
}
