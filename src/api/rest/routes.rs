use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::engine::coordinator::{AssignRouteRequest, AssignmentError, AssignmentOutcome};
use crate::error::AppError;
use crate::models::order::OrderId;
use crate::models::route::{
    Route, RouteDraft, RouteEvent, RouteEventKind, RouteId, RouteStatus, RouteSummary,
};
use crate::models::stop::Stop;
use crate::state::AppState;
use crate::store::RouteRepository;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/:id", get(get_route).put(update_route))
        .route("/routes/:id/status", patch(update_route_status))
}

#[derive(Deserialize)]
pub struct RouteRequest {
    #[serde(flatten)]
    pub route: RouteDraft,
    pub order_ids: Vec<OrderId>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RouteStatus,
}

#[derive(Serialize)]
pub struct RouteDetail {
    #[serde(flatten)]
    pub route: Route,
    pub stops: Vec<Stop>,
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    run_assignment(&state, None, payload).await.map(Json)
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RouteId>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    run_assignment(&state, Some(id), payload).await.map(Json)
}

async fn run_assignment(
    state: &AppState,
    route_id: Option<RouteId>,
    payload: RouteRequest,
) -> Result<AssignmentOutcome, AppError> {
    // Edits keep the stored status and completion time unless the form sends new ones.
    let stored = match route_id {
        Some(id) => state.routes.get_route(id).await?,
        None => None,
    };
    let (fallback_status, fallback_completion) = match stored {
        Some(route) => (route.status, route.estimated_completion_time),
        None => (
            RouteStatus::default(),
            (Utc::now() + state.default_completion_horizon).naive_utc(),
        ),
    };

    let request = AssignRouteRequest {
        route_id,
        attributes: payload
            .route
            .into_attributes(fallback_status, fallback_completion),
        selection: payload.order_ids,
    };

    let start = Instant::now();
    match state.coordinator.assign(request).await {
        Ok(outcome) => {
            state
                .metrics
                .observe_assignment("success", start.elapsed().as_secs_f64());
            state
                .metrics
                .orders_assigned_total
                .inc_by(outcome.stop_count as u64);

            publish(state, &outcome).await;
            Ok(outcome)
        }
        Err(err) => {
            state
                .metrics
                .observe_assignment("error", start.elapsed().as_secs_f64());
            if let AssignmentError::Persistence { step, .. } = &err {
                state
                    .metrics
                    .route_assignment_failures_total
                    .with_label_values(&[step.label()])
                    .inc();
                error!(error = %err, partial = step.is_write(), "route assignment failed");
            }
            Err(err.into())
        }
    }
}

async fn publish(state: &AppState, outcome: &AssignmentOutcome) {
    let Ok(Some(route)) = state.routes.get_route(outcome.route_id).await else {
        return;
    };

    let kind = if outcome.created {
        RouteEventKind::Created
    } else {
        RouteEventKind::Updated
    };

    let _ = state.route_events_tx.send(RouteEvent {
        kind,
        route_id: route.id,
        driver_id: route.driver_id,
        status: route.status,
        stop_count: outcome.stop_count,
        at: Utc::now(),
    });
}

async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Vec<RouteSummary>> {
    Json(state.routes.list_routes())
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RouteId>,
) -> Result<Json<RouteDetail>, AppError> {
    let route = state
        .routes
        .get_route(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("route {} not found", id)))?;
    let stops = state.routes.list_stops(id).await?;

    Ok(Json(RouteDetail { route, stops }))
}

async fn update_route_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RouteId>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Route>, AppError> {
    let route = state.coordinator.set_route_status(id, payload.status).await?;
    let stop_count = state.routes.list_stops(id).await?.len();

    let _ = state.route_events_tx.send(RouteEvent {
        kind: RouteEventKind::StatusChanged,
        route_id: route.id,
        driver_id: route.driver_id.clone(),
        status: route.status,
        stop_count,
        at: Utc::now(),
    });

    Ok(Json(route))
}
