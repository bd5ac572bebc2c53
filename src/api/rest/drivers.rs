use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{delete, get, patch};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/drivers/available", get(list_available_drivers))
        .route("/drivers/:id", delete(delete_driver))
        .route("/drivers/:id/status", patch(update_driver_status))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub driver_status: DriverStatus,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name cannot be empty".to_string()));
    }

    let driver = state
        .drivers
        .register(payload.full_name.trim().to_string(), payload.phone);

    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.drivers.list(false))
}

async fn list_available_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.drivers.list(true))
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.drivers.set_status(&id, payload.driver_status)?))
}

async fn delete_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Driver>, AppError> {
    if state.drivers.get(&id).is_none() {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }

    let assigned = state.routes.routes_for_driver(&id);
    if assigned > 0 {
        return Err(AppError::Conflict(format!(
            "cannot delete driver with {assigned} assigned routes; reassign routes first"
        )));
    }

    let driver = state.drivers.remove(&id)?;
    info!(driver_id = %driver.id, "driver deleted");
    Ok(Json(driver))
}
