use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverId;

pub type RouteId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Delayed,
}

impl RouteStatus {
    pub fn is_terminal(self) -> bool {
        self == RouteStatus::Completed
    }

    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        use RouteStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Delayed)
                | (InProgress, Completed)
                | (InProgress, Delayed)
                | (Delayed, InProgress)
                | (Delayed, Completed)
        )
    }
}

/// Writable fields of a route, as submitted by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteAttributes {
    pub name: String,
    pub driver_id: DriverId,
    #[serde(default)]
    pub status: RouteStatus,
    pub start_address: String,
    #[serde(with = "crate::models::time::local")]
    pub estimated_completion_time: NaiveDateTime,
    #[serde(default)]
    pub notes: String,
}

/// Route fields as submitted from the dashboard form. Status and completion
/// time may be left out and are filled in by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDraft {
    pub name: String,
    pub driver_id: DriverId,
    #[serde(default)]
    pub status: Option<RouteStatus>,
    pub start_address: String,
    #[serde(default, with = "crate::models::time::local_option")]
    pub estimated_completion_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub notes: String,
}

impl RouteDraft {
    pub fn into_attributes(
        self,
        fallback_status: RouteStatus,
        fallback_completion: NaiveDateTime,
    ) -> RouteAttributes {
        RouteAttributes {
            name: self.name,
            driver_id: self.driver_id,
            status: self.status.unwrap_or(fallback_status),
            start_address: self.start_address,
            estimated_completion_time: self.estimated_completion_time.unwrap_or(fallback_completion),
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub driver_id: DriverId,
    pub status: RouteStatus,
    pub start_address: String,
    #[serde(with = "crate::models::time::local")]
    pub estimated_completion_time: NaiveDateTime,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn from_attributes(id: RouteId, attributes: RouteAttributes) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: attributes.name,
            driver_id: attributes.driver_id,
            status: attributes.status,
            start_address: attributes.start_address,
            estimated_completion_time: attributes.estimated_completion_time,
            notes: attributes.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, attributes: RouteAttributes) {
        self.name = attributes.name;
        self.driver_id = attributes.driver_id;
        self.status = attributes.status;
        self.start_address = attributes.start_address;
        self.estimated_completion_time = attributes.estimated_completion_time;
        self.notes = attributes.notes;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Route listing row: the route plus how many stops it holds.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    #[serde(flatten)]
    pub route: Route,
    pub order_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteEventKind {
    Created,
    Updated,
    StatusChanged,
}

/// Broadcast to dashboard subscribers after a route write completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEvent {
    pub kind: RouteEventKind,
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub status: RouteStatus,
    pub stop_count: usize,
    pub at: DateTime<Utc>,
}
