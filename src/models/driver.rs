use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DriverId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DriverStatus {
    Active,
    OnDelivery,
    OffDuty,
    OnBreak,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub full_name: String,
    pub phone: Option<String>,
    pub driver_status: DriverStatus,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    /// Only drivers marked active can be handed a new route.
    pub fn is_available(&self) -> bool {
        self.driver_status == DriverStatus::Active
    }
}
