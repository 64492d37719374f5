use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::events::Loggable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestockStatus {
    /// Submitted, not yet reviewed
    PendingApproval,
    /// Approved but not purchased yet
    ApprovedWaiting,
    /// Approved and ordered, not arrived yet
    ApprovedOrdered,
    Restocked,
    Denied,
}

impl RestockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestockStatus::PendingApproval => "PENDING_APPROVAL",
            RestockStatus::ApprovedWaiting => "APPROVED_WAITING",
            RestockStatus::ApprovedOrdered => "APPROVED_ORDERED",
            RestockStatus::Restocked => "RESTOCKED",
            RestockStatus::Denied => "DENIED",
        }
    }
}

impl fmt::Display for RestockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestockStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(RestockStatus::PendingApproval),
            "APPROVED_WAITING" => Ok(RestockStatus::ApprovedWaiting),
            "APPROVED_ORDERED" => Ok(RestockStatus::ApprovedOrdered),
            "RESTOCKED" => Ok(RestockStatus::Restocked),
            "DENIED" => Ok(RestockStatus::Denied),
            other => Err(AppError::internal(format!("unknown restock status `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestockStatusLog {
    #[schema(example = 1717430400)]
    pub timestamp: i64,
    pub status: RestockStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "ordered")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRestockStatusLog {
    pub timestamp: i64,
    pub status: String,
    pub message: Option<String>,
}

impl TryFrom<DbRestockStatusLog> for RestockStatusLog {
    type Error = AppError;

    fn try_from(db: DbRestockStatusLog) -> Result<Self, Self::Error> {
        Ok(RestockStatusLog {
            timestamp: db.timestamp,
            status: db.status.parse()?,
            message: db.message,
        })
    }
}

/// A request to replenish an inventory item.
///
/// `current_status` always equals the status of the last entry in
/// `status_logs`; both change together through the status route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestockRequest {
    #[schema(example = "RR1")]
    pub uuid: String,
    #[schema(example = "ITEM-PLA-WHITE")]
    pub item_uuid: String,
    #[schema(example = 2)]
    pub current_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_requested: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub requesting_user: String,
    pub current_status: RestockStatus,
    pub status_logs: Vec<RestockStatusLog>,
}

impl Loggable for RestockRequest {
    fn entity_type() -> &'static str { "restock_request" }
    fn subject_id(&self) -> String { self.uuid.clone() }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRestockRequest {
    pub uuid: String,
    pub item_uuid: String,
    pub current_quantity: i64,
    pub quantity_requested: Option<i64>,
    pub reason: Option<String>,
    pub requesting_user: String,
    pub current_status: String,
}

impl DbRestockRequest {
    pub fn into_request(self, status_logs: Vec<RestockStatusLog>) -> Result<RestockRequest, AppError> {
        Ok(RestockRequest {
            uuid: self.uuid,
            item_uuid: self.item_uuid,
            current_quantity: self.current_quantity,
            quantity_requested: self.quantity_requested,
            reason: self.reason,
            requesting_user: self.requesting_user,
            current_status: self.current_status.parse()?,
            status_logs,
        })
    }
}

/// Fields accepted on create and replace. Status only moves through
/// the status route, so it is not editable here.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RestockInput {
    pub uuid: String,
    pub item_uuid: String,
    pub current_quantity: i64,
    #[serde(default)]
    pub quantity_requested: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
    pub requesting_user: String,
}

impl RestockInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("restock request uuid must not be empty"));
        }
        if self.current_quantity < 0 {
            return Err(AppError::bad_request("current_quantity must not be negative"));
        }
        if matches!(self.quantity_requested, Some(q) if q <= 0) {
            return Err(AppError::bad_request("quantity_requested must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestockBody {
    pub request_obj: RestockInput,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestockStatusBody {
    pub status_obj: RestockStatusLog,
}
