use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::Scope;
use crate::errors::AppError;
use crate::events::{Loggable, Severity};

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    #[schema(example = "R1")]
    pub uuid: String,
    #[schema(example = "Steward")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Staffs the space during open hours")]
    pub description: Option<String>,
    #[schema(example = "#3498db")]
    pub color: String,
    pub scopes: Vec<Scope>,
    /// Granted to every new user
    #[serde(default)]
    pub default: bool,
}

impl Role {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("role uuid must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::bad_request("role title must not be empty"));
        }
        Ok(())
    }
}

impl Loggable for Role {
    fn entity_type() -> &'static str { "role" }
    fn subject_id(&self) -> String { self.uuid.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRole {
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub color: String,
    pub is_default: bool,
}

impl DbRole {
    pub fn into_role(self, scopes: Vec<Scope>) -> Role {
        Role {
            uuid: self.uuid,
            title: self.title,
            description: self.description,
            color: self.color,
            scopes,
            default: self.is_default,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleBody {
    pub role_obj: Role,
}
