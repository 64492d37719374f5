use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::Scope;
use crate::errors::AppError;
use crate::events::{Loggable, Severity};

/// When a user gained (and possibly lost) a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleLog {
    pub role_uuid: String,
    pub timestamp_gained: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_revoked: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRoleLog {
    pub role_uuid: String,
    pub timestamp_gained: i64,
    pub timestamp_revoked: Option<i64>,
}

impl From<DbRoleLog> for RoleLog {
    fn from(db: DbRoleLog) -> Self {
        RoleLog {
            role_uuid: db.role_uuid,
            timestamp_gained: db.timestamp_gained,
            timestamp_revoked: db.timestamp_revoked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub college_id: String,
    pub active_roles: Vec<RoleLog>,
    pub past_roles: Vec<RoleLog>,
}

impl Loggable for User {
    fn entity_type() -> &'static str { "user" }
    fn subject_id(&self) -> String { self.uuid.clone() }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub college_id: String,
}

impl DbUser {
    pub fn into_user(self, logs: Vec<RoleLog>) -> User {
        let (past_roles, active_roles) = logs
            .into_iter()
            .partition(|log| log.timestamp_revoked.is_some());
        User {
            uuid: self.uuid,
            name: self.name,
            email: self.email,
            college_id: self.college_id,
            active_roles,
            past_roles,
        }
    }
}

/// Editable user fields. Roles change only through grant and revoke.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserInput {
    #[schema(example = "U1")]
    pub uuid: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.edu")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "40123456")]
    pub college_id: String,
}

impl UserInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("user uuid must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("user name must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(AppError::bad_request(format!("`{}` is not an email address", self.email)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserBody {
    pub user_obj: UserInput,
}

/// Scopes the caller currently holds.
#[derive(Debug, Serialize, ToSchema)]
pub struct SelfScopes {
    pub uuid: String,
    pub scopes: Vec<Scope>,
}

/// A role grant or revoke, for the activity log.
#[derive(Debug, Clone, Serialize)]
pub struct RoleGrant {
    pub user_uuid: String,
    pub role_uuid: String,
    pub timestamp: i64,
}

impl Loggable for RoleGrant {
    fn entity_type() -> &'static str { "user_role" }
    fn subject_id(&self) -> String { self.user_uuid.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}
