use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::Scope;
use crate::events::{Loggable, Severity};

/// Metadata of an issued key. The key itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKey {
    pub uuid: String,
    #[schema(example = "checkout kiosk")]
    pub label: String,
    pub scopes: Vec<Scope>,
    pub created_at: i64,
}

impl Loggable for ApiKey {
    fn entity_type() -> &'static str { "api_key" }
    fn subject_id(&self) -> String { self.uuid.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbApiKey {
    pub uuid: String,
    pub label: String,
    /// Space separated scope names
    pub scopes: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiKeyCreateRequest {
    #[schema(example = "checkout kiosk")]
    pub label: String,
    pub scopes: Vec<Scope>,
}

/// Returned once, when the key is issued.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedApiKey {
    pub key: String,
    pub api_key: ApiKey,
}
