use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::errors::{AppError, AppResult, FORBIDDEN_MESSAGE, PROTECTED_ROUTE_MESSAGE};
use crate::store;

use super::principal::{Identity, Principal};
use super::scopes::Scope;

pub const REQUESTING_UUID_HEADER: &str = "requesting_uuid";
pub const API_KEY_HEADER: &str = "api_key";

/// The caller of a protected route. Rejects with 401 when neither a
/// `requesting_uuid` nor an `api_key` header is present.
#[derive(Debug, Clone)]
pub struct Requester(pub Identity);

impl Requester {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn is_user(&self, user_uuid: &str) -> bool {
        self.0.is_user(user_uuid)
    }

    /// `Some(scope)` when the caller is `user_uuid`, for "own record" checks.
    pub fn if_self(&self, user_uuid: &str, scope: Scope) -> Option<Scope> {
        self.is_user(user_uuid).then_some(scope)
    }

    /// Actor recorded in the activity log.
    pub fn actor(&self) -> String {
        self.0.to_string()
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(uuid) = header_value(parts, REQUESTING_UUID_HEADER) {
            return Ok(Requester(Identity::User(uuid)));
        }
        if let Some(key) = header_value(parts, API_KEY_HEADER) {
            return Ok(Requester(Identity::ApiKey(key)));
        }

        tracing::warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            "no requesting_uuid was provided to a protected route"
        );
        Err(AppError::unauthorized(PROTECTED_ROUTE_MESSAGE))
    }
}

/// Load the scopes currently granted to an identity.
pub async fn resolve(state: &AppState, identity: &Identity) -> AppResult<Principal> {
    let scopes = match identity {
        Identity::User(uuid) => store::users::scopes_for_user(&state.pool, uuid).await?,
        Identity::ApiKey(key) => store::api_keys::scopes_for_key(&state.pool, key).await?,
    };

    Ok(Principal {
        identity: identity.clone(),
        scopes,
    })
}

/// True when the identity holds `admin` or any of the acceptable scopes.
/// `None` entries are skipped; an empty list is never satisfied.
pub async fn verify(
    state: &AppState,
    identity: &Identity,
    acceptable: &[Option<Scope>],
) -> AppResult<bool> {
    let principal = resolve(state, identity).await?;
    Ok(state.authz.allows(&principal, acceptable).await)
}

/// Gate a route: 403 unless the requester satisfies one acceptable scope.
pub async fn authorize(
    state: &AppState,
    requester: &Requester,
    action: &str,
    acceptable: &[Option<Scope>],
) -> AppResult<()> {
    if !verify(state, requester.identity(), acceptable).await? {
        tracing::warn!(
            requesting_uuid = %requester.identity(),
            action,
            "forbidden user attempted a protected call"
        );
        return Err(AppError::forbidden(FORBIDDEN_MESSAGE));
    }

    tracing::debug!(requesting_uuid = %requester.identity(), action, "authorized");
    Ok(())
}
