use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::extract::AppJson;
use crate::models::api_key::{ApiKey, ApiKeyCreateRequest, IssuedApiKey};
use crate::store;
use crate::utils::now_ts;

#[utoipa::path(
    get,
    path = "/api-keys",
    tag = "Api keys",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Issued keys, without the keys themselves", body = [ApiKey]))
)]
pub async fn list_api_keys(State(state): State<AppState>, requester: Requester) -> AppResult<Json<Vec<ApiKey>>> {
    authorize(&state, &requester, "list_api_keys", &[Some(Scope::Admin)]).await?;
    Ok(Json(store::api_keys::list(&state.pool).await?))
}

#[utoipa::path(
    post,
    path = "/api-keys",
    tag = "Api keys",
    security(("requesting_uuid" = [])),
    request_body = ApiKeyCreateRequest,
    responses(
        (status = 201, description = "Key issued; it is shown only in this response", body = IssuedApiKey),
        (status = 400, description = "Empty label", body = ErrorResponse)
    )
)]
pub async fn create_api_key(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<AppJson<ApiKeyCreateRequest>, AppError>,
) -> AppResult<(StatusCode, Json<IssuedApiKey>)> {
    authorize(&state, &requester, "create_api_key", &[Some(Scope::Admin)]).await?;
    let AppJson(payload) = payload?;
    let (key, api_key) = store::api_keys::issue(&state.pool, &payload.label, &payload.scopes, now_ts()).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &api_key);
    Ok((StatusCode::CREATED, Json(IssuedApiKey { key, api_key })))
}

#[utoipa::path(
    delete,
    path = "/api-keys/{key_uuid}",
    tag = "Api keys",
    security(("requesting_uuid" = [])),
    params(("key_uuid" = String, Path, description = "Key uuid")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 404, description = "Key not found", body = ErrorResponse)
    )
)]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    requester: Requester,
    Path(key_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&state, &requester, "revoke_api_key", &[Some(Scope::Admin)]).await?;
    let revoked = store::api_keys::revoke(&state.pool, &key_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &revoked);
    Ok(StatusCode::NO_CONTENT)
}
