use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_old};
use crate::extract::AppJson;
use crate::models::role::{Role, RoleBody};
use crate::store;

#[utoipa::path(
    get,
    path = "/users/roles",
    tag = "Roles",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every role", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>, requester: Requester) -> AppResult<Json<Vec<Role>>> {
    authorize(&state, &requester, "list_roles", &[Some(Scope::GetRoles)]).await?;
    Ok(Json(store::roles::list_roles(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/users/roles/{role_uuid}",
    tag = "Roles",
    security(("requesting_uuid" = [])),
    params(("role_uuid" = String, Path, description = "Role uuid")),
    responses(
        (status = 200, description = "Role detail", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    requester: Requester,
    Path(role_uuid): Path<String>,
) -> AppResult<Json<Role>> {
    authorize(&state, &requester, "get_role", &[Some(Scope::GetRoles)]).await?;
    Ok(Json(store::roles::get_role(&state.pool, &role_uuid).await?))
}

#[utoipa::path(
    post,
    path = "/users/roles",
    tag = "Roles",
    security(("requesting_uuid" = [])),
    request_body = RoleBody,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<AppJson<RoleBody>, AppError>,
) -> AppResult<(StatusCode, Json<Role>)> {
    authorize(&state, &requester, "create_role", &[Some(Scope::CreateRole)]).await?;
    let AppJson(body) = body?;
    let role = store::roles::create_role(&state.pool, &body.role_obj).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &role);
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    put,
    path = "/users/roles/{role_uuid}",
    tag = "Roles",
    security(("requesting_uuid" = [])),
    params(("role_uuid" = String, Path, description = "Role uuid")),
    request_body = RoleBody,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    requester: Requester,
    Path(role_uuid): Path<String>,
    body: Result<AppJson<RoleBody>, AppError>,
) -> AppResult<Json<Role>> {
    authorize(&state, &requester, "update_role", &[Some(Scope::UpdateRole)]).await?;
    let AppJson(body) = body?;
    let before = store::roles::get_role(&state.pool, &role_uuid).await?;
    let role = store::roles::update_role(&state.pool, &role_uuid, &body.role_obj).await?;
    log_activity_with_old(&state.event_bus, "updated", &requester.actor(), &role, Some(&before));
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/users/roles/{role_uuid}",
    tag = "Roles",
    security(("requesting_uuid" = [])),
    params(("role_uuid" = String, Path, description = "Role uuid")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    requester: Requester,
    Path(role_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&state, &requester, "delete_role", &[Some(Scope::DeleteRole)]).await?;
    let removed = store::roles::delete_role(&state.pool, &role_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &removed);
    Ok(StatusCode::NO_CONTENT)
}
