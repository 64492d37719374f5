use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, resolve, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_old};
use crate::extract::AppJson;
use crate::models::user::{RoleGrant, SelfScopes, User, UserBody};
use crate::store;
use crate::utils::now_ts;

fn self_uuid(requester: &Requester) -> AppResult<&str> {
    requester
        .identity()
        .user_uuid()
        .ok_or_else(|| AppError::bad_request("self routes need a requesting_uuid, not an api key"))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every user", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>, requester: Requester) -> AppResult<Json<Vec<User>>> {
    authorize(&state, &requester, "list_users", &[Some(Scope::GetUsers)]).await?;
    Ok(Json(store::users::list_users(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/users/self",
    tag = "Users",
    security(("requesting_uuid" = [])),
    responses(
        (status = 200, description = "The caller", body = User),
        (status = 404, description = "Caller is not a registered user", body = ErrorResponse)
    )
)]
pub async fn get_self(State(state): State<AppState>, requester: Requester) -> AppResult<Json<User>> {
    let uuid = self_uuid(&requester)?;
    Ok(Json(store::users::get_user(&state.pool, uuid).await?))
}

#[utoipa::path(
    get,
    path = "/users/self/scopes",
    tag = "Users",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Scopes the caller holds", body = SelfScopes))
)]
pub async fn get_self_scopes(State(state): State<AppState>, requester: Requester) -> AppResult<Json<SelfScopes>> {
    let uuid = self_uuid(&requester)?.to_string();
    let principal = resolve(&state, requester.identity()).await?;
    Ok(Json(SelfScopes {
        uuid,
        scopes: principal.scopes.to_sorted_vec(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_uuid}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "User uuid")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<Json<User>> {
    // Reading your own record needs no scope beyond being that user.
    if !requester.is_user(&user_uuid) {
        authorize(&state, &requester, "get_user", &[Some(Scope::GetUsers)]).await?;
    }
    Ok(Json(store::users::get_user(&state.pool, &user_uuid).await?))
}

#[utoipa::path(
    get,
    path = "/users/by/email/{email}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(("email" = String, Path, description = "Exact email address")),
    responses(
        (status = 200, description = "User with that email", body = User),
        (status = 404, description = "No user has that email", body = ErrorResponse)
    )
)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    requester: Requester,
    Path(email): Path<String>,
) -> AppResult<Json<User>> {
    authorize(&state, &requester, "get_user_by_email", &[Some(Scope::GetUsers)]).await?;
    Ok(Json(store::users::get_user_by_email(&state.pool, &email).await?))
}

#[utoipa::path(
    get,
    path = "/users/by/id/{college_id}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(("college_id" = String, Path, description = "College id")),
    responses(
        (status = 200, description = "User with that college id", body = User),
        (status = 404, description = "No user has that college id", body = ErrorResponse)
    )
)]
pub async fn get_user_by_college_id(
    State(state): State<AppState>,
    requester: Requester,
    Path(college_id): Path<String>,
) -> AppResult<Json<User>> {
    authorize(&state, &requester, "get_user_by_college_id", &[Some(Scope::GetUsers)]).await?;
    Ok(Json(store::users::get_user_by_college_id(&state.pool, &college_id).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("requesting_uuid" = [])),
    request_body = UserBody,
    responses(
        (status = 201, description = "User created with default roles", body = User),
        (status = 409, description = "Uuid or email already in use", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<AppJson<UserBody>, AppError>,
) -> AppResult<(StatusCode, Json<User>)> {
    authorize(&state, &requester, "create_user", &[Some(Scope::CreateUser)]).await?;
    let AppJson(body) = body?;
    let user = store::users::create_user(&state.pool, &body.user_obj, now_ts()).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &user);
    Ok((StatusCode::CREATED, Json(user)))
}

/// First-run bootstrap, only while no user exists.
#[utoipa::path(
    post,
    path = "/users/initialize_admin",
    tag = "Users",
    request_body = UserBody,
    responses(
        (status = 201, description = "Admin role and user created", body = User),
        (status = 409, description = "Users already exist", body = ErrorResponse)
    )
)]
pub async fn initialize_admin(
    State(state): State<AppState>,
    AppJson(body): AppJson<UserBody>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = store::users::initialize_admin(&state.pool, &body.user_obj, now_ts()).await?;
    tracing::warn!(user_uuid = %user.uuid, "initial admin created");
    log_activity(&state.event_bus, "admin_initialized", &user.uuid, &user);
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/users/{user_uuid}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "User uuid")),
    request_body = UserBody,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
    body: Result<AppJson<UserBody>, AppError>,
) -> AppResult<Json<User>> {
    authorize(
        &state,
        &requester,
        "update_user",
        &[Some(Scope::UpdateUser), requester.if_self(&user_uuid, Scope::UpdateSelf)],
    )
    .await?;
    let AppJson(body) = body?;
    let before = store::users::get_user(&state.pool, &user_uuid).await?;
    let user = store::users::update_user(&state.pool, &user_uuid, &body.user_obj).await?;
    log_activity_with_old(&state.event_bus, "updated", &requester.actor(), &user, Some(&before));
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{user_uuid}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "User uuid")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(
        &state,
        &requester,
        "delete_user",
        &[Some(Scope::DeleteUser), requester.if_self(&user_uuid, Scope::DeleteSelf)],
    )
    .await?;
    let removed = store::users::delete_user(&state.pool, &user_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &removed);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{user_uuid}/roles/{role_uuid}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(
        ("user_uuid" = String, Path, description = "User uuid"),
        ("role_uuid" = String, Path, description = "Role uuid")
    ),
    responses(
        (status = 200, description = "Role granted", body = User),
        (status = 404, description = "User or role not found", body = ErrorResponse)
    )
)]
pub async fn grant_role(
    State(state): State<AppState>,
    requester: Requester,
    Path((user_uuid, role_uuid)): Path<(String, String)>,
) -> AppResult<Json<User>> {
    authorize(
        &state,
        &requester,
        "grant_role",
        &[Some(Scope::GrantRole), Some(Scope::UpdateUser)],
    )
    .await?;
    let now = now_ts();
    let user = store::users::grant_role(&state.pool, &user_uuid, &role_uuid, now).await?;
    let grant = RoleGrant { user_uuid, role_uuid, timestamp: now };
    log_activity(&state.event_bus, "granted", &requester.actor(), &grant);
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{user_uuid}/roles/{role_uuid}",
    tag = "Users",
    security(("requesting_uuid" = [])),
    params(
        ("user_uuid" = String, Path, description = "User uuid"),
        ("role_uuid" = String, Path, description = "Role uuid")
    ),
    responses(
        (status = 200, description = "Role revoked", body = User),
        (status = 404, description = "User not found or role not held", body = ErrorResponse)
    )
)]
pub async fn revoke_role(
    State(state): State<AppState>,
    requester: Requester,
    Path((user_uuid, role_uuid)): Path<(String, String)>,
) -> AppResult<Json<User>> {
    authorize(
        &state,
        &requester,
        "revoke_role",
        &[Some(Scope::GrantRole), Some(Scope::UpdateUser)],
    )
    .await?;
    let now = now_ts();
    let user = store::users::revoke_role(&state.pool, &user_uuid, &role_uuid, now).await?;
    let grant = RoleGrant { user_uuid, role_uuid, timestamp: now };
    log_activity(&state.event_bus, "revoked", &requester.actor(), &grant);
    Ok(Json(user))
}
