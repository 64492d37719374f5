use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_old};
use crate::extract::AppJson;
use crate::models::restock::{RestockBody, RestockRequest, RestockStatusBody};
use crate::store;
use crate::utils::now_ts;

#[utoipa::path(
    get,
    path = "/restocks",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every restock request", body = [RestockRequest]))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<RestockRequest>>> {
    authorize(&state, &requester, "list_restock_requests", &[Some(Scope::GetRestockRequests)]).await?;
    Ok(Json(store::restocks::list_requests(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/restocks/by/user/{user_uuid}",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "Requesting user")),
    responses((status = 200, description = "Requests made by the user", body = [RestockRequest]))
)]
pub async fn list_requests_by_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<Json<Vec<RestockRequest>>> {
    authorize(
        &state,
        &requester,
        "list_user_restock_requests",
        &[
            Some(Scope::GetRestockRequests),
            Some(Scope::GetUserRestockRequests),
            requester.if_self(&user_uuid, Scope::GetOwnRestockRequests),
        ],
    )
    .await?;
    Ok(Json(store::restocks::list_requests_by_user(&state.pool, &user_uuid).await?))
}

#[utoipa::path(
    get,
    path = "/restocks/{request_uuid}",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    params(("request_uuid" = String, Path, description = "Request uuid")),
    responses(
        (status = 200, description = "Request detail", body = RestockRequest),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    requester: Requester,
    Path(request_uuid): Path<String>,
) -> AppResult<Json<RestockRequest>> {
    let request = store::restocks::find_request(&state.pool, &request_uuid).await?;
    let own = request
        .as_ref()
        .and_then(|r| requester.if_self(&r.requesting_user, Scope::GetOwnRestockRequests));

    authorize(
        &state,
        &requester,
        "get_restock_request",
        &[Some(Scope::GetRestockRequests), own],
    )
    .await?;

    request
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("restock request `{request_uuid}` not found")))
}

#[utoipa::path(
    post,
    path = "/restocks",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    request_body = RestockBody,
    responses(
        (status = 201, description = "Request created as PENDING_APPROVAL", body = RestockRequest),
        (status = 409, description = "Request uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<AppJson<RestockBody>, AppError>,
) -> AppResult<(StatusCode, Json<RestockRequest>)> {
    authorize(&state, &requester, "create_restock_request", &[Some(Scope::CreateRestockRequest)]).await?;
    let AppJson(body) = body?;
    let request = store::restocks::create_request(&state.pool, &body.request_obj, now_ts()).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &request);
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    put,
    path = "/restocks/{request_uuid}",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    params(("request_uuid" = String, Path, description = "Request uuid")),
    request_body = RestockBody,
    responses(
        (status = 200, description = "Request updated, status untouched", body = RestockRequest),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn update_request(
    State(state): State<AppState>,
    requester: Requester,
    Path(request_uuid): Path<String>,
    body: Result<AppJson<RestockBody>, AppError>,
) -> AppResult<Json<RestockRequest>> {
    authorize(&state, &requester, "update_restock_request", &[Some(Scope::UpdateRestockRequest)]).await?;
    let AppJson(body) = body?;
    let request = store::restocks::update_request(&state.pool, &request_uuid, &body.request_obj).await?;
    log_activity(&state.event_bus, "updated", &requester.actor(), &request);
    Ok(Json(request))
}

#[utoipa::path(
    patch,
    path = "/restocks/{request_uuid}/status",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    params(("request_uuid" = String, Path, description = "Request uuid")),
    request_body = RestockStatusBody,
    responses(
        (status = 200, description = "Status changed and logged", body = RestockRequest),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    requester: Requester,
    Path(request_uuid): Path<String>,
    body: Result<AppJson<RestockStatusBody>, AppError>,
) -> AppResult<Json<RestockRequest>> {
    authorize(&state, &requester, "update_restock_status", &[Some(Scope::UpdateRestockStatus)]).await?;
    let AppJson(body) = body?;
    let before = store::restocks::find_request(&state.pool, &request_uuid).await?;
    let request = store::restocks::update_status(&state.pool, &request_uuid, &body.status_obj).await?;
    log_activity_with_old(&state.event_bus, "status_changed", &requester.actor(), &request, before.as_ref());
    Ok(Json(request))
}

#[utoipa::path(
    delete,
    path = "/restocks/{request_uuid}",
    tag = "Restocks",
    security(("requesting_uuid" = [])),
    params(("request_uuid" = String, Path, description = "Request uuid")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn delete_request(
    State(state): State<AppState>,
    requester: Requester,
    Path(request_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&state, &requester, "delete_restock_request", &[Some(Scope::DeleteRestockRequest)]).await?;
    let removed = store::restocks::delete_request(&state.pool, &request_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &removed);
    Ok(StatusCode::NO_CONTENT)
}
