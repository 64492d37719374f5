use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_old};
use crate::extract::AppJson;
use crate::models::inventory::{InventoryItem, ItemBody, PublicInventoryItem};
use crate::store;

#[utoipa::path(
    get,
    path = "/inventory",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every item, ordered by name", body = [InventoryItem]))
)]
pub async fn list_items(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<InventoryItem>>> {
    authorize(&state, &requester, "list_items", &[Some(Scope::GetInventory)]).await?;
    Ok(Json(store::inventory::list_items(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/inventory/public",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every item without reorder details", body = [PublicInventoryItem]))
)]
pub async fn public_items(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<PublicInventoryItem>>> {
    authorize(
        &state,
        &requester,
        "list_public_items",
        &[Some(Scope::GetInventory), Some(Scope::GetPublicInventory)],
    )
    .await?;
    let items = store::inventory::list_items(&state.pool).await?;
    Ok(Json(items.iter().map(InventoryItem::to_public).collect()))
}

#[utoipa::path(
    get,
    path = "/inventory/{item_uuid}",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    params(("item_uuid" = String, Path, description = "Item uuid")),
    responses(
        (status = 200, description = "Item detail", body = InventoryItem),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(item_uuid): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    authorize(&state, &requester, "get_item", &[Some(Scope::GetInventory)]).await?;
    Ok(Json(store::inventory::get_item(&state.pool, &item_uuid).await?))
}

#[utoipa::path(
    post,
    path = "/inventory",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    request_body = ItemBody,
    responses(
        (status = 201, description = "Item created", body = InventoryItem),
        (status = 409, description = "Item uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<AppJson<ItemBody>, AppError>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    authorize(&state, &requester, "create_item", &[Some(Scope::CreateItem)]).await?;
    let AppJson(body) = body?;
    let item = store::inventory::create_item(&state.pool, &body.item_obj).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &item);
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/inventory/{item_uuid}",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    params(("item_uuid" = String, Path, description = "Item uuid")),
    request_body = ItemBody,
    responses(
        (status = 200, description = "Item replaced", body = InventoryItem),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(item_uuid): Path<String>,
    body: Result<AppJson<ItemBody>, AppError>,
) -> AppResult<Json<InventoryItem>> {
    authorize(&state, &requester, "update_item", &[Some(Scope::UpdateItem)]).await?;
    let AppJson(body) = body?;
    let before = store::inventory::get_item(&state.pool, &item_uuid).await?;
    let item = store::inventory::update_item(&state.pool, &item_uuid, &body.item_obj).await?;
    log_activity_with_old(&state.event_bus, "updated", &requester.actor(), &item, Some(&before));
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/inventory/{item_uuid}",
    tag = "Inventory",
    security(("requesting_uuid" = [])),
    params(("item_uuid" = String, Path, description = "Item uuid")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(item_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&state, &requester, "delete_item", &[Some(Scope::DeleteItem)]).await?;
    let removed = store::inventory::delete_item(&state.pool, &item_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &removed);
    Ok(StatusCode::NO_CONTENT)
}
