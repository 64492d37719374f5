use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope, ScopeDefinition, REGISTRY};
use crate::errors::AppResult;

#[utoipa::path(
    get,
    path = "/scopes",
    tag = "Scopes",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Every scope with its label and area", body = [ScopeDefinition]))
)]
pub async fn list_scopes(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<ScopeDefinition>>> {
    authorize(
        &state,
        &requester,
        "list_scopes",
        &[Some(Scope::GetRoles), Some(Scope::CreateRole), Some(Scope::UpdateRole)],
    )
    .await?;
    Ok(Json(REGISTRY.to_vec()))
}
