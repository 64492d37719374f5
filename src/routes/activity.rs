use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::AppResult;
use crate::events::{self, ActivityEntry};

const ACTIVITY_PAGE: i64 = 100;

#[utoipa::path(
    get,
    path = "/activity",
    tag = "Activity",
    security(("requesting_uuid" = [])),
    responses((status = 200, description = "Latest audit entries, newest first", body = [ActivityEntry]))
)]
pub async fn list_activity(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    authorize(&state, &requester, "list_activity", &[Some(Scope::Admin)]).await?;
    Ok(Json(events::list_activity(&state.pool, ACTIVITY_PAGE).await?))
}
