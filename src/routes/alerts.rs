use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::extract::AppJson;
use crate::models::schedule::{Alert, AlertBody, Schedule};
use crate::store;
use crate::utils::now_ts;

/// Open to everyone.
#[utoipa::path(
    get,
    path = "/schedules/current/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "Alerts in their window, plus default alerts", body = [Alert]),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn active_alerts(State(state): State<AppState>) -> AppResult<Json<Vec<Alert>>> {
    let alerts = store::schedules::active_alerts(&state.pool, now_ts()).await?;
    Ok(Json(alerts))
}

#[utoipa::path(
    post,
    path = "/schedules/{schedule_uuid}/alerts",
    tag = "Alerts",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    request_body = AlertBody,
    responses(
        (status = 201, description = "Alert added", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse),
        (status = 409, description = "Alert uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_alert(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
    body: Result<AppJson<AlertBody>, AppError>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    authorize(
        &state,
        &requester,
        "create_alert",
        &[Some(Scope::CreateAlert), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let AppJson(body) = body?;
    let schedule = store::schedules::create_alert(&state.pool, &schedule_uuid, &body.alert_obj).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &body.alert_obj);
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/schedules/{schedule_uuid}/alerts/{alert_uuid}",
    tag = "Alerts",
    security(("requesting_uuid" = [])),
    params(
        ("schedule_uuid" = String, Path, description = "Schedule uuid"),
        ("alert_uuid" = String, Path, description = "Alert uuid")
    ),
    request_body = AlertBody,
    responses(
        (status = 200, description = "Alert updated", body = Schedule),
        (status = 404, description = "Schedule or alert not found", body = ErrorResponse)
    )
)]
pub async fn update_alert(
    State(state): State<AppState>,
    requester: Requester,
    Path((schedule_uuid, alert_uuid)): Path<(String, String)>,
    body: Result<AppJson<AlertBody>, AppError>,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "update_alert",
        &[Some(Scope::UpdateAlert), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let AppJson(body) = body?;
    let schedule =
        store::schedules::update_alert(&state.pool, &schedule_uuid, &alert_uuid, &body.alert_obj).await?;
    if let Some(alert) = schedule.alert(&alert_uuid) {
        log_activity(&state.event_bus, "updated", &requester.actor(), alert);
    }
    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{schedule_uuid}/alerts/{alert_uuid}",
    tag = "Alerts",
    security(("requesting_uuid" = [])),
    params(
        ("schedule_uuid" = String, Path, description = "Schedule uuid"),
        ("alert_uuid" = String, Path, description = "Alert uuid")
    ),
    responses(
        (status = 200, description = "Alert removed, updated schedule returned", body = Schedule),
        (status = 404, description = "Schedule or alert not found", body = ErrorResponse)
    )
)]
pub async fn delete_alert(
    State(state): State<AppState>,
    requester: Requester,
    Path((schedule_uuid, alert_uuid)): Path<(String, String)>,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "delete_alert",
        &[Some(Scope::DeleteAlert), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let schedule = store::schedules::delete_alert(&state.pool, &schedule_uuid, &alert_uuid).await?;
    log_activity(&state.event_bus, "alert_deleted", &requester.actor(), &schedule);
    Ok(Json(schedule))
}
