use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_old};
use crate::extract::AppJson;
use crate::models::schedule::{PublicSchedule, Schedule, ScheduleBody, SchedulePatchBody};
use crate::store;
use crate::utils::now_ts;

#[utoipa::path(
    get,
    path = "/schedules",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    responses(
        (status = 200, description = "Every schedule", body = [Schedule]),
        (status = 401, description = "No requesting_uuid", body = ErrorResponse),
        (status = 403, description = "Missing scope", body = ErrorResponse)
    )
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Vec<Schedule>>> {
    authorize(&state, &requester, "list_schedules", &[Some(Scope::GetSchedules)]).await?;
    let schedules = store::schedules::list_schedules(&state.pool).await?;
    Ok(Json(schedules))
}

#[utoipa::path(
    get,
    path = "/schedules/current",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    responses(
        (status = 200, description = "The current schedule", body = Schedule),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn current_schedule(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "current_schedule",
        &[
            Some(Scope::GetSchedules),
            Some(Scope::GetOneSchedule),
            Some(Scope::GetCurrentSchedule),
        ],
    )
    .await?;
    let schedule = store::schedules::current_schedule(&state.pool, now_ts()).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/schedules/public",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    responses(
        (status = 200, description = "Current shifts without uuids or history", body = PublicSchedule),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn public_schedule(
    State(state): State<AppState>,
    requester: Requester,
) -> AppResult<Json<PublicSchedule>> {
    authorize(
        &state,
        &requester,
        "public_schedule",
        &[
            Some(Scope::GetSchedules),
            Some(Scope::GetOneSchedule),
            Some(Scope::GetCurrentSchedule),
            Some(Scope::GetPublicSchedule),
        ],
    )
    .await?;
    let schedule = store::schedules::current_schedule(&state.pool, now_ts()).await?;
    Ok(Json(schedule.public_view()))
}

#[utoipa::path(
    patch,
    path = "/schedules/current/{schedule_uuid}",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule to make current")),
    responses(
        (status = 200, description = "Schedule activated", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn activate_schedule(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
) -> AppResult<Json<Schedule>> {
    authorize(&state, &requester, "activate_schedule", &[Some(Scope::UpdateSchedule)]).await?;
    let schedule = store::schedules::activate_schedule(&state.pool, &schedule_uuid).await?;
    log_activity(&state.event_bus, "activated", &requester.actor(), &schedule);
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/schedules/{schedule_uuid}",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    responses(
        (status = 200, description = "Schedule detail", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "get_schedule",
        &[Some(Scope::GetSchedules), Some(Scope::GetOneSchedule)],
    )
    .await?;
    let schedule = store::schedules::get_schedule(&state.pool, &schedule_uuid).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    post,
    path = "/schedules",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    request_body = ScheduleBody,
    responses(
        (status = 201, description = "Schedule created", body = Schedule),
        (status = 409, description = "Schedule, shift or alert uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<AppJson<ScheduleBody>, AppError>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    authorize(&state, &requester, "create_schedule", &[Some(Scope::CreateSchedule)]).await?;
    let AppJson(body) = body?;
    let schedule = store::schedules::create_schedule(&state.pool, &body.schedule_obj).await?;
    log_activity(&state.event_bus, "created", &requester.actor(), &schedule);
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/schedules/{schedule_uuid}",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    request_body = ScheduleBody,
    responses(
        (status = 200, description = "Schedule replaced", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn replace_schedule(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
    body: Result<AppJson<ScheduleBody>, AppError>,
) -> AppResult<Json<Schedule>> {
    authorize(&state, &requester, "replace_schedule", &[Some(Scope::UpdateSchedule)]).await?;
    let AppJson(body) = body?;
    let before = store::schedules::get_schedule(&state.pool, &schedule_uuid).await?;
    let schedule = store::schedules::replace_schedule(&state.pool, &schedule_uuid, body.schedule_obj).await?;
    log_activity_with_old(&state.event_bus, "updated", &requester.actor(), &schedule, Some(&before));
    Ok(Json(schedule))
}

#[utoipa::path(
    patch,
    path = "/schedules/{schedule_uuid}",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    request_body = SchedulePatchBody,
    responses(
        (status = 200, description = "Schedule updated", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn patch_schedule(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
    body: Result<AppJson<SchedulePatchBody>, AppError>,
) -> AppResult<Json<Schedule>> {
    authorize(&state, &requester, "patch_schedule", &[Some(Scope::UpdateSchedule)]).await?;
    let AppJson(body) = body?;
    let schedule =
        store::schedules::patch_schedule(&state.pool, &schedule_uuid, body.partial_schedule_obj).await?;
    log_activity(&state.event_bus, "updated", &requester.actor(), &schedule);
    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{schedule_uuid}",
    tag = "Schedules",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    responses(
        (status = 204, description = "Schedule deleted"),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&state, &requester, "delete_schedule", &[Some(Scope::DeleteSchedule)]).await?;
    let removed = store::schedules::delete_schedule(&state.pool, &schedule_uuid).await?;
    log_activity(&state.event_bus, "deleted", &requester.actor(), &removed);
    Ok(StatusCode::NO_CONTENT)
}
