use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{authorize, Requester, Scope};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::extract::AppJson;
use crate::models::schedule::{Schedule, Shift, ShiftBody, ShiftEventBody, ShiftEventType};
use crate::store;
use crate::utils::now_ts;

#[utoipa::path(
    get,
    path = "/schedules/current/shifts/by/user/{user_uuid}",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "Assignee")),
    responses(
        (status = 200, description = "Shifts in the current schedule assigned to the user", body = [Shift]),
        (status = 403, description = "Not this user and no get_shifts", body = ErrorResponse),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn current_shifts_for_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<Json<Vec<Shift>>> {
    authorize(
        &state,
        &requester,
        "current_shifts_for_user",
        &[Some(Scope::GetShifts), requester.if_self(&user_uuid, Scope::GetOwnShift)],
    )
    .await?;
    let schedule = store::schedules::current_schedule(&state.pool, now_ts()).await?;
    Ok(Json(schedule.shifts_assigned_to(&user_uuid)))
}

#[utoipa::path(
    get,
    path = "/schedules/current/drops/by/user/{user_uuid}",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "User who dropped")),
    responses(
        (status = 200, description = "Current shifts the user has dropped", body = [Shift]),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn current_drops_for_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<Json<Vec<Shift>>> {
    authorize(
        &state,
        &requester,
        "current_drops_for_user",
        &[
            Some(Scope::GetShifts),
            Some(Scope::GetUserDroppedShifts),
            requester.if_self(&user_uuid, Scope::GetOwnShift),
        ],
    )
    .await?;
    let schedule = store::schedules::current_schedule(&state.pool, now_ts()).await?;
    Ok(Json(schedule.shifts_with_event_by(&user_uuid, ShiftEventType::Drop)))
}

#[utoipa::path(
    get,
    path = "/schedules/current/pickups/by/user/{user_uuid}",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(("user_uuid" = String, Path, description = "User who picked up")),
    responses(
        (status = 200, description = "Current shifts the user has picked up", body = [Shift]),
        (status = 404, description = "No current schedule", body = ErrorResponse)
    )
)]
pub async fn current_pickups_for_user(
    State(state): State<AppState>,
    requester: Requester,
    Path(user_uuid): Path<String>,
) -> AppResult<Json<Vec<Shift>>> {
    authorize(
        &state,
        &requester,
        "current_pickups_for_user",
        &[
            Some(Scope::GetShifts),
            Some(Scope::GetUserPickedUpShifts),
            requester.if_self(&user_uuid, Scope::GetOwnShift),
        ],
    )
    .await?;
    let schedule = store::schedules::current_schedule(&state.pool, now_ts()).await?;
    Ok(Json(schedule.shifts_with_event_by(&user_uuid, ShiftEventType::Pickup)))
}

#[utoipa::path(
    post,
    path = "/schedules/{schedule_uuid}/shifts",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(("schedule_uuid" = String, Path, description = "Schedule uuid")),
    request_body = ShiftBody,
    responses(
        (status = 201, description = "Shift added, updated schedule returned", body = Schedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse),
        (status = 409, description = "Shift uuid already exists", body = ErrorResponse)
    )
)]
pub async fn create_shift(
    State(state): State<AppState>,
    requester: Requester,
    Path(schedule_uuid): Path<String>,
    body: Result<AppJson<ShiftBody>, AppError>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    authorize(
        &state,
        &requester,
        "create_shift",
        &[Some(Scope::CreateShift), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let AppJson(body) = body?;
    let schedule = store::schedules::create_shift(&state.pool, &schedule_uuid, &body.shift_obj).await?;
    log_activity(&state.event_bus, "shift_created", &requester.actor(), &schedule);
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/schedules/{schedule_uuid}/shifts/{shift_uuid}",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(
        ("schedule_uuid" = String, Path, description = "Schedule uuid"),
        ("shift_uuid" = String, Path, description = "Shift uuid")
    ),
    request_body = ShiftBody,
    responses(
        (status = 200, description = "Shift updated", body = Schedule),
        (status = 404, description = "Schedule or shift not found", body = ErrorResponse)
    )
)]
pub async fn update_shift(
    State(state): State<AppState>,
    requester: Requester,
    Path((schedule_uuid, shift_uuid)): Path<(String, String)>,
    body: Result<AppJson<ShiftBody>, AppError>,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "update_shift",
        &[Some(Scope::UpdateShift), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let AppJson(body) = body?;
    let schedule =
        store::schedules::update_shift(&state.pool, &schedule_uuid, &shift_uuid, &body.shift_obj).await?;
    log_activity(&state.event_bus, "shift_updated", &requester.actor(), &schedule);
    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{schedule_uuid}/shifts/{shift_uuid}",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(
        ("schedule_uuid" = String, Path, description = "Schedule uuid"),
        ("shift_uuid" = String, Path, description = "Shift uuid")
    ),
    responses(
        (status = 200, description = "Shift removed, updated schedule returned", body = Schedule),
        (status = 404, description = "Schedule or shift not found", body = ErrorResponse)
    )
)]
pub async fn delete_shift(
    State(state): State<AppState>,
    requester: Requester,
    Path((schedule_uuid, shift_uuid)): Path<(String, String)>,
) -> AppResult<Json<Schedule>> {
    authorize(
        &state,
        &requester,
        "delete_shift",
        &[Some(Scope::DeleteShift), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let schedule = store::schedules::delete_shift(&state.pool, &schedule_uuid, &shift_uuid).await?;
    log_activity(&state.event_bus, "shift_deleted", &requester.actor(), &schedule);
    Ok(Json(schedule))
}

#[utoipa::path(
    patch,
    path = "/schedules/{schedule_uuid}/shifts/{shift_uuid}/event",
    tag = "Shifts",
    security(("requesting_uuid" = [])),
    params(
        ("schedule_uuid" = String, Path, description = "Schedule uuid"),
        ("shift_uuid" = String, Path, description = "Shift uuid")
    ),
    request_body = ShiftEventBody,
    responses(
        (status = 201, description = "Event appended to the shift history", body = Schedule),
        (status = 404, description = "Schedule or shift not found", body = ErrorResponse)
    )
)]
pub async fn add_shift_event(
    State(state): State<AppState>,
    requester: Requester,
    Path((schedule_uuid, shift_uuid)): Path<(String, String)>,
    body: Result<AppJson<ShiftEventBody>, AppError>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    authorize(
        &state,
        &requester,
        "add_shift_event",
        &[Some(Scope::PostShiftEvent), Some(Scope::UpdateSchedule)],
    )
    .await?;
    let AppJson(body) = body?;
    let event = body.event_obj;
    let schedule = store::schedules::add_shift_event(&state.pool, &schedule_uuid, &shift_uuid, &event).await?;
    log_activity(&state.event_bus, event.event_type.as_str(), &requester.actor(), &schedule);
    Ok((StatusCode::CREATED, Json(schedule)))
}
