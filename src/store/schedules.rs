use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::schedule::{
    Alert, DbAlert, DbSchedule, DbShift, DbShiftEvent, Schedule, SchedulePatch, Shift, ShiftEvent,
};
use crate::store::conflict_on_unique;

// =============================================================================
// HYDRATION
// =============================================================================

async fn load(conn: &mut SqliteConnection, schedule_uuid: &str) -> AppResult<Option<Schedule>> {
    let row = sqlx::query_as::<_, DbSchedule>(
        "SELECT uuid, timestamp_start, timestamp_end, active FROM schedules WHERE uuid = ?",
    )
    .bind(schedule_uuid)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, row).await?)),
        None => Ok(None),
    }
}

async fn hydrate(conn: &mut SqliteConnection, row: DbSchedule) -> AppResult<Schedule> {
    let shift_rows = sqlx::query_as::<_, DbShift>(
        r#"
        SELECT uuid, schedule_uuid, day, sec_start, sec_end, assignee
        FROM shifts WHERE schedule_uuid = ? ORDER BY seq ASC
        "#,
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?;

    let event_rows = sqlx::query_as::<_, DbShiftEvent>(
        r#"
        SELECT e.shift_uuid, e.timestamp, e.shift_date, e.event_type, e.initiator
        FROM shift_events e
        JOIN shifts s ON s.uuid = e.shift_uuid
        WHERE s.schedule_uuid = ?
        ORDER BY e.seq ASC
        "#,
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?;

    let mut histories: HashMap<String, Vec<ShiftEvent>> = HashMap::new();
    for event in event_rows {
        let shift_uuid = event.shift_uuid.clone();
        histories.entry(shift_uuid).or_default().push(event.try_into()?);
    }

    let shifts = shift_rows
        .into_iter()
        .map(|shift| {
            let history = histories.remove(&shift.uuid).unwrap_or_default();
            shift.into_shift(history)
        })
        .collect::<AppResult<Vec<_>>>()?;

    let alerts = sqlx::query_as::<_, DbAlert>(
        r#"
        SELECT uuid, schedule_uuid, is_default, timestamp_start, timestamp_end, header, message
        FROM alerts WHERE schedule_uuid = ? ORDER BY seq ASC
        "#,
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Alert::from)
    .collect();

    Ok(Schedule {
        uuid: row.uuid,
        timestamp_start: row.timestamp_start,
        timestamp_end: row.timestamp_end,
        active: row.active,
        shifts,
        alerts,
    })
}

async fn require(conn: &mut SqliteConnection, schedule_uuid: &str) -> AppResult<Schedule> {
    load(conn, schedule_uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("schedule `{schedule_uuid}` not found")))
}

async fn shift_exists(conn: &mut SqliteConnection, shift_uuid: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM shifts WHERE uuid = ?")
        .bind(shift_uuid)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn alert_exists(conn: &mut SqliteConnection, alert_uuid: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM alerts WHERE uuid = ?")
        .bind(alert_uuid)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn insert_event(conn: &mut SqliteConnection, shift_uuid: &str, event: &ShiftEvent) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shift_events (shift_uuid, timestamp, shift_date, event_type, initiator)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(shift_uuid)
    .bind(event.timestamp)
    .bind(event.shift_date)
    .bind(event.event_type.as_str())
    .bind(&event.initiator)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_shift(conn: &mut SqliteConnection, schedule_uuid: &str, shift: &Shift) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shifts (uuid, schedule_uuid, day, sec_start, sec_end, assignee)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&shift.uuid)
    .bind(schedule_uuid)
    .bind(i64::from(shift.day))
    .bind(shift.sec_start)
    .bind(shift.sec_end)
    .bind(&shift.assignee)
    .execute(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, format!("shift `{}` already exists", shift.uuid)))?;

    for event in &shift.history {
        insert_event(conn, &shift.uuid, event).await?;
    }
    Ok(())
}

async fn insert_alert(conn: &mut SqliteConnection, schedule_uuid: &str, alert: &Alert) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO alerts (uuid, schedule_uuid, is_default, timestamp_start, timestamp_end, header, message)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&alert.uuid)
    .bind(schedule_uuid)
    .bind(alert.default)
    .bind(alert.timestamp_start)
    .bind(alert.timestamp_end)
    .bind(&alert.header)
    .bind(&alert.message)
    .execute(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, format!("alert `{}` already exists", alert.uuid)))?;
    Ok(())
}

/// Replace the children of `schedule_uuid` with the ones in `schedule`.
async fn write_children(conn: &mut SqliteConnection, schedule_uuid: &str, schedule: &Schedule) -> AppResult<()> {
    sqlx::query("DELETE FROM shifts WHERE schedule_uuid = ?")
        .bind(schedule_uuid)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM alerts WHERE schedule_uuid = ?")
        .bind(schedule_uuid)
        .execute(&mut *conn)
        .await?;

    for shift in &schedule.shifts {
        insert_shift(conn, schedule_uuid, shift).await?;
    }
    for alert in &schedule.alerts {
        insert_alert(conn, schedule_uuid, alert).await?;
    }
    Ok(())
}

// =============================================================================
// SCHEDULES
// =============================================================================

pub async fn list_schedules(pool: &SqlitePool) -> AppResult<Vec<Schedule>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, DbSchedule>(
        "SELECT uuid, timestamp_start, timestamp_end, active FROM schedules ORDER BY timestamp_start ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut schedules = Vec::with_capacity(rows.len());
    for row in rows {
        schedules.push(hydrate(&mut conn, row).await?);
    }
    Ok(schedules)
}

pub async fn get_schedule(pool: &SqlitePool, schedule_uuid: &str) -> AppResult<Schedule> {
    let mut conn = pool.acquire().await?;
    require(&mut conn, schedule_uuid).await
}

/// The schedule flagged active, else the latest-starting one whose range covers `now`.
pub async fn current_schedule(pool: &SqlitePool, now: i64) -> AppResult<Schedule> {
    let mut conn = pool.acquire().await?;
    let row = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT uuid, timestamp_start, timestamp_end, active
        FROM schedules
        WHERE active = 1 OR (timestamp_start <= ? AND ? <= timestamp_end)
        ORDER BY active DESC, timestamp_start DESC
        LIMIT 1
        "#,
    )
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => hydrate(&mut conn, row).await,
        None => Err(AppError::not_found("no current schedule")),
    }
}

pub async fn create_schedule(pool: &SqlitePool, schedule: &Schedule) -> AppResult<Schedule> {
    schedule.validate()?;
    let mut tx = begin_write(pool).await?;

    sqlx::query("INSERT INTO schedules (uuid, timestamp_start, timestamp_end, active) VALUES (?, ?, ?, 0)")
        .bind(&schedule.uuid)
        .bind(schedule.timestamp_start)
        .bind(schedule.timestamp_end)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, format!("schedule `{}` already exists", schedule.uuid)))?;

    write_children(&mut tx, &schedule.uuid, schedule).await?;
    let created = require(&mut tx, &schedule.uuid).await?;
    tx.commit().await?;

    tracing::info!(schedule_uuid = %created.uuid, shifts = created.shifts.len(), "schedule created");
    Ok(created)
}

/// Replace range, shifts and alerts. The uuid in the path and the active flag are kept.
pub async fn replace_schedule(pool: &SqlitePool, schedule_uuid: &str, mut schedule: Schedule) -> AppResult<Schedule> {
    schedule.uuid = schedule_uuid.to_string();
    schedule.validate()?;
    let mut tx = begin_write(pool).await?;
    require(&mut tx, schedule_uuid).await?;

    sqlx::query("UPDATE schedules SET timestamp_start = ?, timestamp_end = ? WHERE uuid = ?")
        .bind(schedule.timestamp_start)
        .bind(schedule.timestamp_end)
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;

    write_children(&mut tx, schedule_uuid, &schedule).await?;
    let updated = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn patch_schedule(pool: &SqlitePool, schedule_uuid: &str, patch: SchedulePatch) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let mut schedule = require(&mut tx, schedule_uuid).await?;
    let replace_children = patch.shifts.is_some() || patch.alerts.is_some();
    schedule.apply(patch);
    schedule.validate()?;

    sqlx::query("UPDATE schedules SET timestamp_start = ?, timestamp_end = ? WHERE uuid = ?")
        .bind(schedule.timestamp_start)
        .bind(schedule.timestamp_end)
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;

    if replace_children {
        write_children(&mut tx, schedule_uuid, &schedule).await?;
    }
    let updated = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Returns the removed schedule.
pub async fn delete_schedule(pool: &SqlitePool, schedule_uuid: &str) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    sqlx::query("DELETE FROM schedules WHERE uuid = ?")
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(schedule)
}

/// Mark one schedule active and clear the flag everywhere else.
pub async fn activate_schedule(pool: &SqlitePool, schedule_uuid: &str) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    require(&mut tx, schedule_uuid).await?;

    sqlx::query("UPDATE schedules SET active = (uuid = ?)")
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;

    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    tracing::info!(schedule_uuid, "schedule activated");
    Ok(schedule)
}

// =============================================================================
// SHIFTS
// =============================================================================

pub async fn create_shift(pool: &SqlitePool, schedule_uuid: &str, shift: &Shift) -> AppResult<Schedule> {
    shift.validate()?;
    let mut tx = begin_write(pool).await?;
    require(&mut tx, schedule_uuid).await?;

    if shift_exists(&mut tx, &shift.uuid).await? {
        return Err(AppError::conflict(format!("shift `{}` already exists", shift.uuid)));
    }

    insert_shift(&mut tx, schedule_uuid, shift).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

/// Overwrite day, times and assignee of an existing shift. Never inserts;
/// the shift keeps its uuid and history.
pub async fn update_shift(
    pool: &SqlitePool,
    schedule_uuid: &str,
    shift_uuid: &str,
    shift: &Shift,
) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    let existing = schedule
        .shift(shift_uuid)
        .ok_or_else(|| AppError::not_found(format!("shift `{shift_uuid}` not found")))?;

    let updated = Shift {
        uuid: existing.uuid.clone(),
        history: existing.history.clone(),
        ..shift.clone()
    };
    updated.validate()?;

    sqlx::query("UPDATE shifts SET day = ?, sec_start = ?, sec_end = ?, assignee = ? WHERE uuid = ?")
        .bind(i64::from(updated.day))
        .bind(updated.sec_start)
        .bind(updated.sec_end)
        .bind(&updated.assignee)
        .bind(shift_uuid)
        .execute(&mut *tx)
        .await?;

    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

pub async fn delete_shift(pool: &SqlitePool, schedule_uuid: &str, shift_uuid: &str) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    if schedule.shift(shift_uuid).is_none() {
        return Err(AppError::not_found(format!("shift `{shift_uuid}` not found")));
    }

    sqlx::query("DELETE FROM shifts WHERE uuid = ? AND schedule_uuid = ?")
        .bind(shift_uuid)
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;

    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

pub async fn add_shift_event(
    pool: &SqlitePool,
    schedule_uuid: &str,
    shift_uuid: &str,
    event: &ShiftEvent,
) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    if schedule.shift(shift_uuid).is_none() {
        return Err(AppError::not_found(format!("shift `{shift_uuid}` not found")));
    }

    insert_event(&mut tx, shift_uuid, event).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    tracing::debug!(schedule_uuid, shift_uuid, event_type = event.event_type.as_str(), "shift event appended");
    Ok(schedule)
}

// =============================================================================
// ALERTS
// =============================================================================

pub async fn create_alert(pool: &SqlitePool, schedule_uuid: &str, alert: &Alert) -> AppResult<Schedule> {
    alert.validate()?;
    let mut tx = begin_write(pool).await?;
    require(&mut tx, schedule_uuid).await?;

    if alert_exists(&mut tx, &alert.uuid).await? {
        return Err(AppError::conflict(format!("alert `{}` already exists", alert.uuid)));
    }

    insert_alert(&mut tx, schedule_uuid, alert).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

pub async fn update_alert(
    pool: &SqlitePool,
    schedule_uuid: &str,
    alert_uuid: &str,
    alert: &Alert,
) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    if schedule.alert(alert_uuid).is_none() {
        return Err(AppError::not_found(format!("alert `{alert_uuid}` not found")));
    }

    let updated = Alert {
        uuid: alert_uuid.to_string(),
        ..alert.clone()
    };
    updated.validate()?;

    sqlx::query(
        r#"
        UPDATE alerts
        SET is_default = ?, timestamp_start = ?, timestamp_end = ?, header = ?, message = ?
        WHERE uuid = ?
        "#,
    )
    .bind(updated.default)
    .bind(updated.timestamp_start)
    .bind(updated.timestamp_end)
    .bind(&updated.header)
    .bind(&updated.message)
    .bind(alert_uuid)
    .execute(&mut *tx)
    .await?;

    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

pub async fn delete_alert(pool: &SqlitePool, schedule_uuid: &str, alert_uuid: &str) -> AppResult<Schedule> {
    let mut tx = begin_write(pool).await?;
    let schedule = require(&mut tx, schedule_uuid).await?;
    if schedule.alert(alert_uuid).is_none() {
        return Err(AppError::not_found(format!("alert `{alert_uuid}` not found")));
    }

    sqlx::query("DELETE FROM alerts WHERE uuid = ? AND schedule_uuid = ?")
        .bind(alert_uuid)
        .bind(schedule_uuid)
        .execute(&mut *tx)
        .await?;

    let schedule = require(&mut tx, schedule_uuid).await?;
    tx.commit().await?;
    Ok(schedule)
}

/// Alerts of the current schedule that are in their window at `now`, plus defaults.
pub async fn active_alerts(pool: &SqlitePool, now: i64) -> AppResult<Vec<Alert>> {
    let schedule = current_schedule(pool, now).await?;
    Ok(schedule.alerts_at(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::ShiftEventType;
    use sqlx::migrate::Migrator;
    use std::path::Path;

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display());
        let pool = crate::db::connect(&url).await.unwrap();
        let migrator = Migrator::new(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")))
            .await
            .unwrap();
        migrator.run(&pool).await.unwrap();
        (pool, dir)
    }

    fn schedule(uuid: &str, start: i64, end: i64) -> Schedule {
        Schedule {
            uuid: uuid.into(),
            timestamp_start: start,
            timestamp_end: end,
            active: false,
            shifts: vec![],
            alerts: vec![],
        }
    }

    fn shift(uuid: &str, assignee: &str) -> Shift {
        Shift {
            uuid: uuid.into(),
            day: 2,
            sec_start: 36_000,
            sec_end: 39_600,
            assignee: assignee.into(),
            history: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_shift_is_a_conflict_and_leaves_schedule_unchanged() {
        let (pool, _dir) = test_pool().await;
        create_schedule(&pool, &schedule("SC1", 0, 1_000)).await.unwrap();
        create_shift(&pool, "SC1", &shift("S1", "U1")).await.unwrap();

        let err = create_shift(&pool, "SC1", &shift("S1", "U2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = get_schedule(&pool, "SC1").await.unwrap();
        assert_eq!(stored.shifts.len(), 1);
        assert_eq!(stored.shifts[0].assignee, "U1");
    }

    #[tokio::test]
    async fn update_keeps_uuid_and_history_and_never_upserts() {
        let (pool, _dir) = test_pool().await;
        create_schedule(&pool, &schedule("SC1", 0, 1_000)).await.unwrap();
        create_shift(&pool, "SC1", &shift("S1", "U1")).await.unwrap();
        let event = ShiftEvent {
            timestamp: 5,
            shift_date: 0,
            event_type: ShiftEventType::Drop,
            initiator: "U1".into(),
        };
        add_shift_event(&pool, "SC1", "S1", &event).await.unwrap();

        let updated = update_shift(&pool, "SC1", "S1", &shift("OTHER", "U2")).await.unwrap();
        assert_eq!(updated.shifts.len(), 1);
        assert_eq!(updated.shifts[0].uuid, "S1");
        assert_eq!(updated.shifts[0].assignee, "U2");
        assert_eq!(updated.shifts[0].history, vec![event]);

        let err = update_shift(&pool, "SC1", "MISSING", &shift("MISSING", "U2")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(get_schedule(&pool, "SC1").await.unwrap().shifts.len(), 1);
    }

    #[tokio::test]
    async fn activation_is_exclusive() {
        let (pool, _dir) = test_pool().await;
        create_schedule(&pool, &schedule("SC1", 0, 100)).await.unwrap();
        create_schedule(&pool, &schedule("SC2", 200, 300)).await.unwrap();

        activate_schedule(&pool, "SC1").await.unwrap();
        activate_schedule(&pool, "SC2").await.unwrap();

        assert!(!get_schedule(&pool, "SC1").await.unwrap().active);
        assert_eq!(current_schedule(&pool, 50).await.unwrap().uuid, "SC2");
    }

    #[tokio::test]
    async fn current_falls_back_to_the_covering_range() {
        let (pool, _dir) = test_pool().await;
        create_schedule(&pool, &schedule("SC1", 0, 100)).await.unwrap();

        assert_eq!(current_schedule(&pool, 50).await.unwrap().uuid, "SC1");
        assert!(matches!(current_schedule(&pool, 500).await, Err(AppError::NotFound(_))));
    }
}
