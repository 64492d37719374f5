use sqlx::{SqliteConnection, SqlitePool};

use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::restock::{
    DbRestockRequest, DbRestockStatusLog, RestockInput, RestockRequest, RestockStatus, RestockStatusLog,
};
use crate::store::conflict_on_unique;

const SELECT_REQUEST: &str = r#"
    SELECT uuid, item_uuid, current_quantity, quantity_requested, reason, requesting_user, current_status
    FROM restock_requests
"#;

async fn hydrate(conn: &mut SqliteConnection, row: DbRestockRequest) -> AppResult<RestockRequest> {
    let logs = sqlx::query_as::<_, DbRestockStatusLog>(
        "SELECT timestamp, status, message FROM restock_status_logs WHERE request_uuid = ? ORDER BY seq ASC",
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(RestockStatusLog::try_from)
    .collect::<AppResult<Vec<_>>>()?;

    row.into_request(logs)
}

async fn load(conn: &mut SqliteConnection, uuid: &str) -> AppResult<Option<RestockRequest>> {
    let row = sqlx::query_as::<_, DbRestockRequest>(&format!("{SELECT_REQUEST} WHERE uuid = ?"))
        .bind(uuid)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(Some(hydrate(conn, row).await?)),
        None => Ok(None),
    }
}

async fn require(conn: &mut SqliteConnection, uuid: &str) -> AppResult<RestockRequest> {
    load(conn, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("restock request `{uuid}` not found")))
}

async fn append_log(conn: &mut SqliteConnection, uuid: &str, log: &RestockStatusLog) -> AppResult<()> {
    sqlx::query("INSERT INTO restock_status_logs (request_uuid, timestamp, status, message) VALUES (?, ?, ?, ?)")
        .bind(uuid)
        .bind(log.timestamp)
        .bind(log.status.as_str())
        .bind(&log.message)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE restock_requests SET current_status = ? WHERE uuid = ?")
        .bind(log.status.as_str())
        .bind(uuid)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn list_where(pool: &SqlitePool, filter: &str, bind: Option<&str>) -> AppResult<Vec<RestockRequest>> {
    let mut conn = pool.acquire().await?;
    let sql = format!("{SELECT_REQUEST} {filter} ORDER BY rowid ASC");
    let mut query = sqlx::query_as::<_, DbRestockRequest>(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut requests = Vec::with_capacity(rows.len());
    for row in rows {
        requests.push(hydrate(&mut conn, row).await?);
    }
    Ok(requests)
}

pub async fn list_requests(pool: &SqlitePool) -> AppResult<Vec<RestockRequest>> {
    list_where(pool, "", None).await
}

pub async fn list_requests_by_user(pool: &SqlitePool, user_uuid: &str) -> AppResult<Vec<RestockRequest>> {
    list_where(pool, "WHERE requesting_user = ?", Some(user_uuid)).await
}

/// `None` when missing, so callers can authorize on the owner before answering 404.
pub async fn find_request(pool: &SqlitePool, uuid: &str) -> AppResult<Option<RestockRequest>> {
    let mut conn = pool.acquire().await?;
    load(&mut conn, uuid).await
}

/// New requests always start out `PENDING_APPROVAL`.
pub async fn create_request(pool: &SqlitePool, input: &RestockInput, now: i64) -> AppResult<RestockRequest> {
    input.validate()?;
    let mut tx = begin_write(pool).await?;

    sqlx::query(
        r#"
        INSERT INTO restock_requests
            (uuid, item_uuid, current_quantity, quantity_requested, reason, requesting_user, current_status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.uuid)
    .bind(&input.item_uuid)
    .bind(input.current_quantity)
    .bind(input.quantity_requested)
    .bind(&input.reason)
    .bind(&input.requesting_user)
    .bind(RestockStatus::PendingApproval.as_str())
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, format!("restock request `{}` already exists", input.uuid)))?;

    let initial = RestockStatusLog {
        timestamp: now,
        status: RestockStatus::PendingApproval,
        message: None,
    };
    append_log(&mut tx, &input.uuid, &initial).await?;

    let created = require(&mut tx, &input.uuid).await?;
    tx.commit().await?;
    Ok(created)
}

/// Replace the editable fields. Status and logs are kept.
pub async fn update_request(pool: &SqlitePool, uuid: &str, input: &RestockInput) -> AppResult<RestockRequest> {
    let input = RestockInput {
        uuid: uuid.to_string(),
        ..input.clone()
    };
    input.validate()?;

    let mut tx = begin_write(pool).await?;
    require(&mut tx, uuid).await?;
    sqlx::query(
        r#"
        UPDATE restock_requests
        SET item_uuid = ?, current_quantity = ?, quantity_requested = ?, reason = ?, requesting_user = ?
        WHERE uuid = ?
        "#,
    )
    .bind(&input.item_uuid)
    .bind(input.current_quantity)
    .bind(input.quantity_requested)
    .bind(&input.reason)
    .bind(&input.requesting_user)
    .bind(uuid)
    .execute(&mut *tx)
    .await?;

    let updated = require(&mut tx, uuid).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Set `current_status` and append the log entry together.
pub async fn update_status(pool: &SqlitePool, uuid: &str, log: &RestockStatusLog) -> AppResult<RestockRequest> {
    let mut tx = begin_write(pool).await?;
    let before = require(&mut tx, uuid).await?;
    append_log(&mut tx, uuid, log).await?;
    let updated = require(&mut tx, uuid).await?;
    tx.commit().await?;

    tracing::info!(
        request_uuid = uuid,
        from = %before.current_status,
        to = %updated.current_status,
        "restock status changed"
    );
    Ok(updated)
}

pub async fn delete_request(pool: &SqlitePool, uuid: &str) -> AppResult<RestockRequest> {
    let mut tx = begin_write(pool).await?;
    let request = require(&mut tx, uuid).await?;
    sqlx::query("DELETE FROM restock_requests WHERE uuid = ?")
        .bind(uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(request)
}
