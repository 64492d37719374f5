use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::{Scope, ScopeSet};
use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::models::user::{DbRoleLog, DbUser, RoleLog, User, UserInput};
use crate::store::{conflict_on_unique, parse_scopes, roles};

async fn load(conn: &mut SqliteConnection, user_uuid: &str) -> AppResult<Option<User>> {
    let row = sqlx::query_as::<_, DbUser>("SELECT uuid, name, email, college_id FROM users WHERE uuid = ?")
        .bind(user_uuid)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, row).await?)),
        None => Ok(None),
    }
}

async fn hydrate(conn: &mut SqliteConnection, row: DbUser) -> AppResult<User> {
    let logs: Vec<RoleLog> = sqlx::query_as::<_, DbRoleLog>(
        r#"
        SELECT role_uuid, timestamp_gained, timestamp_revoked
        FROM role_logs WHERE user_uuid = ? ORDER BY seq ASC
        "#,
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(RoleLog::from)
    .collect();

    Ok(row.into_user(logs))
}

async fn require(conn: &mut SqliteConnection, user_uuid: &str) -> AppResult<User> {
    load(conn, user_uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user `{user_uuid}` not found")))
}

async fn insert(conn: &mut SqliteConnection, input: &UserInput) -> AppResult<()> {
    sqlx::query("INSERT INTO users (uuid, name, email, college_id) VALUES (?, ?, ?, ?)")
        .bind(&input.uuid)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.college_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, format!("user `{}` or email `{}` already exists", input.uuid, input.email)))?;
    Ok(())
}

async fn grant(conn: &mut SqliteConnection, user_uuid: &str, role_uuid: &str, now: i64) -> AppResult<bool> {
    let active: Option<i64> = sqlx::query_scalar(
        "SELECT seq FROM role_logs WHERE user_uuid = ? AND role_uuid = ? AND timestamp_revoked IS NULL",
    )
    .bind(user_uuid)
    .bind(role_uuid)
    .fetch_optional(&mut *conn)
    .await?;
    if active.is_some() {
        return Ok(false);
    }

    sqlx::query("INSERT INTO role_logs (user_uuid, role_uuid, timestamp_gained) VALUES (?, ?, ?)")
        .bind(user_uuid)
        .bind(role_uuid)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(true)
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, DbUser>("SELECT uuid, name, email, college_id FROM users ORDER BY name ASC")
        .fetch_all(&mut *conn)
        .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        users.push(hydrate(&mut conn, row).await?);
    }
    Ok(users)
}

pub async fn get_user(pool: &SqlitePool, user_uuid: &str) -> AppResult<User> {
    let mut conn = pool.acquire().await?;
    require(&mut conn, user_uuid).await
}

async fn find_by(pool: &SqlitePool, column: &str, value: &str) -> AppResult<Option<User>> {
    let mut conn = pool.acquire().await?;
    let sql = format!("SELECT uuid, name, email, college_id FROM users WHERE {column} = ? ORDER BY uuid ASC LIMIT 1");
    let row = sqlx::query_as::<_, DbUser>(&sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(&mut conn, row).await?)),
        None => Ok(None),
    }
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<User> {
    find_by(pool, "email", email)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no user with email `{email}`")))
}

/// College ids are not unique; the lowest uuid wins. Blank ids never match.
pub async fn get_user_by_college_id(pool: &SqlitePool, college_id: &str) -> AppResult<User> {
    let found = if college_id.trim().is_empty() {
        None
    } else {
        find_by(pool, "college_id", college_id).await?
    };
    found.ok_or_else(|| AppError::not_found(format!("no user with college id `{college_id}`")))
}

/// Insert a user and grant every default role.
pub async fn create_user(pool: &SqlitePool, input: &UserInput, now: i64) -> AppResult<User> {
    input.validate()?;
    let mut tx = begin_write(pool).await?;
    insert(&mut tx, input).await?;

    let defaults: Vec<String> = sqlx::query_scalar("SELECT uuid FROM roles WHERE is_default = 1")
        .fetch_all(&mut *tx)
        .await?;
    for role_uuid in &defaults {
        grant(&mut tx, &input.uuid, role_uuid, now).await?;
    }

    let user = require(&mut tx, &input.uuid).await?;
    tx.commit().await?;
    tracing::info!(user_uuid = %user.uuid, default_roles = defaults.len(), "user created");
    Ok(user)
}

/// Update name, email and college id. Roles are untouched.
pub async fn update_user(pool: &SqlitePool, user_uuid: &str, input: &UserInput) -> AppResult<User> {
    let input = UserInput {
        uuid: user_uuid.to_string(),
        ..input.clone()
    };
    input.validate()?;

    let mut tx = begin_write(pool).await?;
    require(&mut tx, user_uuid).await?;
    sqlx::query("UPDATE users SET name = ?, email = ?, college_id = ? WHERE uuid = ?")
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.college_id)
        .bind(user_uuid)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, format!("email `{}` already in use", input.email)))?;

    let user = require(&mut tx, user_uuid).await?;
    tx.commit().await?;
    Ok(user)
}

/// Returns the removed user.
pub async fn delete_user(pool: &SqlitePool, user_uuid: &str) -> AppResult<User> {
    let mut tx = begin_write(pool).await?;
    let user = require(&mut tx, user_uuid).await?;
    sqlx::query("DELETE FROM users WHERE uuid = ?")
        .bind(user_uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(user)
}

pub async fn grant_role(pool: &SqlitePool, user_uuid: &str, role_uuid: &str, now: i64) -> AppResult<User> {
    let mut tx = begin_write(pool).await?;
    require(&mut tx, user_uuid).await?;
    if !roles::exists(&mut tx, role_uuid).await? {
        return Err(AppError::not_found(format!("role `{role_uuid}` not found")));
    }

    if !grant(&mut tx, user_uuid, role_uuid, now).await? {
        tracing::debug!(user_uuid, role_uuid, "role already active");
    }

    let user = require(&mut tx, user_uuid).await?;
    tx.commit().await?;
    Ok(user)
}

/// Stamp `timestamp_revoked` on the active log for `role_uuid`.
pub async fn revoke_role(pool: &SqlitePool, user_uuid: &str, role_uuid: &str, now: i64) -> AppResult<User> {
    let mut tx = begin_write(pool).await?;
    require(&mut tx, user_uuid).await?;

    let result = sqlx::query(
        r#"
        UPDATE role_logs SET timestamp_revoked = ?
        WHERE user_uuid = ? AND role_uuid = ? AND timestamp_revoked IS NULL
        "#,
    )
    .bind(now)
    .bind(user_uuid)
    .bind(role_uuid)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "user `{user_uuid}` does not hold role `{role_uuid}`"
        )));
    }

    let user = require(&mut tx, user_uuid).await?;
    tx.commit().await?;
    Ok(user)
}

/// Union of the scopes of every role the user currently holds.
/// Unknown users and dangling role logs resolve to nothing.
pub async fn scopes_for_user(pool: &SqlitePool, user_uuid: &str) -> AppResult<ScopeSet> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT rs.scope
        FROM role_logs rl
        JOIN role_scopes rs ON rs.role_uuid = rl.role_uuid
        WHERE rl.user_uuid = ? AND rl.timestamp_revoked IS NULL
        "#,
    )
    .bind(user_uuid)
    .fetch_all(pool)
    .await?;

    Ok(parse_scopes(names).into_iter().collect())
}

/// First-run setup: creates an `Admin` role holding `admin` and grants it to
/// `input`. Conflict once any user exists.
pub async fn initialize_admin(pool: &SqlitePool, input: &UserInput, now: i64) -> AppResult<User> {
    input.validate()?;
    let mut tx = begin_write(pool).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        return Err(AppError::conflict("an admin has already been initialized"));
    }

    let role = Role {
        uuid: uuid::Uuid::new_v4().to_string(),
        title: "Admin".to_string(),
        description: Some("Full access".to_string()),
        color: "#e74c3c".to_string(),
        scopes: vec![Scope::Admin],
        default: false,
    };
    roles::insert(&mut tx, &role).await?;
    insert(&mut tx, input).await?;
    grant(&mut tx, &input.uuid, &role.uuid, now).await?;

    let user = require(&mut tx, &input.uuid).await?;
    tx.commit().await?;
    tracing::info!(user_uuid = %user.uuid, role_uuid = %role.uuid, "admin initialized");
    Ok(user)
}
