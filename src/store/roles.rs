use sqlx::{SqliteConnection, SqlitePool};

use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::role::{DbRole, Role};
use crate::store::{conflict_on_unique, parse_scopes};

const SELECT_ROLE: &str = "SELECT uuid, title, description, color, is_default FROM roles";

async fn hydrate(conn: &mut SqliteConnection, row: DbRole) -> AppResult<Role> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT scope FROM role_scopes WHERE role_uuid = ? ORDER BY scope ASC")
            .bind(&row.uuid)
            .fetch_all(&mut *conn)
            .await?;
    Ok(row.into_role(parse_scopes(names)))
}

async fn require(conn: &mut SqliteConnection, role_uuid: &str) -> AppResult<Role> {
    let row = sqlx::query_as::<_, DbRole>(&format!("{SELECT_ROLE} WHERE uuid = ?"))
        .bind(role_uuid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("role `{role_uuid}` not found")))?;
    hydrate(conn, row).await
}

pub(crate) async fn exists(conn: &mut SqliteConnection, role_uuid: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM roles WHERE uuid = ?")
        .bind(role_uuid)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn write_scopes(conn: &mut SqliteConnection, role: &Role) -> AppResult<()> {
    sqlx::query("DELETE FROM role_scopes WHERE role_uuid = ?")
        .bind(&role.uuid)
        .execute(&mut *conn)
        .await?;
    for scope in &role.scopes {
        sqlx::query("INSERT OR IGNORE INTO role_scopes (role_uuid, scope) VALUES (?, ?)")
            .bind(&role.uuid)
            .bind(scope.as_str())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn insert(conn: &mut SqliteConnection, role: &Role) -> AppResult<()> {
    sqlx::query("INSERT INTO roles (uuid, title, description, color, is_default) VALUES (?, ?, ?, ?, ?)")
        .bind(&role.uuid)
        .bind(&role.title)
        .bind(&role.description)
        .bind(&role.color)
        .bind(role.default)
        .execute(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, format!("role `{}` already exists", role.uuid)))?;
    write_scopes(conn, role).await
}

pub async fn list_roles(pool: &SqlitePool) -> AppResult<Vec<Role>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, DbRole>(&format!("{SELECT_ROLE} ORDER BY title ASC"))
        .fetch_all(&mut *conn)
        .await?;

    let mut roles = Vec::with_capacity(rows.len());
    for row in rows {
        roles.push(hydrate(&mut conn, row).await?);
    }
    Ok(roles)
}

pub async fn get_role(pool: &SqlitePool, role_uuid: &str) -> AppResult<Role> {
    let mut conn = pool.acquire().await?;
    require(&mut conn, role_uuid).await
}

pub async fn create_role(pool: &SqlitePool, role: &Role) -> AppResult<Role> {
    role.validate()?;
    let mut tx = begin_write(pool).await?;
    insert(&mut tx, role).await?;
    let created = require(&mut tx, &role.uuid).await?;
    tx.commit().await?;
    Ok(created)
}

pub async fn update_role(pool: &SqlitePool, role_uuid: &str, role: &Role) -> AppResult<Role> {
    let role = Role {
        uuid: role_uuid.to_string(),
        ..role.clone()
    };
    role.validate()?;

    let mut tx = begin_write(pool).await?;
    require(&mut tx, role_uuid).await?;
    sqlx::query("UPDATE roles SET title = ?, description = ?, color = ?, is_default = ? WHERE uuid = ?")
        .bind(&role.title)
        .bind(&role.description)
        .bind(&role.color)
        .bind(role.default)
        .bind(role_uuid)
        .execute(&mut *tx)
        .await?;
    write_scopes(&mut tx, &role).await?;

    let updated = require(&mut tx, role_uuid).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Users' role logs are left in place; they no longer grant anything.
pub async fn delete_role(pool: &SqlitePool, role_uuid: &str) -> AppResult<Role> {
    let mut tx = begin_write(pool).await?;
    let role = require(&mut tx, role_uuid).await?;
    sqlx::query("DELETE FROM roles WHERE uuid = ?")
        .bind(role_uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(role)
}
