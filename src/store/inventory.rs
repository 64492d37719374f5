use sqlx::{SqliteConnection, SqlitePool};

use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::inventory::{DbInventoryItem, InventoryItem, ItemLocation};
use crate::store::conflict_on_unique;

const SELECT_ITEM: &str = r#"
    SELECT uuid, name, long_name, role, access_type, reorder_url, serial_number,
           kit_contents, keywords, authorized_roles
    FROM inventory_items
"#;

fn json_list(values: &[String]) -> AppResult<String> {
    serde_json::to_string(values).map_err(|e| AppError::internal(format!("failed to encode list: {e}")))
}

async fn hydrate(conn: &mut SqliteConnection, row: DbInventoryItem) -> AppResult<InventoryItem> {
    let locations = sqlx::query_as::<_, ItemLocation>(
        "SELECT room, container, specific, quantity FROM inventory_locations WHERE item_uuid = ? ORDER BY seq ASC",
    )
    .bind(&row.uuid)
    .fetch_all(&mut *conn)
    .await?;

    row.into_item(locations)
}

async fn require(conn: &mut SqliteConnection, uuid: &str) -> AppResult<InventoryItem> {
    let row = sqlx::query_as::<_, DbInventoryItem>(&format!("{SELECT_ITEM} WHERE uuid = ?"))
        .bind(uuid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("item `{uuid}` not found")))?;
    hydrate(conn, row).await
}

async fn write_locations(conn: &mut SqliteConnection, item: &InventoryItem) -> AppResult<()> {
    sqlx::query("DELETE FROM inventory_locations WHERE item_uuid = ?")
        .bind(&item.uuid)
        .execute(&mut *conn)
        .await?;
    for location in &item.locations {
        sqlx::query(
            "INSERT INTO inventory_locations (item_uuid, room, container, specific, quantity) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&item.uuid)
        .bind(&location.room)
        .bind(&location.container)
        .bind(&location.specific)
        .bind(location.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn list_items(pool: &SqlitePool) -> AppResult<Vec<InventoryItem>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, DbInventoryItem>(&format!("{SELECT_ITEM} ORDER BY name ASC, uuid ASC"))
        .fetch_all(&mut *conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(hydrate(&mut conn, row).await?);
    }
    Ok(items)
}

pub async fn get_item(pool: &SqlitePool, uuid: &str) -> AppResult<InventoryItem> {
    let mut conn = pool.acquire().await?;
    require(&mut conn, uuid).await
}

pub async fn create_item(pool: &SqlitePool, item: &InventoryItem) -> AppResult<InventoryItem> {
    item.validate()?;
    let mut tx = begin_write(pool).await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_items
            (uuid, name, long_name, role, access_type, reorder_url, serial_number,
             kit_contents, keywords, authorized_roles)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.uuid)
    .bind(&item.name)
    .bind(&item.long_name)
    .bind(item.role.as_str())
    .bind(item.access_type.as_str())
    .bind(&item.reorder_url)
    .bind(&item.serial_number)
    .bind(json_list(&item.kit_contents)?)
    .bind(json_list(&item.keywords)?)
    .bind(json_list(&item.authorized_roles)?)
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, format!("item `{}` already exists", item.uuid)))?;

    write_locations(&mut tx, item).await?;
    let created = require(&mut tx, &item.uuid).await?;
    tx.commit().await?;
    Ok(created)
}

/// Replace every field and location of an existing item. The path uuid wins.
pub async fn update_item(pool: &SqlitePool, uuid: &str, item: &InventoryItem) -> AppResult<InventoryItem> {
    let item = InventoryItem {
        uuid: uuid.to_string(),
        ..item.clone()
    };
    item.validate()?;

    let mut tx = begin_write(pool).await?;
    require(&mut tx, uuid).await?;
    sqlx::query(
        r#"
        UPDATE inventory_items
        SET name = ?, long_name = ?, role = ?, access_type = ?, reorder_url = ?, serial_number = ?,
            kit_contents = ?, keywords = ?, authorized_roles = ?
        WHERE uuid = ?
        "#,
    )
    .bind(&item.name)
    .bind(&item.long_name)
    .bind(item.role.as_str())
    .bind(item.access_type.as_str())
    .bind(&item.reorder_url)
    .bind(&item.serial_number)
    .bind(json_list(&item.kit_contents)?)
    .bind(json_list(&item.keywords)?)
    .bind(json_list(&item.authorized_roles)?)
    .bind(uuid)
    .execute(&mut *tx)
    .await?;

    write_locations(&mut tx, &item).await?;
    let updated = require(&mut tx, uuid).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete_item(pool: &SqlitePool, uuid: &str) -> AppResult<InventoryItem> {
    let mut tx = begin_write(pool).await?;
    let item = require(&mut tx, uuid).await?;
    sqlx::query("DELETE FROM inventory_items WHERE uuid = ?")
        .bind(uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::{ItemAccessType, ItemRole, QUANTITY_LOW};
    use sqlx::migrate::Migrator;
    use std::path::Path;

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("inventory.db").display());
        let pool = crate::db::connect(&url).await.unwrap();
        let migrator = Migrator::new(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")))
            .await
            .unwrap();
        migrator.run(&pool).await.unwrap();
        (pool, dir)
    }

    fn location(room: &str, quantity: i64) -> ItemLocation {
        ItemLocation {
            room: room.into(),
            container: Some("bin 2".into()),
            specific: None,
            quantity,
        }
    }

    fn kit(uuid: &str, contents: &[&str]) -> InventoryItem {
        InventoryItem {
            uuid: uuid.into(),
            name: format!("Kit {uuid}"),
            long_name: None,
            role: ItemRole::Kit,
            access_type: ItemAccessType::CheckoutTakeHome,
            locations: vec![location("cage", 3), location("front desk", QUANTITY_LOW)],
            reorder_url: None,
            serial_number: Some("SN-1".into()),
            kit_contents: contents.iter().map(|s| s.to_string()).collect(),
            keywords: vec!["soldering".into()],
            authorized_roles: vec!["R-STEWARD".into()],
        }
    }

    #[tokio::test]
    async fn stored_item_comes_back_whole() {
        let (pool, _dir) = test_pool().await;
        let item = kit("K1", &["I1", "I2"]);
        let created = create_item(&pool, &item).await.unwrap();
        assert_eq!(created, item);
        assert_eq!(get_item(&pool, "K1").await.unwrap(), item);

        let err = create_item(&pool, &item).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_replaces_locations_and_never_upserts() {
        let (pool, _dir) = test_pool().await;
        create_item(&pool, &kit("K1", &["I1"])).await.unwrap();

        let mut changed = kit("IGNORED", &[]);
        changed.locations = vec![location("shop", 9)];
        let updated = update_item(&pool, "K1", &changed).await.unwrap();
        assert_eq!(updated.uuid, "K1");
        assert_eq!(updated.locations, vec![location("shop", 9)]);
        assert!(updated.kit_contents.is_empty());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_locations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let err = update_item(&pool, "GHOST", &changed).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(list_items(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_locations() {
        let (pool, _dir) = test_pool().await;
        create_item(&pool, &kit("K1", &[])).await.unwrap();

        let removed = delete_item(&pool, "K1").await.unwrap();
        assert_eq!(removed.uuid, "K1");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_locations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(matches!(delete_item(&pool, "K1").await.unwrap_err(), AppError::NotFound(_)));
    }
}
