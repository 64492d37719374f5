mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use makerspace::authz::Scope;

fn item_body(uuid: &str, name: &str) -> Value {
    json!({
        "item_obj": {
            "uuid": uuid,
            "name": name,
            "role": "T",
            "access_type": "CHECKOUT_IN_SPACE",
            "locations": [
                { "room": "cage", "container": "drawer 4", "quantity": 3 },
                { "room": "front desk", "quantity": -1 }
            ],
            "reorder_url": "https://example.com/reorder",
            "serial_number": "SN-77",
            "keywords": ["electronics"],
            "authorized_roles": ["R-STEWARD"]
        }
    })
}

#[tokio::test]
async fn create_then_duplicate_is_409() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;

    let (status, body) = app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Multimeter"))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uuid"], "I1");
    assert_eq!(body["locations"][1]["quantity"], -1);
    assert_eq!(app.count("inventory_locations").await?, 2);

    let (status, _) = app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Other"))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn invalid_items_are_400() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;

    let mut body = item_body("I1", "Multimeter");
    body["item_obj"]["kit_contents"] = json!(["I2"]);
    let (status, _) = app.send("POST", "/inventory", Some("ADMIN"), Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = item_body("I1", "Multimeter");
    body["item_obj"]["role"] = json!("X");
    let (status, _) = app.send("POST", "/inventory", Some("ADMIN"), Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.count("inventory_items").await?, 0);
    Ok(())
}

#[tokio::test]
async fn list_and_get_need_get_inventory() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("STAFF", &[Scope::GetInventory]).await?;
    app.seed_user("KIOSK", &[Scope::GetPublicInventory]).await?;
    app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I2", "Soldering iron"))).await?;
    app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Multimeter"))).await?;

    let (status, body) = app.send("GET", "/inventory", Some("STAFF"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Multimeter", "Soldering iron"]);

    let (status, body) = app.send("GET", "/inventory/I2", Some("STAFF"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serial_number"], "SN-77");

    let (status, _) = app.send("GET", "/inventory/GHOST", Some("STAFF"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/inventory", Some("KIOSK"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("GET", "/inventory/I2", Some("KIOSK"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn public_view_hides_reorder_details() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("KIOSK", &[Scope::GetPublicInventory]).await?;
    app.seed_user("NOBODY", &[Scope::GetSchedules]).await?;
    app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Multimeter"))).await?;

    let (status, body) = app.send("GET", "/inventory/public", Some("KIOSK"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let item = &body[0];
    assert_eq!(item["name"], "Multimeter");
    assert_eq!(item["locations"][0]["room"], "cage");
    assert!(item.get("reorder_url").is_none());
    assert!(item.get("serial_number").is_none());
    assert!(item.get("authorized_roles").is_none());

    let (status, _) = app.send("GET", "/inventory/public", Some("NOBODY"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn put_replaces_the_item_under_the_path_uuid() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("EDITOR", &[Scope::UpdateItem]).await?;
    app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Multimeter"))).await?;

    let mut body = item_body("OTHER", "Multimeter (Fluke)");
    body["item_obj"]["locations"] = json!([{ "room": "shop", "quantity": 1 }]);
    let (status, updated) = app.send("PUT", "/inventory/I1", Some("EDITOR"), Some(body.clone())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["uuid"], "I1");
    assert_eq!(updated["name"], "Multimeter (Fluke)");
    assert_eq!(updated["locations"].as_array().map(Vec::len), Some(1));
    assert_eq!(app.count("inventory_locations").await?, 1);
    assert_eq!(app.count("inventory_items").await?, 1);

    let (status, _) = app.send("PUT", "/inventory/GHOST", Some("EDITOR"), Some(body)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count("inventory_items").await?, 1);
    Ok(())
}

#[tokio::test]
async fn delete_is_204_then_404() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("STAFF", &[Scope::GetInventory, Scope::CreateItem]).await?;
    app.send("POST", "/inventory", Some("ADMIN"), Some(item_body("I1", "Multimeter"))).await?;

    let (status, _) = app.send("DELETE", "/inventory/I1", Some("STAFF"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", "/inventory/I1", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.count("inventory_locations").await?, 0);

    let (status, _) = app.send("DELETE", "/inventory/I1", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
