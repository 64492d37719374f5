mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use makerspace::authz::Scope;

fn user_body(uuid: &str, email: &str) -> Value {
    json!({ "user_obj": { "uuid": uuid, "name": format!("User {uuid}"), "email": email } })
}

fn role_body(uuid: &str, scopes: &[&str], default: bool) -> Value {
    json!({
        "role_obj": {
            "uuid": uuid,
            "title": format!("Role {uuid}"),
            "color": "#123456",
            "scopes": scopes,
            "default": default
        }
    })
}

fn scopes_of(body: &Value) -> Vec<String> {
    body["scopes"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.as_str().map(String::from))
        .collect()
}

#[tokio::test]
async fn initialize_admin_works_once() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .send("POST", "/users/initialize_admin", None, Some(user_body("FIRST", "first@example.edu")))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["active_roles"].as_array().map(Vec::len), Some(1));

    let (status, body) = app.send("GET", "/users/self/scopes", Some("FIRST"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scopes_of(&body), vec!["admin".to_string()]);

    let (status, _) = app
        .send("POST", "/users/initialize_admin", None, Some(user_body("SECOND", "second@example.edu")))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.count("users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn new_users_receive_default_roles() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;

    let (status, _) = app
        .send("POST", "/users/roles", Some("ADMIN"), Some(role_body("MEMBER", &["get_public_schedule"], true)))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send("POST", "/users", Some("ADMIN"), Some(user_body("U1", "u1@example.edu"))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["active_roles"][0]["role_uuid"], "MEMBER");

    let (status, body) = app.send("GET", "/users/self/scopes", Some("U1"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scopes_of(&body), vec!["get_public_schedule".to_string()]);

    let (status, _) = app.send("POST", "/users", Some("ADMIN"), Some(user_body("U1", "other@example.edu"))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.send("POST", "/users", Some("ADMIN"), Some(user_body("U2", "u1@example.edu"))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn self_routes_read_the_caller() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_user("U1", &[]).await?;
    app.seed_user("U2", &[]).await?;

    let (status, body) = app.send("GET", "/users/self", Some("U1"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uuid"], "U1");

    let (status, _) = app.send("GET", "/users/U1", Some("U1"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("GET", "/users/U2", Some("U1"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("GET", "/users/self", Some("NOBODY"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn updating_yourself_cannot_touch_roles() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_user("U1", &[Scope::UpdateSelf]).await?;
    app.seed_user("U2", &[]).await?;

    let mut body = user_body("U1", "renamed@example.edu");
    body["user_obj"]["active_roles"] = json!([{ "role_uuid": "role-ADMIN", "timestamp_gained": 0 }]);
    let (status, updated) = app.send("PUT", "/users/U1", Some("U1"), Some(body)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["email"], "renamed@example.edu");
    assert_eq!(updated["active_roles"].as_array().map(Vec::len), Some(1));
    assert_eq!(updated["active_roles"][0]["role_uuid"], "role-U1");

    let (status, _) = app.send("PUT", "/users/U2", Some("U1"), Some(user_body("U2", "x@example.edu"))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn grant_and_revoke_move_roles_between_lists() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("U1", &[]).await?;
    app.send("POST", "/users/roles", Some("ADMIN"), Some(role_body("STEWARD", &["get_shifts"], false)))
        .await?;

    let (status, body) = app.send("POST", "/users/U1/roles/STEWARD", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_roles"].as_array().map(Vec::len), Some(2));

    let (_, body) = app.send("GET", "/users/self/scopes", Some("U1"), None).await?;
    assert_eq!(scopes_of(&body), vec!["get_shifts".to_string()]);

    let (status, body) = app.send("DELETE", "/users/U1/roles/STEWARD", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_roles"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["past_roles"][0]["role_uuid"], "STEWARD");

    let (status, _) = app.send("DELETE", "/users/U1/roles/STEWARD", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("POST", "/users/U1/roles/GHOST", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn role_crud() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;

    let (status, _) = app
        .send("POST", "/users/roles", Some("ADMIN"), Some(role_body("R1", &["get_users"], false)))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send("POST", "/users/roles", Some("ADMIN"), Some(role_body("R1", &["get_users"], false)))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send("PUT", "/users/roles/R1", Some("ADMIN"), Some(role_body("R1", &["get_users", "create_user"], false)))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scopes"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.send("GET", "/users/roles", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::OK);
    // the admin role seeded for ADMIN plus R1
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, _) = app.send("DELETE", "/users/roles/R1", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send("GET", "/users/roles/R1", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn scope_catalogue_needs_a_role_scope() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_user("VIEWER", &[Scope::GetRoles]).await?;
    app.seed_user("U1", &[Scope::GetUsers]).await?;

    let (status, body) = app.send("GET", "/scopes", Some("VIEWER"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .map(|defs| defs.iter().filter_map(|d| d["scope"].as_str()).collect())
        .unwrap_or_default();
    assert!(names.contains(&"admin"));
    assert!(names.contains(&"post_shift_event"));

    let (status, _) = app.send("GET", "/scopes", Some("U1"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn users_can_be_found_by_email_and_college_id() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.seed_user("DESK", &[Scope::GetUsers]).await?;
    app.seed_user("NOBODY", &[Scope::GetRoles]).await?;

    let body = json!({
        "user_obj": { "uuid": "U1", "name": "Ada", "email": "ada@example.edu", "college_id": "40123456" }
    });
    let (status, _) = app.send("POST", "/users", Some("ADMIN"), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, found) = app.send("GET", "/users/by/email/ada@example.edu", Some("DESK"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["uuid"], "U1");

    let (status, found) = app.send("GET", "/users/by/id/40123456", Some("DESK"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["email"], "ada@example.edu");

    let (status, _) = app.send("GET", "/users/by/email/ghost@example.edu", Some("DESK"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("GET", "/users/by/id/99999999", Some("DESK"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/users/by/email/ada@example.edu", Some("NOBODY"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("GET", "/users/by/id/40123456", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
