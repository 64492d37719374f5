mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{current_schedule_body, TestApp, DAY};
use makerspace::utils::now_ts;

fn alert_body(uuid: &str, default: bool, window: Option<(i64, i64)>) -> Value {
    let mut alert = json!({
        "uuid": uuid,
        "default": default,
        "header": format!("Header {uuid}"),
        "message": "Body"
    });
    if let Some((start, end)) = window {
        alert["timestamp_start"] = json!(start);
        alert["timestamp_end"] = json!(end);
    }
    json!({ "alert_obj": alert })
}

#[tokio::test]
async fn active_alerts_are_in_window_or_default() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    let now = now_ts();

    let (status, _) = app.send("GET", "/schedules/current/alerts", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "no current schedule yet");

    app.send("POST", "/schedules", Some("ADMIN"), Some(current_schedule_body("SC1"))).await?;
    for body in [
        alert_body("NOW", false, Some((now - DAY, now + DAY))),
        alert_body("PAST", false, Some((now - 3 * DAY, now - 2 * DAY))),
        alert_body("FALLBACK", true, None),
    ] {
        let (status, _) = app.send("POST", "/schedules/SC1/alerts", Some("ADMIN"), Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    // no identity needed
    let (status, body) = app.send("GET", "/schedules/current/alerts", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    let mut uuids: Vec<String> = body
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|a| a["uuid"].as_str().map(String::from))
        .collect();
    uuids.sort();
    assert_eq!(uuids, vec!["FALLBACK".to_string(), "NOW".to_string()]);
    Ok(())
}

#[tokio::test]
async fn alert_crud_follows_shift_rules() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    let now = now_ts();
    app.send("POST", "/schedules", Some("ADMIN"), Some(current_schedule_body("SC1"))).await?;

    let window = Some((now, now + DAY));
    let (status, _) = app.send("POST", "/schedules/SC1/alerts", Some("ADMIN"), Some(alert_body("A1", false, window))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.send("POST", "/schedules/SC1/alerts", Some("ADMIN"), Some(alert_body("A1", false, window))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send("PUT", "/schedules/SC1/alerts/GHOST", Some("ADMIN"), Some(alert_body("GHOST", true, None))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count("alerts").await?, 1);

    let (status, body) = app.send("PUT", "/schedules/SC1/alerts/A1", Some("ADMIN"), Some(alert_body("X", true, None))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts"][0]["uuid"], "A1");
    assert_eq!(body["alerts"][0]["default"], true);

    let (status, body) = app.send("DELETE", "/schedules/SC1/alerts/A1", Some("ADMIN"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts"], json!([]));
    Ok(())
}

#[tokio::test]
async fn non_default_alert_needs_a_window() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.send("POST", "/schedules", Some("ADMIN"), Some(current_schedule_body("SC1"))).await?;

    let (status, _) = app.send("POST", "/schedules/SC1/alerts", Some("ADMIN"), Some(alert_body("A1", false, None))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
