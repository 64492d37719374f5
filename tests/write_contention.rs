mod common;

use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;

use common::{current_schedule_body, event_body, shift_body, TestApp};
use makerspace::events;

// Each mutation publishes an audit event, so the listener is writing
// `activity_log` while the next request opens its own transaction.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn back_to_back_mutations_never_fail_with_a_lock_error() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;

    let mut mutations = 0;
    for round in 0..10 {
        let schedule = format!("SC{round}");
        let shift = format!("S{round}");

        let (status, body) = app
            .send("POST", "/schedules", Some("ADMIN"), Some(current_schedule_body(&schedule)))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "round {round} schedule: {body}");

        let (status, body) = app
            .send("POST", &format!("/schedules/{schedule}/shifts"), Some("ADMIN"), Some(shift_body(&shift, "U1")))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "round {round} shift: {body}");

        for n in 0..5 {
            let (status, body) = app
                .send(
                    "PATCH",
                    &format!("/schedules/{schedule}/shifts/{shift}/event"),
                    Some("ADMIN"),
                    Some(event_body("checkin", "U1", n)),
                )
                .await?;
            assert_eq!(status, StatusCode::CREATED, "round {round} event {n}: {body}");
        }
        mutations += 7;
    }

    for _ in 0..100 {
        if app.count("activity_log").await? >= mutations {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app.count("activity_log").await?, mutations);
    assert!(events::verify_chain(&app.pool).await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_event_posts_all_land() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_admin("ADMIN").await?;
    app.send("POST", "/schedules", Some("ADMIN"), Some(current_schedule_body("SC1"))).await?;
    app.send("POST", "/schedules/SC1/shifts", Some("ADMIN"), Some(shift_body("S1", "U1"))).await?;

    let mut handles = Vec::new();
    for n in 0..20 {
        let router = app.app.clone();
        handles.push(tokio::spawn(async move {
            common::send_to(router, "PATCH", "/schedules/SC1/shifts/S1/event", "ADMIN", event_body("drop", "U1", n))
                .await
        }));
    }
    for handle in handles {
        let (status, body) = handle.await??;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, schedule) = app.send("GET", "/schedules/SC1", Some("ADMIN"), None).await?;
    assert_eq!(schedule["shifts"][0]["history"].as_array().map(Vec::len), Some(20));
    Ok(())
}
