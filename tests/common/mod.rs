#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use makerspace::authz::Scope;
use makerspace::{create_app, db};
use makerspace::models::role::Role;
use makerspace::models::user::UserInput;
use makerspace::store;
use makerspace::utils::now_ts;

pub const DAY: i64 = 24 * 60 * 60;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempdir().context("failed to create tempdir")?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true);
        let pool = db::connect_with(opts).await?;

        let migrator =
            sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
                .await?;
        migrator.run(&pool).await?;

        let app = create_app(pool.clone()).await?;
        Ok(Self { app, pool, _dir: dir })
    }

    /// Send a request as `requester` (None sends no identity header).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        requester: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let headers: Vec<(&str, &str)> = requester.map(|r| vec![("requesting_uuid", r)]).unwrap_or_default();
        self.send_with_headers(method, uri, &headers, body).await
    }

    pub async fn send_with_headers(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        send_request(self.app.clone(), method, uri, headers, body).await
    }

    /// A user holding one role with exactly `scopes`.
    pub async fn seed_user(&self, uuid: &str, scopes: &[Scope]) -> Result<()> {
        let role = Role {
            uuid: format!("role-{uuid}"),
            title: format!("{uuid} role"),
            description: None,
            color: "#000000".to_string(),
            scopes: scopes.to_vec(),
            default: false,
        };
        store::roles::create_role(&self.pool, &role).await?;
        store::users::create_user(&self.pool, &user_input(uuid), now_ts()).await?;
        store::users::grant_role(&self.pool, uuid, &role.uuid, now_ts()).await?;
        Ok(())
    }

    pub async fn seed_admin(&self, uuid: &str) -> Result<()> {
        self.seed_user(uuid, &[Scope::Admin]).await
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        Ok(sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?)
    }
}

pub fn user_input(uuid: &str) -> UserInput {
    UserInput {
        uuid: uuid.to_string(),
        name: format!("User {uuid}"),
        email: format!("{}@example.edu", uuid.to_lowercase()),
        college_id: String::new(),
    }
}

/// A schedule whose range covers now.
pub fn current_schedule_body(uuid: &str) -> Value {
    let now = now_ts();
    json!({
        "schedule_obj": {
            "uuid": uuid,
            "timestamp_start": now - DAY,
            "timestamp_end": now + 30 * DAY,
            "shifts": [],
            "alerts": []
        }
    })
}

pub fn shift_body(uuid: &str, assignee: &str) -> Value {
    json!({
        "shift_obj": {
            "uuid": uuid,
            "day": 1,
            "sec_start": 36000,
            "sec_end": 43200,
            "assignee": assignee
        }
    })
}

pub fn event_body(event_type: &str, initiator: &str, timestamp: i64) -> Value {
    json!({
        "event_obj": {
            "timestamp": timestamp,
            "shift_date": 0,
            "type": event_type,
            "initiator": initiator
        }
    })
}

/// Send as `requester` on a cloned router, for requests spawned onto other tasks.
pub async fn send_to(
    app: Router,
    method: &str,
    uri: &str,
    requester: &str,
    body: Value,
) -> Result<(StatusCode, Value)> {
    send_request(app, method, uri, &[("requesting_uuid", requester)], Some(body)).await
}

async fn send_request(
    app: Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("non-json body: {}", String::from_utf8_lossy(&bytes)))?
    };
    Ok((status, value))
}
