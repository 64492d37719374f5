use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::begin_write;
use crate::errors::AppResult;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: Option<String>,
    pub subject: Option<String>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: impl Into<String>, actor: Option<String>, subject: Option<String>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor,
            subject,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    pub severity: Severity,
}

/// Publish `<entity>.<action>` for `entity` on the bus.
pub fn log_activity<T: Loggable>(event_bus: &EventBus, action: &str, actor: &str, entity: &T) {
    log_activity_with_old(event_bus, action, actor, entity, None);
}

/// Like [`log_activity`], also recording the state before the change.
pub fn log_activity_with_old<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor: &str,
    entity: &T,
    old_entity: Option<&T>,
) {
    let name = format!("{}.{}", T::entity_type(), action);
    let payload = ActivityPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        severity: entity.severity_for_action(action),
    };

    let event = DomainEvent::new(
        name,
        Some(actor.to_string()),
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    // No receivers only means the listener is gone; the request still succeeds.
    let _ = event_bus.send(serde_json::to_value(event).unwrap_or_default());
}

fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Drain the bus into `activity_log`, chaining each row's hash to the previous one.
pub async fn start_activity_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("Activity listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity listener lagged behind the event bus");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(e) = record_event(&pool, &event).await {
            tracing::error!("Failed to save activity log: {}", e);
        }
    }
    tracing::info!("Activity listener stopped");
}

async fn record_event(pool: &SqlitePool, event: &Value) -> AppResult<()> {
    let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
    let actor = event.get("actor").and_then(|v| v.as_str());
    let subject = event.get("subject").and_then(|v| v.as_str());
    let occurred_at = event
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
        .to_rfc3339();
    let id = event
        .get("id")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let severity = event
        .get("payload")
        .and_then(|p| p.get("severity"))
        .and_then(|s| s.as_str())
        .unwrap_or("important");
    let properties = serde_json::to_string(event).unwrap_or_default();

    let mut tx = begin_write(pool).await?;

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM activity_log ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let hash = chain_hash(prev_hash.as_deref(), &properties);

    sqlx::query(
        r#"
        INSERT INTO activity_log (id, event_name, actor, subject, occurred_at, properties, severity, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(actor)
    .bind(subject)
    .bind(&occurred_at)
    .bind(&properties)
    .bind(severity)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct ActivityEntry {
    pub id: String,
    #[schema(example = "schedule.created")]
    pub event_name: String,
    pub actor: Option<String>,
    pub subject: Option<String>,
    pub occurred_at: String,
    pub severity: String,
    pub hash: String,
}

/// Most recent entries first.
pub async fn list_activity(pool: &SqlitePool, limit: i64) -> AppResult<Vec<ActivityEntry>> {
    let rows = sqlx::query_as::<_, ActivityEntry>(
        r#"
        SELECT id, event_name, actor, subject, occurred_at, severity, hash
        FROM activity_log
        ORDER BY seq DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Recompute the hash chain. False when any row was altered or removed.
pub async fn verify_chain(pool: &SqlitePool) -> AppResult<bool> {
    let rows: Vec<(String, Option<String>, String)> =
        sqlx::query_as("SELECT properties, prev_hash, hash FROM activity_log ORDER BY seq ASC")
            .fetch_all(pool)
            .await?;

    let mut prev: Option<String> = None;
    for (properties, prev_hash, hash) in rows {
        if prev_hash != prev || chain_hash(prev.as_deref(), &properties) != hash {
            return Ok(false);
        }
        prev = Some(hash);
    }
    Ok(true)
}
