use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{AuditChange, AuditEvent, ChangeValue, NewAuditEvent};

/// Errors that can occur during audit trail operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Change value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An audit event with its changes, as read back from the trail.
#[derive(Debug, Clone)]
pub struct AuditTrailEntry {
    pub event: AuditEvent,
    pub changes: Vec<AuditChange>,
}

/// Record an audit event and its changes within the caller's transaction.
///
/// The event commits or rolls back together with the mutation it describes;
/// a failed operation leaves no trace in the trail.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    event: NewAuditEvent,
) -> Result<Uuid, AuditError> {
    let event_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO audit_events
            (id, event_key, action, entity_type, entity_id,
             root_entity_type, root_entity_id, actor_name, actor_role, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(event_id)
    .bind(&event.event_key)
    .bind(event.action)
    .bind(&event.entity_type)
    .bind(event.entity_id)
    .bind(&event.root_entity_type)
    .bind(event.root_entity_id)
    .bind(&event.actor.name)
    .bind(&event.actor.role)
    .bind(event.occurred_at)
    .execute(&mut **tx)
    .await?;

    for change in &event.changes {
        let before = change
            .before
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let after = change.after.as_ref().map(serde_json::to_value).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO audit_changes (id, audit_event_id, field, before, after)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(&change.field)
        .bind(before)
        .bind(after)
        .execute(&mut **tx)
        .await?;
    }

    tracing::debug!(
        audit_event_id = %event_id,
        event_key = %event.event_key,
        root_entity_id = %event.root_entity_id,
        change_count = event.changes.len(),
        "Audit event recorded"
    );

    Ok(event_id)
}

/// Read the full trail for a root entity, oldest first, changes included.
pub async fn find_by_root(
    pool: &PgPool,
    root_entity_type: &str,
    root_entity_id: Uuid,
) -> Result<Vec<AuditTrailEntry>, AuditError> {
    type EventRow = (
        Uuid,
        String,
        crate::model::ActionKind,
        String,
        Uuid,
        String,
        Uuid,
        String,
        String,
        chrono::DateTime<chrono::Utc>,
        chrono::DateTime<chrono::Utc>,
    );

    let event_rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT id, event_key, action, entity_type, entity_id,
               root_entity_type, root_entity_id, actor_name, actor_role,
               occurred_at, created_at
        FROM audit_events
        WHERE root_entity_type = $1 AND root_entity_id = $2
        ORDER BY occurred_at, created_at
        "#,
    )
    .bind(root_entity_type)
    .bind(root_entity_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(event_rows.len());
    for row in event_rows {
        let event = AuditEvent {
            id: row.0,
            event_key: row.1,
            action: row.2,
            entity_type: row.3,
            entity_id: row.4,
            root_entity_type: row.5,
            root_entity_id: row.6,
            actor_name: row.7,
            actor_role: row.8,
            occurred_at: row.9,
            created_at: row.10,
        };

        let changes = fetch_changes(pool, event.id).await?;
        entries.push(AuditTrailEntry { event, changes });
    }

    Ok(entries)
}

async fn fetch_changes(pool: &PgPool, event_id: Uuid) -> Result<Vec<AuditChange>, AuditError> {
    type ChangeRow = (
        Uuid,
        Uuid,
        String,
        Option<serde_json::Value>,
        Option<serde_json::Value>,
    );

    let rows = sqlx::query_as::<_, ChangeRow>(
        r#"
        SELECT id, audit_event_id, field, before, after
        FROM audit_changes
        WHERE audit_event_id = $1
        ORDER BY field
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    let mut changes = Vec::with_capacity(rows.len());
    for row in rows {
        changes.push(AuditChange {
            id: row.0,
            audit_event_id: row.1,
            field: row.2,
            before: decode_value(row.3)?,
            after: decode_value(row.4)?,
        });
    }

    Ok(changes)
}

fn decode_value(raw: Option<serde_json::Value>) -> Result<Option<ChangeValue>, AuditError> {
    raw.map(serde_json::from_value).transpose().map_err(Into::into)
}
