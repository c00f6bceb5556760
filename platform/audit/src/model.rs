use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action kind enum matching database audit_action
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Cancel,
    Reactivate,
    SoftDelete,
}

/// Actor identity captured at the time of the action.
///
/// A value snapshot rather than a live foreign key: audit records must stay
/// readable after the actor account is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub name: String,
    pub role: String,
}

/// A single auditable value: monetary, textual, or structured.
///
/// Stored as tagged JSON in the `before`/`after` jsonb columns. Decimals
/// serialize as strings so no precision is lost in transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeValue {
    Decimal(Decimal),
    Text(String),
    Json(serde_json::Value),
}

/// One named before/after diff within an audit event.
///
/// `after = None` means "removed from active accounting" and is deliberately
/// distinct from an after value of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub field: String,
    pub before: Option<ChangeValue>,
    pub after: Option<ChangeValue>,
}

impl Change {
    /// A value that did not exist before this action.
    pub fn created(field: &str, after: ChangeValue) -> Self {
        Self {
            field: field.to_string(),
            before: None,
            after: Some(after),
        }
    }

    /// A value replaced by this action.
    pub fn updated(field: &str, before: ChangeValue, after: ChangeValue) -> Self {
        Self {
            field: field.to_string(),
            before: Some(before),
            after: Some(after),
        }
    }

    /// A value removed from active accounting by this action.
    pub fn removed(field: &str, before: ChangeValue) -> Self {
        Self {
            field: field.to_string(),
            before: Some(before),
            after: None,
        }
    }
}

/// Input for recording one audit event with its changes.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    /// Dotted event key, e.g. `sales_note.cancelled`
    pub event_key: String,
    pub action: ActionKind,
    /// Entity the mutation touched directly
    pub entity_type: String,
    pub entity_id: Uuid,
    /// Billable document the change is ultimately about
    pub root_entity_type: String,
    pub root_entity_id: Uuid,
    pub actor: ActorSnapshot,
    pub occurred_at: DateTime<Utc>,
    pub changes: Vec<Change>,
}

/// Audit event header (for reading from DB)
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_key: String,
    pub action: ActionKind,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub root_entity_type: String,
    pub root_entity_id: Uuid,
    pub actor_name: String,
    pub actor_role: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Audit change row (for reading from DB)
#[derive(Debug, Clone)]
pub struct AuditChange {
    pub id: Uuid,
    pub audit_event_id: Uuid,
    pub field: String,
    pub before: Option<ChangeValue>,
    pub after: Option<ChangeValue>,
}
