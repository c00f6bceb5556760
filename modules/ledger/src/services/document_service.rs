//! Document lifecycle service.
//!
//! The single place allowed to create, update, cancel, or reactivate a
//! billable document, and the only writer of the party ledger. Every
//! operation runs inside exactly one transaction: folio issuance, document
//! writes, ledger upserts, cascades, and the audit record commit or roll
//! back together.

use chrono::Utc;
use platform_audit::{ActionKind, ActorSnapshot, Change, ChangeValue, NewAuditEvent};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    DocumentInput, DocumentStatus, DocumentUpdate, LedgerSource, LineInput, PartySelector,
};
use crate::money;
use crate::repos::party_repo::{self, PartyError, WALK_IN_SYSTEM_KEY};
use crate::repos::{document_repo, ledger_repo, payment_repo};
use crate::services::cascade;
use crate::validation::{self, ValidationError};

/// Errors that can occur during document lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Folio issuance failed: {0}")]
    Numbering(#[from] numbering::NumberingError),

    #[error("Audit trail write failed: {0}")]
    Audit(#[from] platform_audit::AuditError),
}

/// Result type for document lifecycle operations
pub type DocumentResult<T> = Result<T, DocumentError>;

impl From<PartyError> for DocumentError {
    fn from(err: PartyError) -> Self {
        match err {
            PartyError::NotFound(id) => ValidationError::PartyNotFound(id).into(),
            PartyError::Deleted(id) => ValidationError::PartyDeleted(id).into(),
            // Soft-delete refusal never comes out of a lookup; keep the
            // message if it ever does.
            PartyError::SystemReserved(id) => ValidationError::PartyDeleted(id).into(),
            PartyError::Database(e) => DocumentError::Database(e),
        }
    }
}

/// Create a billable document.
///
/// Resolves the party (materializing the walk-in customer for anonymous
/// sales), recomputes line totals, issues a folio, writes the document and
/// its ledger entry, and records the audit event with no before values.
pub async fn create_document(
    pool: &PgPool,
    actor: &ActorSnapshot,
    input: &DocumentInput,
) -> DocumentResult<Uuid> {
    validation::validate_lines(&input.lines)?;
    validation::validate_create_status(input.status)?;

    let mut tx = pool.begin().await?;

    let party = match input.party {
        PartySelector::Existing(party_id) => {
            party_repo::find_active_by_id_tx(&mut tx, party_id).await?
        }
        PartySelector::WalkIn => {
            party_repo::find_or_create_system(&mut tx, WALK_IN_SYSTEM_KEY, "Walk-in customer")
                .await?
        }
    };

    let total = money::document_total(&input.lines);
    let folio = numbering::issue(&mut tx, input.kind.as_str(), input.occurred_at.date_naive())
        .await?
        .formatted();

    let document_id = Uuid::new_v4();
    document_repo::insert(
        &mut tx,
        &document_repo::NewDocument {
            id: document_id,
            kind: input.kind,
            folio: folio.clone(),
            party_id: party.id,
            status: input.status,
            total,
            notes: input.notes.clone(),
            occurred_at: input.occurred_at,
        },
    )
    .await?;

    document_repo::replace_lines(&mut tx, document_id, line_inserts(&input.lines)).await?;

    if let Some(side) = input.kind.ledger_side() {
        ledger_repo::upsert_entry(
            &mut tx,
            &ledger_repo::LedgerEntryUpsert {
                party_id: party.id,
                side,
                source_type: LedgerSource::Document,
                source_id: document_id,
                amount: total,
                reference: folio.clone(),
                notes: input.notes.clone(),
                occurred_at: input.occurred_at,
            },
        )
        .await?;
    }

    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: format!("{}.created", input.kind.as_str()),
            action: ActionKind::Create,
            entity_type: "document".to_string(),
            entity_id: document_id,
            root_entity_type: "document".to_string(),
            root_entity_id: document_id,
            actor: actor.clone(),
            occurred_at: input.occurred_at,
            changes: vec![Change::created("total", ChangeValue::Decimal(total))],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        document_id = %document_id,
        kind = input.kind.as_str(),
        folio = %folio,
        party_id = %party.id,
        total = %total,
        "Document created"
    );

    Ok(document_id)
}

/// Update a billable document.
///
/// Lines are replaced wholesale and the total recomputed; the ledger upsert
/// reuses the document's (source_type, source_id) key so the same ledger
/// row is updated in place rather than duplicated.
pub async fn update_document(
    pool: &PgPool,
    actor: &ActorSnapshot,
    document_id: Uuid,
    update: &DocumentUpdate,
) -> DocumentResult<()> {
    validation::validate_lines(&update.lines)?;

    let mut tx = pool.begin().await?;

    let document = fetch_active_document(&mut tx, document_id).await?;
    validation::validate_status_change(document.status, update)?;

    let old_total = document.total;
    let old_lines = document_repo::fetch_lines_tx(&mut tx, document_id).await?;

    let new_total = money::document_total(&update.lines);
    document_repo::update_header(
        &mut tx,
        document_id,
        update.status,
        new_total,
        update.notes.as_deref(),
        update.occurred_at,
    )
    .await?;
    document_repo::replace_lines(&mut tx, document_id, line_inserts(&update.lines)).await?;

    if let Some(side) = document.kind.ledger_side() {
        ledger_repo::upsert_entry(
            &mut tx,
            &ledger_repo::LedgerEntryUpsert {
                party_id: document.party_id,
                side,
                source_type: LedgerSource::Document,
                source_id: document_id,
                amount: new_total,
                reference: document.folio.clone(),
                notes: update.notes.clone(),
                occurred_at: update.occurred_at,
            },
        )
        .await?;
    }

    let new_lines = document_repo::fetch_lines_tx(&mut tx, document_id).await?;
    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: format!("{}.updated", document.kind.as_str()),
            action: ActionKind::Update,
            entity_type: "document".to_string(),
            entity_id: document_id,
            root_entity_type: "document".to_string(),
            root_entity_id: document_id,
            actor: actor.clone(),
            occurred_at: update.occurred_at,
            changes: vec![
                Change::updated(
                    "total",
                    ChangeValue::Decimal(old_total),
                    ChangeValue::Decimal(new_total),
                ),
                Change::updated(
                    "lines",
                    ChangeValue::Json(
                        serde_json::to_value(&old_lines)
                            .map_err(platform_audit::AuditError::Serialization)?,
                    ),
                    ChangeValue::Json(
                        serde_json::to_value(&new_lines)
                            .map_err(platform_audit::AuditError::Serialization)?,
                    ),
                ),
            ],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        document_id = %document_id,
        folio = %document.folio,
        old_total = %old_total,
        new_total = %new_total,
        "Document updated"
    );

    Ok(())
}

/// Cancel a billable document.
///
/// Soft-deletes the document, cascades to its still-active payments and to
/// the ledger entries of the document and those payments, and records an
/// audit event whose after value is absent: removal from active accounting,
/// not a zero total.
pub async fn cancel_document(
    pool: &PgPool,
    actor: &ActorSnapshot,
    document_id: Uuid,
) -> DocumentResult<()> {
    let mut tx = pool.begin().await?;

    let document = fetch_active_document(&mut tx, document_id).await?;

    let targets = cascade::cancellation_targets(&mut tx, document_id).await?;

    document_repo::cancel(&mut tx, document_id).await?;
    payment_repo::soft_delete_many(&mut tx, &targets.payment_ids).await?;
    ledger_repo::soft_delete_for_source(&mut tx, LedgerSource::Document, document_id).await?;
    let payment_entries =
        ledger_repo::soft_delete_for_payment_sources(&mut tx, &targets.payment_ids).await?;

    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: format!("{}.cancelled", document.kind.as_str()),
            action: ActionKind::Cancel,
            entity_type: "document".to_string(),
            entity_id: document_id,
            root_entity_type: "document".to_string(),
            root_entity_id: document_id,
            actor: actor.clone(),
            occurred_at: Utc::now(),
            changes: vec![Change::removed(
                "total",
                ChangeValue::Decimal(document.total),
            )],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        document_id = %document_id,
        folio = %document.folio,
        cascaded_payments = targets.payment_ids.len(),
        cascaded_payment_entries = payment_entries,
        "Document cancelled"
    );

    Ok(())
}

/// Reactivate a cancelled document.
///
/// Clears the soft-delete flags, restores confirmed status, and re-upserts
/// the document's ledger entry. Previously soft-deleted payments and their
/// ledger entries stay deleted: reactivation restores the debt, not payment
/// history that may have been refunded through other means since.
pub async fn reactivate_document(
    pool: &PgPool,
    actor: &ActorSnapshot,
    document_id: Uuid,
) -> DocumentResult<()> {
    let mut tx = pool.begin().await?;

    let document = document_repo::find_by_id_tx(&mut tx, document_id)
        .await?
        .ok_or(ValidationError::DocumentNotFound(document_id))?;

    if document.status != DocumentStatus::Cancelled {
        return Err(ValidationError::DocumentNotCancelled(document_id).into());
    }

    // The debt has to land on a party that still exists
    party_repo::find_active_by_id_tx(&mut tx, document.party_id).await?;

    document_repo::reactivate(&mut tx, document_id).await?;

    if let Some(side) = document.kind.ledger_side() {
        ledger_repo::upsert_entry(
            &mut tx,
            &ledger_repo::LedgerEntryUpsert {
                party_id: document.party_id,
                side,
                source_type: LedgerSource::Document,
                source_id: document_id,
                amount: document.total,
                reference: document.folio.clone(),
                notes: document.notes.clone(),
                occurred_at: document.occurred_at,
            },
        )
        .await?;
    }

    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: format!("{}.reactivated", document.kind.as_str()),
            action: ActionKind::Reactivate,
            entity_type: "document".to_string(),
            entity_id: document_id,
            root_entity_type: "document".to_string(),
            root_entity_id: document_id,
            actor: actor.clone(),
            occurred_at: Utc::now(),
            changes: vec![Change::created(
                "total",
                ChangeValue::Decimal(document.total),
            )],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        document_id = %document_id,
        folio = %document.folio,
        total = %document.total,
        "Document reactivated"
    );

    Ok(())
}

/// Fetch a document that must still be active for the operation to proceed
async fn fetch_active_document(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> DocumentResult<document_repo::Document> {
    let document = document_repo::find_by_id_tx(tx, document_id)
        .await?
        .ok_or(ValidationError::DocumentNotFound(document_id))?;

    if document.is_deleted || document.status == DocumentStatus::Cancelled {
        return Err(ValidationError::DocumentCancelled(document_id).into());
    }

    Ok(document)
}

fn line_inserts(lines: &[LineInput]) -> Vec<document_repo::DocumentLineInsert> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| document_repo::DocumentLineInsert {
            id: Uuid::new_v4(),
            position: (idx + 1) as i32,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: money::line_total(line.quantity, line.unit_price),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_party_error_maps_to_validation() {
        let id = Uuid::new_v4();
        let err: DocumentError = PartyError::NotFound(id).into();
        assert!(matches!(
            err,
            DocumentError::Validation(ValidationError::PartyNotFound(_))
        ));
    }

    #[test]
    fn test_line_inserts_number_positions_from_one() {
        let lines = vec![
            LineInput {
                description: "Rose bush".to_string(),
                quantity: Decimal::ONE,
                unit_price: Decimal::new(15000, 2),
            },
            LineInput {
                description: "Fertilizer 5kg".to_string(),
                quantity: Decimal::TWO,
                unit_price: Decimal::new(9950, 2),
            },
        ];
        let inserts = line_inserts(&lines);
        assert_eq!(inserts[0].position, 1);
        assert_eq!(inserts[1].position, 2);
        assert_eq!(inserts[1].line_total, Decimal::new(19900, 2));
    }

    #[test]
    fn test_document_error_display() {
        let err = DocumentError::Validation(ValidationError::NoLines);
        assert!(err.to_string().contains("Validation failed"));
    }
}
