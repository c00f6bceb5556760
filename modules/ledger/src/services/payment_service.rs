//! Payment lifecycle service.
//!
//! Creates, updates, and soft-deletes payments against billable documents.
//! The balance guard re-reads the current aggregate inside the same
//! transaction as the write, so concurrent edits to one document's payments
//! cannot oversettle it.

use chrono::Utc;
use platform_audit::{ActionKind, ActorSnapshot, Change, ChangeValue, NewAuditEvent};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{DocumentStatus, LedgerSource, PaymentDirection, PaymentInput};
use crate::repos::{document_repo, ledger_repo, payment_repo};
use crate::services::balance_service::{self, BalanceError};
use crate::validation::{self, ValidationError};

/// Errors that can occur during payment lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit trail write failed: {0}")]
    Audit(#[from] platform_audit::AuditError),
}

/// Result type for payment lifecycle operations
pub type PaymentResult<T> = Result<T, PaymentError>;

impl From<BalanceError> for PaymentError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Validation(e) => PaymentError::Validation(e),
            BalanceError::Database(e) => PaymentError::Database(e),
        }
    }
}

/// Create a payment against a document.
///
/// The submitted amount must not exceed the document's remaining balance,
/// checked against a fresh in-transaction aggregate. On success the
/// payment's reducing ledger entry is upserted and the audit record carries
/// the amount plus the balance movement as one combined change row.
pub async fn create_payment(
    pool: &PgPool,
    actor: &ActorSnapshot,
    document_id: Uuid,
    input: &PaymentInput,
) -> PaymentResult<Uuid> {
    validation::validate_payment_input(input)?;

    let mut tx = pool.begin().await?;

    let (document, direction) = fetch_payable_document(&mut tx, document_id).await?;

    let before = balance_service::compute_balance_tx(&mut tx, document_id, None).await?;
    if input.amount > before.balance {
        return Err(ValidationError::AmountExceedsBalance {
            submitted: input.amount,
            available: before.balance,
        }
        .into());
    }

    let payment_id = Uuid::new_v4();
    payment_repo::insert(
        &mut tx,
        &payment_repo::NewPayment {
            id: payment_id,
            document_id,
            party_id: document.party_id,
            direction,
            method: input.method,
            amount: input.amount,
            reference: input.reference.clone(),
            notes: input.notes.clone(),
            occurred_at: input.occurred_at,
        },
    )
    .await?;

    upsert_payment_entry(&mut tx, &document, payment_id, input).await?;

    let new_balance = before.balance - input.amount;
    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: "payment.created".to_string(),
            action: ActionKind::Create,
            entity_type: "payment".to_string(),
            entity_id: payment_id,
            root_entity_type: "document".to_string(),
            root_entity_id: document_id,
            actor: actor.clone(),
            occurred_at: input.occurred_at,
            changes: vec![
                Change::created("amount", ChangeValue::Decimal(input.amount)),
                Change::updated(
                    "balance",
                    ChangeValue::Decimal(before.balance),
                    ChangeValue::Decimal(new_balance),
                ),
            ],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        document_id = %document_id,
        amount = %input.amount,
        new_balance = %new_balance,
        "Payment created"
    );

    Ok(payment_id)
}

/// Update a payment.
///
/// The balance guard excludes the payment being edited, so raising a
/// payment up to the document's full total is allowed while anything beyond
/// it is rejected.
pub async fn update_payment(
    pool: &PgPool,
    actor: &ActorSnapshot,
    payment_id: Uuid,
    input: &PaymentInput,
) -> PaymentResult<()> {
    validation::validate_payment_input(input)?;

    let mut tx = pool.begin().await?;

    let payment = fetch_active_payment(&mut tx, payment_id).await?;
    let (document, _) = fetch_payable_document(&mut tx, payment.document_id).await?;

    let headroom =
        balance_service::compute_balance_tx(&mut tx, payment.document_id, Some(payment_id))
            .await?;
    if input.amount > headroom.balance {
        return Err(ValidationError::AmountExceedsBalance {
            submitted: input.amount,
            available: headroom.balance,
        }
        .into());
    }

    payment_repo::update(
        &mut tx,
        payment_id,
        input.method,
        input.amount,
        input.reference.as_deref(),
        input.notes.as_deref(),
        input.occurred_at,
    )
    .await?;

    upsert_payment_entry(&mut tx, &document, payment_id, input).await?;

    let old_balance = floored(headroom.total, headroom.paid + payment.amount);
    let new_balance = floored(headroom.total, headroom.paid + input.amount);
    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: "payment.updated".to_string(),
            action: ActionKind::Update,
            entity_type: "payment".to_string(),
            entity_id: payment_id,
            root_entity_type: "document".to_string(),
            root_entity_id: payment.document_id,
            actor: actor.clone(),
            occurred_at: input.occurred_at,
            changes: vec![
                Change::updated(
                    "amount",
                    ChangeValue::Decimal(payment.amount),
                    ChangeValue::Decimal(input.amount),
                ),
                Change::updated(
                    "balance",
                    ChangeValue::Decimal(old_balance),
                    ChangeValue::Decimal(new_balance),
                ),
            ],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        document_id = %payment.document_id,
        old_amount = %payment.amount,
        new_amount = %input.amount,
        "Payment updated"
    );

    Ok(())
}

/// Soft-delete a payment and its ledger entry.
pub async fn soft_delete_payment(
    pool: &PgPool,
    actor: &ActorSnapshot,
    payment_id: Uuid,
) -> PaymentResult<()> {
    let mut tx = pool.begin().await?;

    let payment = fetch_active_payment(&mut tx, payment_id).await?;

    let before = balance_service::compute_balance_tx(&mut tx, payment.document_id, None).await?;

    payment_repo::soft_delete(&mut tx, payment_id).await?;
    ledger_repo::soft_delete_for_source(&mut tx, LedgerSource::Payment, payment_id).await?;

    let new_balance = floored(before.total, before.paid - payment.amount);
    platform_audit::record(
        &mut tx,
        NewAuditEvent {
            event_key: "payment.deleted".to_string(),
            action: ActionKind::SoftDelete,
            entity_type: "payment".to_string(),
            entity_id: payment_id,
            root_entity_type: "document".to_string(),
            root_entity_id: payment.document_id,
            actor: actor.clone(),
            occurred_at: Utc::now(),
            changes: vec![
                Change::removed("amount", ChangeValue::Decimal(payment.amount)),
                Change::updated(
                    "balance",
                    ChangeValue::Decimal(before.balance),
                    ChangeValue::Decimal(new_balance),
                ),
            ],
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        document_id = %payment.document_id,
        amount = %payment.amount,
        new_balance = %new_balance,
        "Payment soft-deleted"
    );

    Ok(())
}

/// Upsert the reducing ledger entry for a payment: negative signed amount
/// on the document's own side, so a party statement sums to the net
/// position.
async fn upsert_payment_entry(
    tx: &mut Transaction<'_, Postgres>,
    document: &document_repo::Document,
    payment_id: Uuid,
    input: &PaymentInput,
) -> Result<(), sqlx::Error> {
    // A payable direction implies a ledger side; quotations were rejected
    // before any write.
    let Some(side) = document.kind.ledger_side() else {
        return Ok(());
    };

    ledger_repo::upsert_entry(
        tx,
        &ledger_repo::LedgerEntryUpsert {
            party_id: document.party_id,
            side,
            source_type: LedgerSource::Payment,
            source_id: payment_id,
            amount: -input.amount,
            reference: document.folio.clone(),
            notes: input.notes.clone(),
            occurred_at: input.occurred_at,
        },
    )
    .await?;

    Ok(())
}

async fn fetch_active_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> PaymentResult<payment_repo::Payment> {
    let payment = payment_repo::find_by_id_tx(tx, payment_id)
        .await?
        .ok_or(ValidationError::PaymentNotFound(payment_id))?;

    if payment.is_deleted {
        return Err(ValidationError::PaymentNotFound(payment_id).into());
    }

    Ok(payment)
}

/// Fetch a document payments may be applied to: it must exist, be active,
/// and be of a kind that accepts payments.
async fn fetch_payable_document(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> PaymentResult<(document_repo::Document, PaymentDirection)> {
    let document = document_repo::find_by_id_tx(tx, document_id)
        .await?
        .ok_or(ValidationError::DocumentNotFound(document_id))?;

    if document.is_deleted || document.status == DocumentStatus::Cancelled {
        return Err(ValidationError::DocumentCancelled(document_id).into());
    }

    let direction = document
        .kind
        .payment_direction()
        .ok_or(ValidationError::PaymentsNotAccepted(document.kind.as_str()))?;

    Ok((document, direction))
}

fn floored(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}
