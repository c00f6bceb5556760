use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{PaymentDirection, PaymentMethod};

/// Payment model (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub party_id: Uuid,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Struct for inserting a payment
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub party_id: Uuid,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Insert a payment
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    payment: &NewPayment,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, document_id, party_id, direction, method, amount,
             reference, notes, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(payment.id)
    .bind(payment.document_id)
    .bind(payment.party_id)
    .bind(payment.direction)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(&payment.reference)
    .bind(&payment.notes)
    .bind(payment.occurred_at)
    .execute(&mut **tx)
    .await?;

    Ok(payment.id)
}

/// Find a payment by id within a transaction
pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, document_id, party_id, direction, method, amount,
               reference, notes, occurred_at, is_deleted, deleted_at,
               created_at, updated_at
        FROM payments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Find a payment by id
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, document_id, party_id, direction, method, amount,
               reference, notes, occurred_at, is_deleted, deleted_at,
               created_at, updated_at
        FROM payments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Update a payment's mutable fields
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    method: PaymentMethod,
    amount: Decimal,
    reference: Option<&str>,
    notes: Option<&str>,
    occurred_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET method = $2, amount = $3, reference = $4, notes = $5,
            occurred_at = $6, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(method)
    .bind(amount)
    .bind(reference)
    .bind(notes)
    .bind(occurred_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Sum the amounts of active payments against a document in one direction,
/// optionally excluding one payment (a payment edit must not count its own
/// previous amount against its headroom).
pub async fn sum_active_for_document(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    direction: PaymentDirection,
    exclude: Option<Uuid>,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM payments
        WHERE document_id = $1
          AND direction = $2
          AND NOT is_deleted
          AND ($3::uuid IS NULL OR id <> $3)
        "#,
    )
    .bind(document_id)
    .bind(direction)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await
}

/// Pool variant of [`sum_active_for_document`] for read-only balance queries
pub async fn sum_active_for_document_pool(
    pool: &PgPool,
    document_id: Uuid,
    direction: PaymentDirection,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM payments
        WHERE document_id = $1
          AND direction = $2
          AND NOT is_deleted
        "#,
    )
    .bind(document_id)
    .bind(direction)
    .fetch_one(pool)
    .await
}

/// List ids of a document's still-active payments
pub async fn list_active_ids_for_document(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM payments
        WHERE document_id = $1 AND NOT is_deleted
        ORDER BY occurred_at, created_at
        "#,
    )
    .bind(document_id)
    .fetch_all(&mut **tx)
    .await
}

/// Soft-delete one payment
pub async fn soft_delete(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Soft-delete a set of payments in one statement
pub async fn soft_delete_many(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE payments
        SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
        WHERE id = ANY($1) AND NOT is_deleted
        "#,
    )
    .bind(ids)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}
