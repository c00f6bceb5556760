use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{DocumentKind, DocumentStatus};

/// Billable document header (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub folio: String,
    pub party_id: Uuid,
    pub status: DocumentStatus,
    pub total: Decimal,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document line (for reading from DB)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentLine {
    #[serde(skip)]
    pub id: Uuid,
    #[serde(skip)]
    pub document_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Struct for inserting a document header
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub folio: String,
    pub party_id: Uuid,
    pub status: DocumentStatus,
    pub total: Decimal,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Struct for inserting a document line
#[derive(Debug, Clone)]
pub struct DocumentLineInsert {
    pub id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Insert a document header
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    doc: &NewDocument,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents
            (id, doc_type, folio, party_id, status, total, notes, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(doc.id)
    .bind(doc.kind)
    .bind(&doc.folio)
    .bind(doc.party_id)
    .bind(doc.status)
    .bind(doc.total)
    .bind(&doc.notes)
    .bind(doc.occurred_at)
    .execute(&mut **tx)
    .await?;

    Ok(doc.id)
}

/// Replace a document's lines wholesale. Lines are a child collection,
/// never diffed.
pub async fn replace_lines(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    lines: Vec<DocumentLineInsert>,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM document_lines WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO document_lines
                (id, document_id, position, description, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(line.id)
        .bind(document_id)
        .bind(line.position)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_total)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Fetch a document by id with its lines
pub async fn fetch_with_lines(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<(Document, Vec<DocumentLine>)>, sqlx::Error> {
    let Some(document) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, DocumentLine>(
        r#"
        SELECT id, document_id, position, description, quantity, unit_price, line_total
        FROM document_lines
        WHERE document_id = $1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some((document, lines)))
}

/// Find a document by id, deleted or not
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        r#"
        SELECT id, doc_type AS kind, folio, party_id, status, total, notes,
               occurred_at, is_deleted, deleted_at, created_at, updated_at
        FROM documents
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Find a document by id within a transaction
pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        r#"
        SELECT id, doc_type AS kind, folio, party_id, status, total, notes,
               occurred_at, is_deleted, deleted_at, created_at, updated_at
        FROM documents
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Fetch a document's lines within a transaction (for audit snapshots)
pub async fn fetch_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> Result<Vec<DocumentLine>, sqlx::Error> {
    sqlx::query_as::<_, DocumentLine>(
        r#"
        SELECT id, document_id, position, description, quantity, unit_price, line_total
        FROM document_lines
        WHERE document_id = $1
        ORDER BY position
        "#,
    )
    .bind(document_id)
    .fetch_all(&mut **tx)
    .await
}

/// Update a document header after line recomputation
pub async fn update_header(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: DocumentStatus,
    total: Decimal,
    notes: Option<&str>,
    occurred_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE documents
        SET status = $2, total = $3, notes = $4, occurred_at = $5, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(total)
    .bind(notes)
    .bind(occurred_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Cancel a document: status cancelled plus soft-delete flags
pub async fn cancel(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE documents
        SET status = 'cancelled', is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Reactivate a cancelled document: clear flags, restore confirmed status
pub async fn reactivate(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE documents
        SET status = 'confirmed', is_deleted = FALSE, deleted_at = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
