//! Domain enums and service-boundary input types.
//!
//! Row structs live next to their repositories; what's here is shared by
//! repos, services, and the consuming application layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document kind enum matching database document_kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "document_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SalesNote,
    SupplierPurchase,
    Quotation,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SalesNote => "sales_note",
            Self::SupplierPurchase => "supplier_purchase",
            Self::Quotation => "quotation",
        }
    }

    /// The ledger side this kind of document posts to. Quotations are not
    /// accounting events and post nowhere.
    pub fn ledger_side(self) -> Option<LedgerSide> {
        match self {
            Self::SalesNote => Some(LedgerSide::Receivable),
            Self::SupplierPurchase => Some(LedgerSide::Payable),
            Self::Quotation => None,
        }
    }

    /// The payment direction that settles this kind of document.
    pub fn payment_direction(self) -> Option<PaymentDirection> {
        match self {
            Self::SalesNote => Some(PaymentDirection::Incoming),
            Self::SupplierPurchase => Some(PaymentDirection::Outgoing),
            Self::Quotation => None,
        }
    }
}

/// Document status enum matching database document_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Payment direction enum matching database payment_direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "payment_direction", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Incoming,
    Outgoing,
}

/// Payment method enum matching database payment_method
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Credit,
    Exchange,
}

/// Ledger side enum matching database ledger_side
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "ledger_side", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerSide {
    Receivable,
    Payable,
}

/// Ledger source enum matching database ledger_source
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "ledger_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    Document,
    Payment,
}

/// How a document names its party: an existing registered party, or the
/// system walk-in customer materialized on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartySelector {
    Existing(Uuid),
    WalkIn,
}

/// One document line as submitted by the caller. Lines are a child
/// collection fully replaced on every save, never diffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input for creating a billable document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub kind: DocumentKind,
    pub party: PartySelector,
    pub status: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
}

/// Input for updating a billable document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub status: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
}

/// Input for creating or updating a payment against a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}
