//! Validation logic for document and payment inputs.
//!
//! Every rule here fails before any write happens; validation errors are
//! surfaced to the caller with a human-readable message and never silently
//! corrected.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DocumentStatus, DocumentUpdate, LineInput, PaymentInput};

/// Validation errors surfaced to callers of the lifecycle services
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Party not found: {0}")]
    PartyNotFound(Uuid),

    #[error("Party {0} has been deleted")]
    PartyDeleted(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document {0} is cancelled and cannot be modified")]
    DocumentCancelled(Uuid),

    #[error("Document {0} is not cancelled; nothing to reactivate")]
    DocumentNotCancelled(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Document must have at least one line")]
    NoLines,

    #[error("Line {0}: description cannot be empty")]
    EmptyLineDescription(usize),

    #[error("Line {0}: quantity must be positive, got {1}")]
    NonPositiveQuantity(usize, Decimal),

    #[error("Line {0}: unit price must not be negative, got {1}")]
    NegativeUnitPrice(usize, Decimal),

    #[error("Payment amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Amount exceeds pending balance: submitted {submitted}, pending {available}")]
    AmountExceedsBalance {
        submitted: Decimal,
        available: Decimal,
    },

    #[error("Documents of kind {0} do not accept payments")]
    PaymentsNotAccepted(&'static str),

    #[error("Invalid status change: {from} -> {to}")]
    InvalidStatusChange {
        from: &'static str,
        to: &'static str,
    },
}

/// Validate the line collection shared by create and update inputs.
///
/// # Validation Rules
///
/// - At least one line
/// - Each line: non-empty description, positive quantity, non-negative
///   unit price (free giveaway lines are legitimate)
pub fn validate_lines(lines: &[LineInput]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::NoLines);
    }

    for (idx, line) in lines.iter().enumerate() {
        if line.description.trim().is_empty() {
            return Err(ValidationError::EmptyLineDescription(idx));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity(idx, line.quantity));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitPrice(idx, line.unit_price));
        }
    }

    Ok(())
}

/// Validate a document creation status: anything but cancelled.
pub fn validate_create_status(status: DocumentStatus) -> Result<(), ValidationError> {
    if status == DocumentStatus::Cancelled {
        return Err(ValidationError::InvalidStatusChange {
            from: "new",
            to: status.as_str(),
        });
    }
    Ok(())
}

/// Validate a status transition on update.
///
/// Allowed: staying put, and draft -> confirmed. Cancellation and
/// reactivation go through their dedicated operations so the cascade and
/// audit semantics cannot be bypassed.
pub fn validate_status_change(
    from: DocumentStatus,
    update: &DocumentUpdate,
) -> Result<(), ValidationError> {
    let to = update.status;
    let allowed = from == to || (from == DocumentStatus::Draft && to == DocumentStatus::Confirmed);
    if !allowed {
        return Err(ValidationError::InvalidStatusChange {
            from: from.as_str(),
            to: to.as_str(),
        });
    }
    Ok(())
}

/// Validate a payment input's amount.
pub fn validate_payment_input(input: &PaymentInput) -> Result<(), ValidationError> {
    if input.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(input.amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    fn valid_lines() -> Vec<LineInput> {
        vec![LineInput {
            description: "Ficus 3L pot".to_string(),
            quantity: dec("4"),
            unit_price: dec("80.00"),
        }]
    }

    #[test]
    fn test_valid_lines_pass() {
        assert!(validate_lines(&valid_lines()).is_ok());
    }

    #[test]
    fn test_empty_lines_rejected() {
        assert_eq!(validate_lines(&[]), Err(ValidationError::NoLines));
    }

    #[test]
    fn test_blank_description_rejected() {
        let mut lines = valid_lines();
        lines[0].description = "   ".to_string();
        assert_eq!(
            validate_lines(&lines),
            Err(ValidationError::EmptyLineDescription(0))
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut lines = valid_lines();
        lines[0].quantity = Decimal::ZERO;
        assert_eq!(
            validate_lines(&lines),
            Err(ValidationError::NonPositiveQuantity(0, Decimal::ZERO))
        );
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let mut lines = valid_lines();
        lines[0].unit_price = dec("-1.00");
        assert_eq!(
            validate_lines(&lines),
            Err(ValidationError::NegativeUnitPrice(0, dec("-1.00")))
        );
    }

    #[test]
    fn test_zero_unit_price_allowed() {
        let mut lines = valid_lines();
        lines[0].unit_price = Decimal::ZERO;
        assert!(validate_lines(&lines).is_ok());
    }

    #[test]
    fn test_create_status_cancelled_rejected() {
        assert!(validate_create_status(DocumentStatus::Cancelled).is_err());
        assert!(validate_create_status(DocumentStatus::Draft).is_ok());
        assert!(validate_create_status(DocumentStatus::Confirmed).is_ok());
    }

    fn update_with_status(status: DocumentStatus) -> DocumentUpdate {
        DocumentUpdate {
            status,
            occurred_at: Utc::now(),
            notes: None,
            lines: valid_lines(),
        }
    }

    #[test]
    fn test_draft_to_confirmed_allowed() {
        let update = update_with_status(DocumentStatus::Confirmed);
        assert!(validate_status_change(DocumentStatus::Draft, &update).is_ok());
    }

    #[test]
    fn test_confirmed_to_draft_rejected() {
        let update = update_with_status(DocumentStatus::Draft);
        assert_eq!(
            validate_status_change(DocumentStatus::Confirmed, &update),
            Err(ValidationError::InvalidStatusChange {
                from: "confirmed",
                to: "draft",
            })
        );
    }

    #[test]
    fn test_cancel_via_update_rejected() {
        let update = update_with_status(DocumentStatus::Cancelled);
        assert_eq!(
            validate_status_change(DocumentStatus::Confirmed, &update),
            Err(ValidationError::InvalidStatusChange {
                from: "confirmed",
                to: "cancelled",
            })
        );
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        let input = PaymentInput {
            method: PaymentMethod::Cash,
            amount: Decimal::ZERO,
            occurred_at: Utc::now(),
            reference: None,
            notes: None,
        };
        assert_eq!(
            validate_payment_input(&input),
            Err(ValidationError::NonPositiveAmount(Decimal::ZERO))
        );
    }

    #[test]
    fn test_amount_exceeds_balance_message() {
        let err = ValidationError::AmountExceedsBalance {
            submitted: dec("700.00"),
            available: dec("600.00"),
        };
        assert!(err.to_string().contains("exceeds pending balance"));
        assert!(err.to_string().contains("700.00"));
    }
}
