use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The (kind, year, month) scope a folio sequence is counted within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioScope {
    pub kind: String,
    pub year: i32,
    pub month: u32,
}

impl FolioScope {
    /// Derive the scope an issuance falls into from its occurrence date.
    pub fn for_date(kind: &str, date: NaiveDate) -> Self {
        Self {
            kind: kind.to_string(),
            year: date.year(),
            month: date.month(),
        }
    }
}

/// An issued folio: the sequence number plus the scope it was issued in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folio {
    pub scope: FolioScope,
    pub number: i64,
}

impl Folio {
    /// Human-readable form: `YYYY-MM-NN`, sequence zero-padded to at least
    /// two digits and growing naturally past 99.
    pub fn formatted(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.scope.year, self.scope.month, self.number
        )
    }
}

impl std::fmt::Display for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> FolioScope {
        FolioScope {
            kind: "sales_note".to_string(),
            year: 2025,
            month: 6,
        }
    }

    #[test]
    fn test_formatted_pads_to_two_digits() {
        let folio = Folio {
            scope: scope(),
            number: 1,
        };
        assert_eq!(folio.formatted(), "2025-06-01");
    }

    #[test]
    fn test_formatted_grows_past_two_digits() {
        let folio = Folio {
            scope: scope(),
            number: 123,
        };
        assert_eq!(folio.formatted(), "2025-06-123");
    }

    #[test]
    fn test_scope_for_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 17).expect("valid date");
        let derived = FolioScope::for_date("quotation", date);
        assert_eq!(derived.kind, "quotation");
        assert_eq!(derived.year, 2025);
        assert_eq!(derived.month, 6);
    }

    #[test]
    fn test_display_matches_formatted() {
        let folio = Folio {
            scope: scope(),
            number: 42,
        };
        assert_eq!(folio.to_string(), folio.formatted());
    }
}
