use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The `section_type` of transactions that were not preceded by a `!Type:` header.
pub const UNKNOWN_SECTION: &str = "Unknown";

/// A transaction record. Only transactions with both a date and an amount survive parsing, but
/// both stay optional here to mirror the nullable columns they are loaded into.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub id: i64,
    /// The label of the enclosing `!Type:` header, or `Unknown`.
    pub section_type: String,
    pub date: Option<NaiveDate>,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub amount: Option<Decimal>,
    pub cleared_status: Option<String>,
    /// Check number or other reference, from the `N` field.
    pub reference_number: Option<String>,
    pub category_label: Option<String>,
    pub splits: Vec<Split>,
}

impl Transaction {
    /// The date as an ISO `YYYY-MM-DD` string.
    pub fn date_iso(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// A portion of a transaction's amount allocated to a category.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Split {
    /// Numbered across the whole parse, not per transaction.
    pub id: i64,
    pub parent_transaction_id: i64,
    pub category_label: Option<String>,
    pub amount: Option<Decimal>,
    pub memo: Option<String>,
}

/// The field codes that can appear in a transaction record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionField {
    Date,
    Payee,
    Memo,
    Amount,
    ClearedStatus,
    ReferenceNumber,
    Category,
    /// `S`: opens a new split.
    SplitCategory,
    /// `$`: the amount of the most recently opened split.
    SplitAmount,
    /// `E`: the memo of the most recently opened split.
    SplitMemo,
}

serde_plain::derive_display_from_serialize!(TransactionField);

impl TransactionField {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'D' => Some(TransactionField::Date),
            'P' => Some(TransactionField::Payee),
            'M' => Some(TransactionField::Memo),
            'T' => Some(TransactionField::Amount),
            'C' => Some(TransactionField::ClearedStatus),
            'N' => Some(TransactionField::ReferenceNumber),
            'L' => Some(TransactionField::Category),
            'S' => Some(TransactionField::SplitCategory),
            '$' => Some(TransactionField::SplitAmount),
            'E' => Some(TransactionField::SplitMemo),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_codes() {
        assert_eq!(
            TransactionField::from_code('$'),
            Some(TransactionField::SplitAmount)
        );
        assert_eq!(
            TransactionField::from_code('N'),
            Some(TransactionField::ReferenceNumber)
        );
        // `U` is a duplicate amount field in some exports and is not read.
        assert_eq!(TransactionField::from_code('U'), None);
    }

    #[test]
    fn date_iso_formats_zero_padded() {
        let t = Transaction {
            date: NaiveDate::from_ymd_opt(2023, 2, 3),
            ..Default::default()
        };
        assert_eq!(t.date_iso().as_deref(), Some("2023-02-03"));
        assert_eq!(Transaction::default().date_iso(), None);
    }
}
