use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account defined in an `!Account` section.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Account {
    /// 1-based position of this account among the accounts of one parse pass.
    pub id: i64,
    pub name: String,
    /// The account type, e.g. `Bank`, `CCard` or `Port`.
    #[serde(rename = "type")]
    pub r#type: String,
    pub description: Option<String>,
    pub balance: Option<Decimal>,
    pub credit_limit: Option<Decimal>,
    pub note: Option<String>,
}

/// The field codes that can appear in an account record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountField {
    Name,
    Type,
    Description,
    Balance,
    CreditLimit,
    Note,
}

serde_plain::derive_display_from_serialize!(AccountField);

impl AccountField {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(AccountField::Name),
            'T' => Some(AccountField::Type),
            'D' => Some(AccountField::Description),
            'B' => Some(AccountField::Balance),
            'L' => Some(AccountField::CreditLimit),
            'A' => Some(AccountField::Note),
            _ => None,
        }
    }
}
