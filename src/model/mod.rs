//! Types that represent the core data model: `Account`, `Category`, `Transaction` and `Split`.
mod account;
mod category;
mod transaction;

pub use account::{Account, AccountField};
pub use category::{Category, CategoryField};
use serde::{Deserialize, Serialize};
pub use transaction::{Split, Transaction, TransactionField, UNKNOWN_SECTION};

/// Everything produced by one parse pass over a QIF file.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QifData {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    /// Transactions in file order, each owning its splits.
    pub transactions: Vec<Transaction>,
}

impl QifData {
    /// Iterates over the splits of all transactions, in id order.
    pub fn splits(&self) -> impl Iterator<Item = &Split> {
        self.transactions.iter().flat_map(|t| t.splits.iter())
    }
}

/// Row counts written by one load.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct LoadCounts {
    pub accounts: u64,
    pub categories: u64,
    pub transactions: u64,
    pub splits: u64,
}
