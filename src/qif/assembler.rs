//! Accumulates field lines into records and commits the complete ones with surrogate ids.

use crate::model::{
    Account, AccountField, Category, CategoryField, QifData, Split, Transaction,
    TransactionField,
};
use crate::qif::normalize::{parse_amount, parse_date};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, trace};

/// An account record that has not seen its terminator yet.
#[derive(Debug, Default, Clone)]
pub(super) struct AccountDraft {
    name: Option<String>,
    r#type: Option<String>,
    description: Option<String>,
    balance: Option<Decimal>,
    credit_limit: Option<Decimal>,
    note: Option<String>,
}

impl AccountDraft {
    pub(super) fn set(&mut self, code: char, value: &str) {
        let Some(field) = AccountField::from_code(code) else {
            trace!("Ignoring account field code '{code}'");
            return;
        };
        match field {
            AccountField::Name => self.name = Some(value.to_string()),
            AccountField::Type => self.r#type = Some(value.to_string()),
            AccountField::Description => self.description = Some(value.to_string()),
            AccountField::Balance => {
                self.balance = Some(parse_amount(value).unwrap_or(Decimal::ZERO))
            }
            AccountField::CreditLimit => self.credit_limit = parse_amount(value),
            AccountField::Note => self.note = Some(value.to_string()),
        }
    }
}

/// A category record that has not seen its terminator yet.
#[derive(Debug, Default, Clone)]
pub(super) struct CategoryDraft {
    name: Option<String>,
    description: Option<String>,
    is_expense: bool,
    is_income: bool,
    is_tax_related: bool,
    tax_schedule: Option<String>,
}

impl CategoryDraft {
    pub(super) fn set(&mut self, code: char, value: &str) {
        let Some(field) = CategoryField::from_code(code) else {
            trace!("Ignoring category field code '{code}'");
            return;
        };
        match field {
            CategoryField::Name => self.name = Some(value.to_string()),
            CategoryField::Description => self.description = Some(value.to_string()),
            CategoryField::Expense => self.is_expense = true,
            CategoryField::Income => self.is_income = true,
            CategoryField::TaxRelated => self.is_tax_related = true,
            CategoryField::TaxSchedule => self.tax_schedule = Some(value.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct SplitDraft {
    category_label: Option<String>,
    amount: Option<Decimal>,
    memo: Option<String>,
}

/// A transaction record that has not seen its terminator yet.
#[derive(Debug, Default, Clone)]
pub(super) struct TransactionDraft {
    date: Option<NaiveDate>,
    payee: Option<String>,
    memo: Option<String>,
    amount: Option<Decimal>,
    cleared_status: Option<String>,
    reference_number: Option<String>,
    category_label: Option<String>,
    splits: Vec<SplitDraft>,
}

impl TransactionDraft {
    pub(super) fn set(&mut self, code: char, value: &str) {
        let Some(field) = TransactionField::from_code(code) else {
            trace!("Ignoring transaction field code '{code}'");
            return;
        };
        match field {
            TransactionField::Date => self.date = parse_date(value),
            TransactionField::Payee => self.payee = Some(value.to_string()),
            TransactionField::Memo => self.memo = Some(value.to_string()),
            TransactionField::Amount => self.amount = parse_amount(value),
            TransactionField::ClearedStatus => self.cleared_status = Some(value.to_string()),
            TransactionField::ReferenceNumber => self.reference_number = Some(value.to_string()),
            TransactionField::Category => self.category_label = Some(value.to_string()),
            TransactionField::SplitCategory => self.splits.push(SplitDraft {
                category_label: Some(value.to_string()),
                ..Default::default()
            }),
            TransactionField::SplitAmount => match self.splits.last_mut() {
                Some(split) => split.amount = parse_amount(value),
                None => trace!("Split amount with no open split"),
            },
            TransactionField::SplitMemo => match self.splits.last_mut() {
                Some(split) => split.memo = Some(value.to_string()),
                None => trace!("Split memo with no open split"),
            },
        }
    }
}

/// Owns the entities of one parse pass and hands out their ids.
#[derive(Debug)]
pub(super) struct Assembler {
    data: QifData,
    last_split_id: i64,
}

impl Assembler {
    pub(super) fn new() -> Self {
        Self {
            data: QifData::default(),
            last_split_id: 0,
        }
    }

    pub(super) fn commit_account(&mut self, draft: AccountDraft) {
        let name = match draft.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                debug!("Dropping account record without a name");
                return;
            }
        };
        let id = self.data.accounts.len() as i64 + 1;
        self.data.accounts.push(Account {
            id,
            name,
            r#type: draft.r#type.unwrap_or_default(),
            description: draft.description,
            balance: draft.balance,
            credit_limit: draft.credit_limit,
            note: draft.note,
        });
    }

    pub(super) fn commit_category(&mut self, draft: CategoryDraft) {
        let name = match draft.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                debug!("Dropping category record without a name");
                return;
            }
        };
        let id = self.data.categories.len() as i64 + 1;
        self.data.categories.push(Category {
            id,
            name,
            description: draft.description,
            is_expense: draft.is_expense,
            is_income: draft.is_income,
            is_tax_related: draft.is_tax_related,
            tax_schedule: draft.tax_schedule,
        });
    }

    pub(super) fn commit_transaction(&mut self, section_type: &str, draft: TransactionDraft) {
        if draft.date.is_none() || draft.amount.is_none() {
            debug!(
                "Dropping {section_type} transaction without a valid date and amount (payee {:?})",
                draft.payee
            );
            return;
        }
        let id = self.data.transactions.len() as i64 + 1;
        let splits = draft
            .splits
            .into_iter()
            .map(|split| {
                self.last_split_id += 1;
                Split {
                    id: self.last_split_id,
                    parent_transaction_id: id,
                    category_label: split.category_label,
                    amount: split.amount,
                    memo: split.memo,
                }
            })
            .collect();
        self.data.transactions.push(Transaction {
            id,
            section_type: section_type.to_string(),
            date: draft.date,
            payee: draft.payee,
            memo: draft.memo,
            amount: draft.amount,
            cleared_status: draft.cleared_status,
            reference_number: draft.reference_number,
            category_label: draft.category_label,
            splits,
        });
    }

    pub(super) fn finish(self) -> QifData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(lines: &[(char, &str)]) -> TransactionDraft {
        let mut draft = TransactionDraft::default();
        for (code, value) in lines {
            draft.set(*code, value);
        }
        draft
    }

    #[test]
    fn account_requires_name() {
        let mut assembler = Assembler::new();
        let mut unnamed = AccountDraft::default();
        unnamed.set('T', "Bank");
        assembler.commit_account(unnamed);
        let mut empty_name = AccountDraft::default();
        empty_name.set('N', "");
        assembler.commit_account(empty_name);
        let mut named = AccountDraft::default();
        named.set('N', "Savings");
        assembler.commit_account(named);

        let data = assembler.finish();
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.accounts[0].id, 1);
        assert_eq!(data.accounts[0].name, "Savings");
    }

    #[test]
    fn account_balance_defaults_to_zero_but_limit_to_null() {
        let mut draft = AccountDraft::default();
        draft.set('N', "Visa");
        draft.set('B', "oops");
        draft.set('L', "oops");
        let mut assembler = Assembler::new();
        assembler.commit_account(draft);
        let account = &assembler.finish().accounts[0];
        assert_eq!(account.balance, Some(Decimal::ZERO));
        assert_eq!(account.credit_limit, None);
    }

    #[test]
    fn category_flags() {
        let mut draft = CategoryDraft::default();
        for (code, value) in [('N', "Tax:Fed"), ('E', ""), ('T', ""), ('R', "1040")] {
            draft.set(code, value);
        }
        let mut assembler = Assembler::new();
        assembler.commit_category(draft);
        let category = &assembler.finish().categories[0];
        assert!(category.is_expense);
        assert!(!category.is_income);
        assert!(category.is_tax_related);
        assert_eq!(category.tax_schedule.as_deref(), Some("1040"));
    }

    #[test]
    fn orphan_split_fields_are_ignored() {
        let draft = transaction(&[
            ('D', "01/02/23"),
            ('T', "-10"),
            ('$', "-10"),
            ('E', "orphan"),
            ('S', "Food"),
            ('E', "lunch"),
        ]);
        let mut assembler = Assembler::new();
        assembler.commit_transaction("Bank", draft);
        let t = &assembler.finish().transactions[0];
        assert_eq!(t.splits.len(), 1);
        assert_eq!(t.splits[0].amount, None);
        assert_eq!(t.splits[0].memo.as_deref(), Some("lunch"));
    }

    #[test]
    fn dropped_transactions_do_not_consume_ids() {
        let mut assembler = Assembler::new();
        assembler.commit_transaction("Bank", transaction(&[('D', "01/02/23"), ('S', "A")]));
        assembler.commit_transaction(
            "Bank",
            transaction(&[('D', "01/02/23"), ('T', "1"), ('S', "A"), ('S', "B")]),
        );
        assembler.commit_transaction("Bank", transaction(&[('T', "1"), ('S', "C")]));
        assembler.commit_transaction("Bank", transaction(&[('D', "1/3/23"), ('T', "2"), ('S', "D")]));

        let data = assembler.finish();
        let ids: Vec<i64> = data.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        let splits: Vec<(i64, i64)> = data
            .splits()
            .map(|s| (s.id, s.parent_transaction_id))
            .collect();
        assert_eq!(splits, vec![(1, 1), (2, 1), (3, 2)]);
    }
}
