//! Listing and searching commands over the loaded tables.

use crate::args::{ListTransactionsArgs, SearchTransactionsArgs};
use crate::commands::Out;
use crate::db::{AccountRow, CategoryRow, TransactionRow};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::bail;
use chrono::NaiveDate;

/// All accounts, ordered by name.
pub async fn list_accounts(config: Config) -> Result<Out<Vec<AccountRow>>> {
    let accounts = config
        .db()
        .list_accounts()
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Found {} accounts", accounts.len()), accounts))
}

/// All categories, ordered by name.
pub async fn list_categories(config: Config) -> Result<Out<Vec<CategoryRow>>> {
    let categories = config
        .db()
        .list_categories()
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Found {} categories", categories.len()),
        categories,
    ))
}

/// Transactions matching the filters in `args`, newest first.
///
/// # Errors
/// - `date_from` or `date_to` is not a `YYYY-MM-DD` date.
/// - `limit` is zero.
pub async fn list_transactions(
    config: Config,
    args: ListTransactionsArgs,
) -> Result<Out<Vec<TransactionRow>>> {
    validate_list_args(&args).pub_result(ErrorType::Request)?;
    let transactions = config
        .db()
        .list_transactions(&args)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Found {} transactions", transactions.len()),
        transactions,
    ))
}

/// Transactions whose payee, memo or category contains `args.term`, newest first.
pub async fn search_transactions(
    config: Config,
    args: SearchTransactionsArgs,
) -> Result<Out<Vec<TransactionRow>>> {
    validate_search_args(&args).pub_result(ErrorType::Request)?;
    let transactions = config
        .db()
        .search_transactions(&args)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!(
            "Found {} transactions matching '{}'",
            transactions.len(),
            args.term
        ),
        transactions,
    ))
}

fn validate_list_args(args: &ListTransactionsArgs) -> Result<()> {
    for (name, value) in [("date_from", &args.date_from), ("date_to", &args.date_to)] {
        if let Some(value) = value {
            if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                bail!("{name} must be a date formatted YYYY-MM-DD, got '{value}'");
            }
        }
    }
    if args.limit == 0 {
        bail!("limit must be greater than zero");
    }
    Ok(())
}

fn validate_search_args(args: &SearchTransactionsArgs) -> Result<()> {
    if args.term.trim().is_empty() {
        bail!("The search term is empty");
    }
    if args.limit == 0 {
        bail!("limit must be greater than zero");
    }
    Ok(())
}
