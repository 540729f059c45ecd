//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! The database is in-memory unless a file path is given. Either way a single pooled connection
//! is used: it keeps an in-memory database alive and serializes the loader against queries.

mod migrations;
mod query;

use crate::args::{ListTransactionsArgs, SearchTransactionsArgs};
use crate::model::{Account, Category, Transaction};
use crate::Result;
use anyhow::{bail, Context};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

pub(crate) use query::{validate_read_only, QueryRows};

const VIEWS_SQL: &str = include_str!("views.sql");

/// Names of the aggregate views rebuilt by every load.
pub const MONTHLY_SUMMARIES: &str = "monthly_summaries";
pub const CATEGORY_SUMMARIES: &str = "category_summaries";
pub const ACCOUNT_TYPE_SUMMARIES: &str = "account_type_summaries";

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens the database at `path`, creating it if needed, or an in-memory database when `path`
    /// is `None`. Brings the schema up to date.
    pub(crate) async fn open(path: Option<&Path>) -> Result<Self> {
        let options = match path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            None => SqliteConnectOptions::from_str("sqlite::memory:")
                .context("Failed to parse in-memory SQLite connection string")?,
        };
        let location = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .before_acquire(|conn, _meta| {
                // A read-only query dropped before it finished leaves the flag set.
                Box::pin(async move {
                    conn.execute("PRAGMA query_only = OFF").await?;
                    Ok::<_, sqlx::Error>(true)
                })
            })
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database at {location}"))?;

        let version = migrations::current_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "Database schema version {version} is newer than this program supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        debug!("Opened SQLite database at {location}");
        Ok(Self { pool })
    }

    /// Deletes every account and inserts `accounts` in their place.
    pub(crate) async fn replace_accounts(&self, accounts: &[Account]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM accounts")
            .execute(&mut *tx)
            .await
            .context("Failed to clear accounts")?;
        for account in accounts {
            sqlx::query(
                "INSERT INTO accounts (id, name, type, description, balance, credit_limit, note) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(account.id)
            .bind(account.name.as_str())
            .bind(account.r#type.as_str())
            .bind(account.description.as_deref())
            .bind(real(account.balance))
            .bind(real(account.credit_limit))
            .bind(account.note.as_deref())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert account '{}'", account.name))?;
        }
        tx.commit().await.context("Failed to commit accounts")?;
        Ok(accounts.len() as u64)
    }

    /// Deletes every category and inserts `categories` in their place.
    pub(crate) async fn replace_categories(&self, categories: &[Category]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM categories")
            .execute(&mut *tx)
            .await
            .context("Failed to clear categories")?;
        for category in categories {
            sqlx::query(
                "INSERT INTO categories \
                 (id, name, description, is_expense, is_income, is_tax_related, tax_schedule) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(category.id)
            .bind(category.name.as_str())
            .bind(category.description.as_deref())
            .bind(category.is_expense)
            .bind(category.is_income)
            .bind(category.is_tax_related)
            .bind(category.tax_schedule.as_deref())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert category '{}'", category.name))?;
        }
        tx.commit().await.context("Failed to commit categories")?;
        Ok(categories.len() as u64)
    }

    /// Deletes every transaction and split, then inserts `transactions` and their splits.
    /// Returns the number of transactions and splits written.
    pub(crate) async fn replace_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<(u64, u64)> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        // Splits reference transactions, so they go first.
        sqlx::query("DELETE FROM splits")
            .execute(&mut *tx)
            .await
            .context("Failed to clear splits")?;
        sqlx::query("DELETE FROM transactions")
            .execute(&mut *tx)
            .await
            .context("Failed to clear transactions")?;

        let mut split_count = 0;
        for t in transactions {
            sqlx::query(
                "INSERT INTO transactions \
                 (id, section_type, date, payee, memo, amount, cleared_status, reference_number, category) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(t.id)
            .bind(t.section_type.as_str())
            .bind(t.date_iso())
            .bind(t.payee.as_deref())
            .bind(t.memo.as_deref())
            .bind(real(t.amount))
            .bind(t.cleared_status.as_deref())
            .bind(t.reference_number.as_deref())
            .bind(t.category_label.as_deref())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert transaction {}", t.id))?;

            for split in &t.splits {
                sqlx::query(
                    "INSERT INTO splits (id, transaction_id, category, amount, memo) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(split.id)
                .bind(split.parent_transaction_id)
                .bind(split.category_label.as_deref())
                .bind(real(split.amount))
                .bind(split.memo.as_deref())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert split {}", split.id))?;
                split_count += 1;
            }
        }
        tx.commit().await.context("Failed to commit transactions")?;
        Ok((transactions.len() as u64, split_count))
    }

    /// Drops and recreates the aggregate views over the transactions table.
    pub(crate) async fn rebuild_views(&self) -> Result<()> {
        self.pool
            .execute(VIEWS_SQL)
            .await
            .context("Failed to rebuild summary views")?;
        Ok(())
    }

    pub(crate) async fn list_accounts(&self) -> Result<Vec<AccountRow>> {
        sqlx::query_as(
            "SELECT id, name, type, description, balance, credit_limit, note \
             FROM accounts ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")
    }

    pub(crate) async fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        sqlx::query_as(
            "SELECT id, name, description, is_expense, is_income, is_tax_related, tax_schedule \
             FROM categories ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")
    }

    /// Lists transactions matching all of the given filters, newest first.
    pub(crate) async fn list_transactions(
        &self,
        args: &ListTransactionsArgs,
    ) -> Result<Vec<TransactionRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE 1 = 1"
        ));
        if let Some(section_type) = &args.section_type {
            qb.push(" AND section_type = ").push_bind(section_type.clone());
        }
        if let Some(date_from) = &args.date_from {
            qb.push(" AND date >= ").push_bind(date_from.clone());
        }
        if let Some(date_to) = &args.date_to {
            qb.push(" AND date <= ").push_bind(date_to.clone());
        }
        if let Some(category) = &args.category {
            qb.push(" AND category LIKE ").push_bind(format!("%{category}%"));
        }
        if let Some(payee) = &args.payee {
            qb.push(" AND payee LIKE ").push_bind(format!("%{payee}%"));
        }
        qb.push(" ORDER BY date DESC, id DESC LIMIT ")
            .push_bind(i64::from(args.limit));

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")
    }

    /// Finds transactions whose payee, memo or category contains the search term.
    pub(crate) async fn search_transactions(
        &self,
        args: &SearchTransactionsArgs,
    ) -> Result<Vec<TransactionRow>> {
        let pattern = format!("%{}%", args.term);
        sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE payee LIKE ?1 OR memo LIKE ?1 OR category LIKE ?1 \
             ORDER BY date DESC, id DESC LIMIT ?2"
        ))
        .bind(pattern)
        .bind(i64::from(args.limit))
        .fetch_all(&self.pool)
        .await
        .context("Failed to search transactions")
    }

    /// Runs a caller supplied statement with writes disabled at the connection level.
    pub(crate) async fn execute_read_only(&self, sql: &str) -> Result<QueryRows> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut *conn)
            .await
            .context("Failed to enable query_only mode")?;
        let result = query::fetch_rows(&mut conn, sql).await;
        let reset = sqlx::query("PRAGMA query_only = OFF")
            .execute(&mut *conn)
            .await;
        match (result, reset) {
            (Ok(rows), Ok(_)) => Ok(rows),
            (Ok(_), Err(e)) => Err(e).context("Failed to disable query_only mode"),
            (Err(e), reset) => {
                if let Err(reset_err) = reset {
                    warn!("Failed to disable query_only mode: {reset_err}");
                }
                Err(e)
            }
        }
    }

    /// Reads up to `limit` rows of one of the summary views.
    pub(crate) async fn view_rows(&self, view: &str, limit: Option<u32>) -> Result<QueryRows> {
        let sql = match limit {
            Some(limit) => format!("SELECT * FROM {view} LIMIT {limit}"),
            None => format!("SELECT * FROM {view}"),
        };
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        query::fetch_rows(&mut conn, &sql).await
    }

    pub(crate) async fn statistics(&self) -> Result<Statistics> {
        sqlx::query_as(
            "SELECT \
                COUNT(*) AS total_transactions, \
                COUNT(DISTINCT category) AS unique_categories, \
                COUNT(DISTINCT section_type) AS unique_section_types, \
                COUNT(DISTINCT payee) AS unique_payees, \
                MIN(date) AS earliest_date, \
                MAX(date) AS latest_date, \
                SUM(amount) AS total_amount \
             FROM transactions",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute transaction statistics")
    }

    /// Row count of a base table.
    pub(crate) async fn count(&self, table: Table) -> Result<u64> {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table.name()))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows in {}", table.name()))?;
        Ok(row.0 as u64)
    }
}

/// The base tables written by the loader.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Table {
    Accounts,
    Categories,
    Transactions,
    Splits,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Categories => "categories",
            Table::Transactions => "transactions",
            Table::Splits => "splits",
        }
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, section_type, date, payee, memo, amount, cleared_status, reference_number, category";

/// SQLite has no decimal type; amounts are stored as REAL.
fn real(value: Option<Decimal>) -> Option<f64> {
    value.and_then(|d| d.to_f64())
}

/// A row of the `accounts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub description: Option<String>,
    pub balance: Option<f64>,
    pub credit_limit: Option<f64>,
    pub note: Option<String>,
}

/// A row of the `categories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_expense: bool,
    pub is_income: bool,
    pub is_tax_related: bool,
    pub tax_schedule: Option<String>,
}

/// A row of the `transactions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub section_type: String,
    /// ISO `YYYY-MM-DD`.
    pub date: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub amount: Option<f64>,
    pub cleared_status: Option<String>,
    pub reference_number: Option<String>,
    pub category: Option<String>,
}

/// Totals over the whole transactions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Statistics {
    pub total_transactions: i64,
    pub unique_categories: i64,
    pub unique_section_types: i64,
    pub unique_payees: i64,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
    pub total_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qif;

    const SAMPLE: &str = "\
NFood
DEating out and groceries
E
^
NSalary
DPaycheck
I
^
!Account
NChecking
TBank
B1,000.00
^
NVisa
TCCard
L5000
^
!Type:Bank
D01/05/24
T-40.00
PCorner Market
LFood
^
D01/20/24
T-60.00
PCorner Market
MWeekly shop
LFood
^
D02/01/24
T2500.00
PEmployer
LSalary
SSalary:Gross
$3000.00
SSalary:Tax
$-500.00
Ewithholding
^
!Type:CCard
D02/03/24
T-15.50
PCinema
LFun
^
";

    async fn loaded() -> Db {
        let db = Db::open(None).await.unwrap();
        let data = qif::parse(SAMPLE);
        db.replace_accounts(&data.accounts).await.unwrap();
        db.replace_categories(&data.categories).await.unwrap();
        db.replace_transactions(&data.transactions).await.unwrap();
        db.rebuild_views().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_open_in_memory_runs_migrations() {
        let db = Db::open(None).await.unwrap();
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 0);
        assert_eq!(db.count(Table::Splits).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_file_twice() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("qif.sqlite");
        {
            let db = Db::open(Some(&path)).await.unwrap();
            let data = qif::parse(SAMPLE);
            db.replace_accounts(&data.accounts).await.unwrap();
        }
        let db = Db::open(Some(&path)).await.unwrap();
        assert_eq!(db.count(Table::Accounts).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replace_is_not_a_merge() {
        let db = loaded().await;
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 4);
        assert_eq!(db.count(Table::Splits).await.unwrap(), 2);

        let smaller = qif::parse("!Type:Cash\nD03/01/24\nT-1\n^\n");
        db.replace_transactions(&smaller.transactions).await.unwrap();
        db.replace_accounts(&smaller.accounts).await.unwrap();
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 1);
        assert_eq!(db.count(Table::Splits).await.unwrap(), 0);
        assert_eq!(db.count(Table::Accounts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_accounts_sorted_by_name() {
        let db = loaded().await;
        let accounts = db.list_accounts().await.unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Checking", "Visa"]);
        assert_eq!(accounts[0].balance, Some(1000.0));
        assert_eq!(accounts[1].credit_limit, Some(5000.0));
        assert_eq!(accounts[1].account_type.as_deref(), Some("CCard"));
    }

    #[tokio::test]
    async fn test_list_categories() {
        let db = loaded().await;
        let categories = db.list_categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Food");
        assert!(categories[0].is_expense);
        assert!(!categories[0].is_income);
        assert!(categories[1].is_income);
    }

    #[tokio::test]
    async fn test_list_transactions_filters() {
        let db = loaded().await;

        let all = db
            .list_transactions(&ListTransactionsArgs::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].date.as_deref(), Some("2024-02-03"));

        let bank_food = db
            .list_transactions(&ListTransactionsArgs {
                section_type: Some("Bank".into()),
                category: Some("foo".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bank_food.len(), 2);

        let january = db
            .list_transactions(&ListTransactionsArgs {
                date_from: Some("2024-01-01".into()),
                date_to: Some("2024-01-31".into()),
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].date.as_deref(), Some("2024-01-20"));
    }

    #[tokio::test]
    async fn test_search_transactions() {
        let db = loaded().await;
        let found = db
            .search_transactions(&SearchTransactionsArgs {
                term: "weekly".into(),
                limit: 50,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, Some(-60.0));
    }

    #[tokio::test]
    async fn test_views() {
        let db = loaded().await;

        let monthly = db.view_rows(MONTHLY_SUMMARIES, None).await.unwrap();
        let first = &monthly.rows[0];
        assert_eq!(first["month"], "2024-02");
        assert_eq!(first["category"], "Salary");
        let food = monthly
            .rows
            .iter()
            .find(|r| r["category"] == "Food")
            .unwrap();
        assert_eq!(food["transaction_count"], 2);
        assert_eq!(food["total_amount"], -100.0);
        assert_eq!(food["min_amount"], -60.0);
        assert_eq!(food["max_amount"], -40.0);

        let categories = db.view_rows(CATEGORY_SUMMARIES, Some(50)).await.unwrap();
        assert_eq!(categories.rows[0]["category"], "Salary");
        let food = categories
            .rows
            .iter()
            .find(|r| r["category"] == "Food")
            .unwrap();
        assert_eq!(food["first_date"], "2024-01-05");
        assert_eq!(food["last_date"], "2024-01-20");

        let account_types = db.view_rows(ACCOUNT_TYPE_SUMMARIES, None).await.unwrap();
        let types: Vec<&str> = account_types
            .rows
            .iter()
            .map(|r| r["section_type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["Bank", "CCard"]);
    }

    #[tokio::test]
    async fn test_statistics() {
        let db = loaded().await;
        let stats = db.statistics().await.unwrap();
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.unique_categories, 3);
        assert_eq!(stats.unique_section_types, 2);
        assert_eq!(stats.unique_payees, 3);
        assert_eq!(stats.earliest_date.as_deref(), Some("2024-01-05"));
        assert_eq!(stats.latest_date.as_deref(), Some("2024-02-03"));
        assert_eq!(stats.total_amount, Some(2384.5));
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes_and_recovers() {
        let db = loaded().await;
        let err = db
            .execute_read_only("DELETE FROM transactions")
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 4);

        // The connection is writable again for the loader.
        db.replace_transactions(&[]).await.unwrap();
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connection_left_read_only_is_reset_on_acquire() {
        let db = loaded().await;
        {
            let mut conn = db.pool.acquire().await.unwrap();
            sqlx::query("PRAGMA query_only = ON")
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        let data = qif::parse(SAMPLE);
        db.replace_accounts(&data.accounts).await.unwrap();
        db.replace_categories(&data.categories).await.unwrap();
        db.replace_transactions(&data.transactions).await.unwrap();
        db.rebuild_views().await.unwrap();
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_dropped_read_only_query_does_not_block_writes() {
        let db = loaded().await;
        let slow = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 2000000) \
                    SELECT COUNT(*) AS c FROM n";
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            db.execute_read_only(slow),
        )
        .await;

        db.replace_transactions(&[]).await.unwrap();
        assert_eq!(db.count(Table::Transactions).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_error_is_not_masked() {
        let db = loaded().await;
        let err = db
            .execute_read_only("SELECT * FROM no_such_table")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("no_such_table"), "{err:#}");
    }
}
