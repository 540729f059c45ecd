//! The `query` command for executing read-only SQL.

use crate::args::{OutputFormat, QueryArgs};
use crate::commands::Out;
use crate::db::{validate_read_only, QueryRows};
use crate::error::{ErrorType, IntoResult};
use crate::Config;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Debug, Display, Formatter};

/// Query result rows in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of objects where each row is a self-describing object with column names as keys.
    Json(Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data as a properly escaped string.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

impl Rows {
    fn render(rows: QueryRows, format: OutputFormat) -> Result<Self> {
        Ok(match format {
            OutputFormat::Json => Rows::Json(rows.into_json()),
            OutputFormat::Table => Rows::Table(markdown_table(&rows)),
            OutputFormat::Csv => Rows::Csv(csv_text(&rows)?),
        })
    }
}

/// Execute a read-only SQL query against the database.
///
/// Only `SELECT` and `WITH` statements pass validation, and they run with SQLite's `query_only`
/// pragma set, so any write attempt is rejected by SQLite even if it got past the screen.
pub async fn query(config: Config, args: QueryArgs) -> Result<Out<Rows>> {
    let sql = validate_read_only(&args.sql).pub_result(ErrorType::Request)?;
    let rows = config
        .db()
        .execute_read_only(&sql)
        .await
        .pub_result(ErrorType::Database)?;
    let count = rows.len();
    let rows = Rows::render(rows, args.format).pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Query returned {count} rows"), rows))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn markdown_table(rows: &QueryRows) -> String {
    if rows.columns.is_empty() {
        return "(no rows)".to_string();
    }
    let escape = |s: String| s.replace('|', "\\|").replace('\n', " ");
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&rows.columns.join(" | "));
    out.push_str(" |\n|");
    for _ in &rows.columns {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &rows.rows {
        let cells: Vec<String> = rows
            .columns
            .iter()
            .map(|c| escape(cell_text(row.get(c))))
            .collect();
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
    }
    out
}

pub(super) fn csv_text(rows: &QueryRows) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !rows.columns.is_empty() {
        writer
            .write_record(&rows.columns)
            .context("Unable to write CSV header")?;
    }
    for row in &rows.rows {
        let record: Vec<String> = rows.columns.iter().map(|c| cell_text(row.get(c))).collect();
        writer
            .write_record(&record)
            .context("Unable to write CSV row")?;
    }
    let bytes = writer.into_inner().context("Unable to finish CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PubError;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_query_json() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new(
            "SELECT name, balance FROM accounts ORDER BY name",
            OutputFormat::Json,
        );
        let out = query(env.config(), args).await.unwrap();
        assert_eq!(out.message(), "Query returned 2 rows");
        let Some(Rows::Json(Value::Array(rows))) = out.structure() else {
            panic!("expected a JSON array, got {:?}", out.structure());
        };
        assert_eq!(rows[0]["name"], "Checking");
        assert_eq!(rows[0]["balance"], 1000.0);
        assert_eq!(rows[1]["balance"], Value::Null);
    }

    #[tokio::test]
    async fn test_query_table() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new(
            "SELECT name, type FROM accounts ORDER BY name",
            OutputFormat::Table,
        );
        let out = query(env.config(), args).await.unwrap();
        let Some(Rows::Table(table)) = out.structure() else {
            panic!("expected a table");
        };
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| name | type |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| Checking | Bank |");
    }

    #[tokio::test]
    async fn test_query_csv() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new(
            "SELECT payee, amount FROM transactions WHERE payee = 'Corner Market, Inc.' ORDER BY id",
            OutputFormat::Csv,
        );
        let out = query(env.config(), args).await.unwrap();
        let Some(Rows::Csv(csv)) = out.structure() else {
            panic!("expected csv");
        };
        assert_eq!(
            csv,
            "payee,amount\n\"Corner Market, Inc.\",-40.0\n\"Corner Market, Inc.\",-60.0\n"
        );
    }

    #[tokio::test]
    async fn test_query_views() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new("SELECT * FROM account_type_summaries", OutputFormat::Json);
        let out = query(env.config(), args).await.unwrap();
        assert_eq!(out.message(), "Query returned 2 rows");
    }

    #[tokio::test]
    async fn test_write_is_a_request_error() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new("DELETE FROM transactions", OutputFormat::Json);
        let err = query(env.config(), args).await.unwrap_err();
        assert_eq!(PubError::type_of(&err), Some(ErrorType::Request));
    }

    #[tokio::test]
    async fn test_bad_sql_is_a_database_error() {
        let env = TestEnv::new().await;
        let args = QueryArgs::new("SELECT * FROM nowhere", OutputFormat::Json);
        let err = query(env.config(), args).await.unwrap_err();
        assert_eq!(PubError::type_of(&err), Some(ErrorType::Database));
    }

    #[test]
    fn test_empty_result_rendering() {
        let rows = QueryRows::default();
        assert_eq!(markdown_table(&rows), "(no rows)");
        assert_eq!(csv_text(&rows).unwrap(), "");
    }
}
