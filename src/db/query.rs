//! Ad-hoc read queries: statement screening and conversion of untyped rows to JSON.

use crate::Result;
use anyhow::{bail, Context};
use regex::Regex;
use serde_json::{Map, Number, Value};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use std::sync::OnceLock;

/// Appended to statements that do not limit their own result size.
const DEFAULT_ROW_LIMIT: u32 = 1000;

/// `REPLACE` is not listed since `replace()` is a string function.
const WRITE_KEYWORDS: &str =
    r"(?i)\b(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE|ATTACH|DETACH|PRAGMA|VACUUM)\b";

/// Single quoted strings and double quoted identifiers, with doubled quotes as escapes.
const QUOTED: &str = r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#;

fn write_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WRITE_KEYWORDS).expect("write keyword pattern is valid"))
}

fn quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(QUOTED).expect("quoted text pattern is valid"))
}

fn limit_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\b").expect("limit pattern is valid"))
}

/// Checks that `sql` is a single read statement and returns it ready to run, with a row limit
/// appended when it has none.
///
/// This is a screen, not the enforcement: statements also run with `PRAGMA query_only` set.
pub(crate) fn validate_read_only(sql: &str) -> Result<String> {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        bail!("The query is empty");
    }
    let upper = trimmed.to_uppercase();
    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        bail!("Only SELECT queries are allowed");
    }
    let unquoted = quoted().replace_all(trimmed, "''");
    if let Some(found) = write_keyword().find(&unquoted) {
        bail!(
            "Query contains a forbidden keyword: {}",
            found.as_str().to_uppercase()
        );
    }
    if limit_clause().is_match(&unquoted) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed} LIMIT {DEFAULT_ROW_LIMIT}"))
    }
}

/// The result of an untyped query. Column order is kept separately because JSON objects do not
/// preserve it.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct QueryRows {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Map<String, Value>>,
}

impl QueryRows {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn into_json(self) -> Value {
        Value::Array(self.rows.into_iter().map(Value::Object).collect())
    }
}

pub(super) async fn fetch_rows(conn: &mut PoolConnection<Sqlite>, sql: &str) -> Result<QueryRows> {
    let rows: Vec<SqliteRow> = sqlx::query(sql)
        .persistent(false)
        .fetch_all(&mut **conn)
        .await
        .with_context(|| format!("Query failed: {sql}"))?;

    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(row_to_json)
        .collect::<Result<Vec<_>>>()?;
    Ok(QueryRows { columns, rows })
}

fn row_to_json(row: &SqliteRow) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for (ix, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), cell_to_json(row, ix)?);
    }
    Ok(map)
}

/// SQLite values are dynamically typed, so the storage class of each cell decides its JSON type.
fn cell_to_json(row: &SqliteRow, ix: usize) -> Result<Value> {
    let raw = row
        .try_get_raw(ix)
        .with_context(|| format!("Failed to read column {ix}"))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(ix)?),
        "REAL" => {
            let f: f64 = row.try_get(ix)?;
            Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(ix)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(ix)?),
    };
    Ok(value)
}
