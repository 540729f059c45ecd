//! These structs provide the CLI interface for the qif-mcp CLI.
//!
//! The argument structs of the query commands double as MCP tool parameters, so they derive
//! `Deserialize` and `JsonSchema` as well as clap's `Parser`.

use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// qif-mcp: Load a Quicken Interchange Format (QIF) file into SQLite and query it.
///
/// The QIF file given by --qif is parsed into accounts, categories, transactions and splits, which
/// are written to an SQLite database along with monthly, per-category and per-account-type
/// summary views. The database lives in memory unless --db is given.
///
/// There is also a mode in which an AI agent, like Claude, can query the data through the mcp
/// subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run as an MCP server over stdio. The QIF file is loaded once at startup and can be
    /// reloaded with the reload tool.
    Mcp,
    /// Parse the QIF file and load it into the database, replacing what was there.
    ///
    /// This is mostly useful together with --db: the other commands load the file themselves
    /// when the database is empty.
    Load,
    /// Execute a read-only SQL query.
    Query(QueryArgs),
    /// Show the summary views and overall statistics.
    Summary(SummaryArgs),
    /// List all accounts.
    Accounts,
    /// List all categories.
    Categories,
    /// List transactions, newest first, optionally filtered.
    Transactions(ListTransactionsArgs),
    /// Search transactions by payee, memo or category.
    Search(SearchTransactionsArgs),
    /// Write a CSV export to stdout.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The QIF file to load.
    #[arg(long, env = "QIF_PATH")]
    qif: PathBuf,

    /// An SQLite database file to load into. It is created if it does not exist. When omitted, an
    /// in-memory database is used.
    #[arg(long, env = "QIF_DB")]
    db: Option<PathBuf>,
}

impl Common {
    pub fn new(log_level: LevelFilter, qif: impl Into<PathBuf>, db: Option<PathBuf>) -> Self {
        Self {
            log_level,
            qif: qif.into(),
            db,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn qif(&self) -> &Path {
        &self.qif
    }

    pub fn db(&self) -> Option<&Path> {
        self.db.as_deref()
    }
}

/// The format of `query` results.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// An array of objects keyed by column name.
    #[default]
    Json,
    /// A markdown table.
    Table,
    /// CSV with a header row.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// Args for the `qif-mcp query` command and the `run_sql` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct QueryArgs {
    /// A single SELECT (or WITH ... SELECT) statement. Statements that would write are rejected.
    /// When the statement has no LIMIT clause, LIMIT 1000 is added.
    pub sql: String,

    /// The format of the returned rows: 'json' (default), 'table' (markdown) or 'csv'.
    #[arg(long, default_value_t)]
    #[serde(default)]
    pub format: OutputFormat,
}

impl QueryArgs {
    pub fn new(sql: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            sql: sql.into(),
            format,
        }
    }
}

/// Which summary views to return.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Totals per calendar month and category.
    #[default]
    Month,
    /// Totals per category.
    Category,
    /// Totals per account type.
    Account,
    /// All of the above.
    All,
}

serde_plain::derive_display_from_serialize!(Period);
serde_plain::derive_fromstr_from_deserialize!(Period);

impl Period {
    pub(crate) fn includes(&self, other: Period) -> bool {
        *self == Period::All || *self == other
    }
}

/// Args for the `qif-mcp summary` command and the `get_summaries` tool.
#[derive(Debug, Clone, Default, Parser, Serialize, Deserialize, JsonSchema)]
pub struct SummaryArgs {
    /// Which summaries to return: 'month' (default), 'category', 'account' or 'all'.
    #[arg(long, default_value_t)]
    #[serde(default)]
    pub period: Period,
}

/// The CSV exports, also served as MCP resources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Export {
    /// Transaction count, total and average amount per category.
    LedgerSummary,
    /// Date, payee, amount, category and memo of every transaction, newest first.
    Transactions,
}

serde_plain::derive_display_from_serialize!(Export);
serde_plain::derive_fromstr_from_deserialize!(Export);

impl Export {
    pub const ALL: [Export; 2] = [Export::LedgerSummary, Export::Transactions];
}

/// Args for the `qif-mcp export` command.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct ExportArgs {
    /// Which export to write.
    #[arg(value_enum)]
    pub export: Export,
}

impl ExportArgs {
    pub fn new(export: Export) -> Self {
        Self { export }
    }
}

fn default_list_limit() -> u32 {
    100
}

fn default_search_limit() -> u32 {
    50
}

/// Args for the `qif-mcp transactions` command and the `list_transactions` tool. All filters are
/// optional and combine with AND.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct ListTransactionsArgs {
    /// Only transactions from sections of this type, e.g. 'Bank', 'CCard' or 'Unknown'.
    #[arg(long)]
    #[serde(default)]
    pub section_type: Option<String>,

    /// Only transactions on or after this date, formatted YYYY-MM-DD.
    #[arg(long)]
    #[serde(default)]
    pub date_from: Option<String>,

    /// Only transactions on or before this date, formatted YYYY-MM-DD.
    #[arg(long)]
    #[serde(default)]
    pub date_to: Option<String>,

    /// Only transactions whose category contains this text (case-insensitive).
    #[arg(long)]
    #[serde(default)]
    pub category: Option<String>,

    /// Only transactions whose payee contains this text (case-insensitive).
    #[arg(long)]
    #[serde(default)]
    pub payee: Option<String>,

    /// The maximum number of transactions to return. Defaults to 100.
    #[arg(long, default_value_t = default_list_limit())]
    #[serde(default = "default_list_limit")]
    pub limit: u32,
}

impl Default for ListTransactionsArgs {
    fn default() -> Self {
        Self {
            section_type: None,
            date_from: None,
            date_to: None,
            category: None,
            payee: None,
            limit: default_list_limit(),
        }
    }
}

/// Args for the `qif-mcp search` command and the `search_transactions` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct SearchTransactionsArgs {
    /// The text to look for in payee, memo and category (case-insensitive).
    pub term: String,

    /// The maximum number of transactions to return. Defaults to 50.
    #[arg(long, default_value_t = default_search_limit())]
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

impl SearchTransactionsArgs {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            limit: default_search_limit(),
        }
    }
}
