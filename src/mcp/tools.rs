//! The MCP tools. Each tool delegates to the command handler of the same purpose.

use crate::args::{ListTransactionsArgs, QueryArgs, SearchTransactionsArgs, SummaryArgs};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::QifServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl QifServer {
    /// Re-read the QIF file from disk and replace all accounts, categories, transactions and
    /// splits with its contents. The summary views are rebuilt. Returns the number of rows loaded
    /// into each table.
    #[tool]
    async fn reload(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: reload called");
        let config = (*self.config).clone();
        tool_result(commands::load(config).await)
    }

    /// List all accounts defined in the QIF file with their type, description, opening balance
    /// and credit limit, ordered by name.
    #[tool]
    async fn list_accounts(&self) -> Result<CallToolResult, McpError> {
        let config = (*self.config).clone();
        tool_result(commands::list_accounts(config).await)
    }

    /// List all categories defined in the QIF file, ordered by name. Categories carry expense,
    /// income and tax-related flags and an optional tax schedule.
    ///
    /// Transactions may use category labels that are not defined here.
    #[tool]
    async fn list_categories(&self) -> Result<CallToolResult, McpError> {
        let config = (*self.config).clone();
        tool_result(commands::list_categories(config).await)
    }

    /// List transactions, newest first. All filters are optional and are combined with AND.
    ///
    /// # Parameters
    ///
    /// - `section_type`: exact account type, e.g. `Bank` or `CCard`
    /// - `date_from`, `date_to`: inclusive bounds formatted `YYYY-MM-DD`
    /// - `category`, `payee`: case-insensitive substring matches
    /// - `limit`: maximum rows, default 100
    #[tool]
    async fn list_transactions(
        &self,
        Parameters(args): Parameters<ListTransactionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let config = (*self.config).clone();
        tool_result(commands::list_transactions(config, args).await)
    }

    /// Find transactions whose payee, memo or category contains the search term
    /// (case-insensitive), newest first. Returns at most `limit` rows, default 50.
    #[tool]
    async fn search_transactions(
        &self,
        Parameters(args): Parameters<SearchTransactionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let config = (*self.config).clone();
        tool_result(commands::search_transactions(config, args).await)
    }

    /// Execute a read-only SQL query against the loaded data.
    ///
    /// Only a single `SELECT` (or `WITH ... SELECT`) statement is accepted. Statements containing
    /// INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, TRUNCATE, REPLACE, ATTACH, DETACH, PRAGMA or
    /// VACUUM are rejected. When the statement has no LIMIT clause, LIMIT 1000 is appended.
    ///
    /// # Output formats
    ///
    /// - `json` (default): an array of objects keyed by column name
    /// - `table`: a markdown table
    /// - `csv`: CSV with a header row
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "sql": "SELECT category, SUM(amount) AS total FROM transactions GROUP BY category",
    ///   "format": "table"
    /// }
    /// ```
    #[tool]
    async fn run_sql(
        &self,
        Parameters(args): Parameters<QueryArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: run_sql called");
        let config = (*self.config).clone();
        tool_result(commands::query(config, args).await)
    }

    /// Get spending summaries: totals per month and category, per category, and per account
    /// type, together with overall statistics (transaction count, distinct categories, account
    /// types and payees, date range and total amount). The month and category summaries are
    /// limited to their first 50 rows.
    ///
    /// `period` selects one summary: `month` (default), `category`, `account` or `all`.
    #[tool]
    async fn get_summaries(
        &self,
        Parameters(args): Parameters<SummaryArgs>,
    ) -> Result<CallToolResult, McpError> {
        let config = (*self.config).clone();
        tool_result(commands::summaries(config, args).await)
    }
}
