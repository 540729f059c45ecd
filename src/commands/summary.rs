//! The `summary` command, which reads the aggregate views built by every load.

use crate::args::{Period, SummaryArgs};
use crate::commands::Out;
use crate::db::{
    Statistics, ACCOUNT_TYPE_SUMMARIES, CATEGORY_SUMMARIES, MONTHLY_SUMMARIES,
};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// At most this many rows of the monthly and category views are returned.
const SUMMARY_ROWS: u32 = 50;

type SummaryRows = Vec<Map<String, Value>>;

/// The requested summary views plus statistics over all transactions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Summaries {
    /// Totals per month and category, newest month first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly: Option<SummaryRows>,
    /// Totals per category, largest total first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_category: Option<SummaryRows>,
    /// Totals per account type (the `!Type:` of the section), largest total first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_account_type: Option<SummaryRows>,
    pub statistics: Statistics,
}

/// Reads the summary views selected by `args.period` along with overall statistics.
pub async fn summaries(config: Config, args: SummaryArgs) -> Result<Out<Summaries>> {
    let db = config.db();
    let period = args.period;

    let monthly = if period.includes(Period::Month) {
        Some(db.view_rows(MONTHLY_SUMMARIES, Some(SUMMARY_ROWS)).await)
    } else {
        None
    };
    let by_category = if period.includes(Period::Category) {
        Some(db.view_rows(CATEGORY_SUMMARIES, Some(SUMMARY_ROWS)).await)
    } else {
        None
    };
    let by_account_type = if period.includes(Period::Account) {
        Some(db.view_rows(ACCOUNT_TYPE_SUMMARIES, None).await)
    } else {
        None
    };

    let summaries = Summaries {
        monthly: monthly
            .transpose()
            .pub_result(ErrorType::Database)?
            .map(|r| r.rows),
        by_category: by_category
            .transpose()
            .pub_result(ErrorType::Database)?
            .map(|r| r.rows),
        by_account_type: by_account_type
            .transpose()
            .pub_result(ErrorType::Database)?
            .map(|r| r.rows),
        statistics: db.statistics().await.pub_result(ErrorType::Database)?,
    };

    Ok(Out::new(
        format!(
            "Summaries ({period}) over {} transactions",
            summaries.statistics.total_transactions
        ),
        summaries,
    ))
}
