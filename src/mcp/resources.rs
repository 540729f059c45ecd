//! The CSV exports as MCP resources.

use crate::args::Export;
use rmcp::model::{AnnotateAble, RawResource, Resource};

const LEDGER_SUMMARY_URI: &str = "quicken://ledger_summary";
const TRANSACTIONS_URI: &str = "quicken://transactions_export";

pub(super) fn uri(export: Export) -> &'static str {
    match export {
        Export::LedgerSummary => LEDGER_SUMMARY_URI,
        Export::Transactions => TRANSACTIONS_URI,
    }
}

pub(super) fn find(uri: &str) -> Option<Export> {
    Export::ALL.into_iter().find(|e| self::uri(*e) == uri)
}

fn describe(export: Export) -> (&'static str, &'static str) {
    match export {
        Export::LedgerSummary => (
            "Ledger Summary",
            "Transaction count, total and average amount per category, in CSV format",
        ),
        Export::Transactions => (
            "Transactions Export",
            "Date, payee, amount, category and memo of all transactions, newest first, in CSV format",
        ),
    }
}

pub(super) fn list() -> Vec<Resource> {
    Export::ALL
        .into_iter()
        .map(|export| {
            let (name, description) = describe(export);
            let mut raw = RawResource::new(uri(export), name);
            raw.description = Some(description.into());
            raw.mime_type = Some("text/csv".into());
            raw.no_annotation()
        })
        .collect()
}
