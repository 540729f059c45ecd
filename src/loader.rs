//! Writes parsed QIF data into the database, replacing whatever was loaded before, and rebuilds
//! the summary views.
//!
//! Tables are replaced one after another. A failure part way through leaves the earlier tables
//! replaced and the later ones untouched; the error is returned and nothing is retried.

use crate::db::Db;
use crate::model::{LoadCounts, QifData};
use crate::qif;
use crate::Result;
use std::path::Path;
use tracing::info;

/// Replaces the contents of the accounts, categories, transactions and splits tables with `data`.
pub(crate) async fn load(db: &Db, data: QifData) -> Result<LoadCounts> {
    let QifData {
        accounts,
        categories,
        transactions,
    } = data;

    let accounts = db.replace_accounts(&accounts).await?;
    let categories = db.replace_categories(&categories).await?;
    let (transactions, splits) = db.replace_transactions(&transactions).await?;
    db.rebuild_views().await?;

    let counts = LoadCounts {
        accounts,
        categories,
        transactions,
        splits,
    };
    info!(
        "Loaded {} accounts, {} categories, {} transactions and {} splits",
        counts.accounts, counts.categories, counts.transactions, counts.splits
    );
    Ok(counts)
}

/// Reads, parses and loads the QIF file at `path`.
pub(crate) async fn load_file(db: &Db, path: &Path) -> Result<LoadCounts> {
    info!("Loading QIF data from {}", path.display());
    let data = qif::parse_file(path).await?;
    load(db, data).await
}
