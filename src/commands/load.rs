//! The `load` command, which (re)loads the QIF file into the database.

use crate::commands::Out;
use crate::db::Table;
use crate::error::{ErrorType, IntoResult};
use crate::model::LoadCounts;
use crate::{loader, qif, Config, Result};
use tracing::debug;

/// Parses the configured QIF file and replaces the database contents with it.
pub async fn load(config: Config) -> Result<Out<LoadCounts>> {
    // Separate the source errors from the database errors.
    let data = qif::parse_file(config.qif_path())
        .await
        .pub_result(ErrorType::Source)?;
    let counts = loader::load(config.db(), data)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!(
            "Loaded {} accounts, {} categories and {} transactions from {}",
            counts.accounts,
            counts.categories,
            counts.transactions,
            config.qif_path().display()
        ),
        counts,
    ))
}

/// Loads the QIF file unless the database already holds data from an earlier load. An in-memory
/// database is always empty at this point, so it is always loaded.
pub async fn ensure_loaded(config: Config) -> Result<Out<Option<LoadCounts>>> {
    let db = config.db();
    let mut existing = 0;
    for table in [
        Table::Accounts,
        Table::Categories,
        Table::Transactions,
        Table::Splits,
    ] {
        existing += db.count(table).await.pub_result(ErrorType::Database)?;
    }
    if existing > 0 {
        debug!("Database already holds {existing} rows, not reloading");
        return Ok(Out::new("Using previously loaded data", None));
    }
    let out = load(config).await?;
    let message = out.message().to_string();
    Ok(Out::new(message, out.structure().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PubError;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_load() {
        let env = TestEnv::new().await;
        let out = load(env.config()).await.unwrap();
        let counts = out.structure().unwrap();
        assert_eq!(counts.accounts, 2);
        assert_eq!(counts.categories, 2);
        assert_eq!(counts.transactions, 5);
        assert_eq!(counts.splits, 2);
        assert!(out.message().contains("5 transactions"));
    }

    #[tokio::test]
    async fn test_ensure_loaded_only_once() {
        let env = TestEnv::new_unloaded().await;
        let first = ensure_loaded(env.config()).await.unwrap();
        assert!(first.structure().unwrap().is_some());
        let second = ensure_loaded(env.config()).await.unwrap();
        assert!(second.structure().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_removed_after_config() {
        let env = TestEnv::new_unloaded().await;
        tokio::fs::remove_file(env.config().qif_path()).await.unwrap();
        let err = load(env.config()).await.unwrap_err();
        assert_eq!(PubError::type_of(&err), Some(ErrorType::Source));
    }
}
