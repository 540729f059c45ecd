//! Runtime configuration.
//!
//! There is no configuration file. Everything comes from the command line or the environment
//! (`QIF_PATH`, `QIF_DB`, `RUST_LOG`), so `Config` is just the validated QIF path together with
//! the open database.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult};
use crate::{qif, utils, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The `Config` object represents the configuration of the app. You instantiate it with the path
/// to the QIF file and, optionally, the path to an SQLite file. Loading validates the QIF source
/// and opens (or creates) the database, bringing its schema up to date.
#[derive(Debug, Clone)]
pub struct Config {
    qif_path: PathBuf,
    db_path: Option<PathBuf>,
    db: Db,
}

impl Config {
    /// This will
    /// - validate that `qif_path` is a non-empty file
    /// - create the parent directory of `db_path` if needed
    /// - open the database at `db_path`, or an in-memory database if it is `None`
    ///
    /// It does not load the QIF file. See `commands::load`.
    pub async fn load(qif_path: impl Into<PathBuf>, db_path: Option<&Path>) -> Result<Self> {
        let maybe_relative = qif_path.into();
        qif::check_source(&maybe_relative)
            .await
            .pub_result(ErrorType::Source)?;
        let qif_path = utils::canonicalize(&maybe_relative)
            .await
            .pub_result(ErrorType::Source)?;

        if let Some(db_path) = db_path {
            utils::make_parent_dir(db_path)
                .await
                .pub_result(ErrorType::Config)?;
        }
        let db = Db::open(db_path).await.pub_result(ErrorType::Database)?;
        debug!("Configured QIF source {}", qif_path.display());

        Ok(Self {
            qif_path,
            db_path: db_path.map(Path::to_path_buf),
            db,
        })
    }

    /// The canonical path of the QIF file.
    pub fn qif_path(&self) -> &Path {
        &self.qif_path
    }

    /// The SQLite file, or `None` when the database is in memory.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }
}
