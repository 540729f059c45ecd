pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod loader;
mod mcp;
pub mod model;
pub mod qif;
mod utils;


pub use config::Config;
pub use db::{AccountRow, CategoryRow, Statistics, TransactionRow};
pub use error::{Error, ErrorType, PubError, Result};
