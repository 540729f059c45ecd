use clap::Parser;
use qif_mcp::args::{Args, Command};
use qif_mcp::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let config = Config::load(args.common().qif(), args.common().db()).await?;

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Load => commands::load(config).await?.print_data(),

        Command::Mcp => {
            // The server always starts from the current contents of the file.
            commands::load(config.clone()).await?.print();
            commands::mcp(config).await?.print()
        }

        Command::Query(query_args) => {
            commands::ensure_loaded(config.clone()).await?.print();
            let out = commands::query(config, query_args.clone()).await?;
            out.print();
            if let Some(rows) = out.structure() {
                println!("{rows}");
            }
        }

        Command::Summary(summary_args) => {
            commands::ensure_loaded(config.clone()).await?.print();
            commands::summaries(config, summary_args.clone())
                .await?
                .print_data()
        }

        Command::Accounts => {
            commands::ensure_loaded(config.clone()).await?.print();
            commands::list_accounts(config).await?.print_data()
        }

        Command::Categories => {
            commands::ensure_loaded(config.clone()).await?.print();
            commands::list_categories(config).await?.print_data()
        }

        Command::Transactions(list_args) => {
            commands::ensure_loaded(config.clone()).await?.print();
            commands::list_transactions(config, list_args.clone())
                .await?
                .print_data()
        }

        Command::Search(search_args) => {
            commands::ensure_loaded(config.clone()).await?.print();
            commands::search_transactions(config, search_args.clone())
                .await?
                .print_data()
        }

        Command::Export(export_args) => {
            commands::ensure_loaded(config.clone()).await?.print();
            let out = commands::export(config, export_args.clone()).await?;
            out.print();
            if let Some(csv) = out.structure() {
                print!("{csv}");
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    // stdout carries MCP messages and command output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
