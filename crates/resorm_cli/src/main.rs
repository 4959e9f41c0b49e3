//! resorm CLI
//!
//! Command-line tools for inspecting resorm queries against a REST API.
//!
//! # Commands
//!
//! - `query` - Print the request a collection fetch would send
//! - `fetch` - Fetch a collection and print its rows as JSON

mod commands;

use clap::{Parser, Subcommand};
use commands::{ConnectionArgs, QueryArgs};
use tracing_subscriber::EnvFilter;

/// resorm command-line tools.
#[derive(Parser)]
#[command(name = "resorm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the request path and query parameters of a collection fetch
    Query {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Fetch a collection and print the rows and total count
    Fetch {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query { query } => commands::query::run(&query)?,
        Commands::Fetch { query, connection } => commands::fetch::run(&query, &connection)?,
        Commands::Version => {
            println!("resorm CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
