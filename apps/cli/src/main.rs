use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod io;

use commands::query;

#[derive(Parser)]
#[command(name = "xql", version, about = "Run XQL queries and collect their results")]
struct Cli {
    #[command(flatten)]
    connection: config::ConnectionArgs,
    /// Log request and poll activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a query, wait for it and print every row
    Query(query::QueryArgs),
    /// Wait for an already submitted query and print its rows
    Results(query::ResultsArgs),
    /// Download a result stream by id
    Stream(query::StreamArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = config::resolve_settings(&cli.connection)?;
    match cli.command {
        Commands::Query(args) => query::run_query(&settings, args),
        Commands::Results(args) => query::run_results(&settings, args),
        Commands::Stream(args) => query::run_stream(&settings, args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
