use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use xql_client::{QueryId, Record, ReqwestTransport, StreamHandle, XqlClient};

use crate::config::Settings;
use crate::io;

#[derive(Args)]
pub struct QueryArgs {
    /// XQL query text
    #[arg(required_unless_present = "file")]
    query: Option<String>,
    /// Read the query text from a file instead
    #[arg(short, long, conflicts_with = "query")]
    file: Option<PathBuf>,
    /// Relative time window, e.g. 15m, 2h, 1d
    #[arg(long, default_value = "1d")]
    since: String,
    #[arg(long)]
    limit: Option<u32>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
pub struct ResultsArgs {
    query_id: String,
    #[arg(long)]
    limit: Option<u32>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
pub struct StreamArgs {
    stream_id: String,
    /// Request a gzip-compressed stream body
    #[arg(long)]
    gzip: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Write rows to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print one pretty JSON array instead of JSON lines
    #[arg(long)]
    pretty: bool,
}

pub fn run_query(settings: &Settings, args: QueryArgs) -> Result<()> {
    let query = match (args.query, args.file) {
        (Some(query), _) => query,
        (None, Some(path)) => io::read_to_string(&path)?,
        (None, None) => bail!("A query or --file is required"),
    };
    if query.trim().is_empty() {
        bail!("Query text is empty");
    }

    let client = connect(settings)?;
    let output = client
        .run_query_with_stats(query.trim(), &args.since, settings.limit_or_default(args.limit))
        .context("XQL query failed")?;

    if let Some(total) = output.stats.number_of_results {
        tracing::info!(total, returned = output.records.len(), "query finished");
    }
    emit(&output.records, &args.output)
}

pub fn run_results(settings: &Settings, args: ResultsArgs) -> Result<()> {
    let client = connect(settings)?;
    let payload = client
        .poll(QueryId::new(args.query_id.trim()), settings.limit_or_default(args.limit))
        .context("Failed to get query results")?;
    let records = client
        .resolve(payload)
        .context("Failed to read query results")?;
    emit(&records, &args.output)
}

pub fn run_stream(settings: &Settings, args: StreamArgs) -> Result<()> {
    let mut stream = settings.stream;
    stream.gzip |= args.gzip;
    let client = connect(settings)?.with_stream_options(stream);
    let records = client
        .fetch_stream(&StreamHandle::new(args.stream_id.trim()))
        .context("Failed to fetch result stream")?;
    emit(&records, &args.output)
}

fn connect(settings: &Settings) -> Result<XqlClient<ReqwestTransport>> {
    let client = XqlClient::connect(&settings.client).context("Failed to create API client")?;
    Ok(client
        .with_poll_policy(settings.poll.clone())
        .with_stream_options(settings.stream))
}

fn emit(records: &[Record], output: &OutputArgs) -> Result<()> {
    let bytes = io::render_records(records, output.pretty)?;
    match &output.output {
        Some(path) => {
            io::write_output(path, &bytes)?;
            eprintln!("Wrote {} records to {}.", records.len(), path.display());
            Ok(())
        }
        None => io::write_stdout(&bytes),
    }
}
