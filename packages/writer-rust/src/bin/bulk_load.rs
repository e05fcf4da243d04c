//! Loads newline-delimited JSON records into a target collection.
//!
//! Usage: `bulk-load --resource logs --id-field rid < records.ndjson`

use std::path::PathBuf;

use clap::Parser;
use docbulk_writer::ndjson::{dispatch_lines, open_input};
use docbulk_writer::{BulkWriter, HttpTransport, WriterArgs, WriterConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bulk-load", about = "Buffered bulk loader for newline-delimited JSON records")]
struct Cli {
    #[command(flatten)]
    writer: WriterArgs,

    /// Input file; stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WriterConfig::from(cli.writer);
    // Everything fallible happens before the writer exists, so every path
    // past this point reaches `close`.
    let input = open_input(cli.input.as_deref()).await?;
    let transport = HttpTransport::new(&config.nodes, config.request_timeout)?;
    let mut writer = BulkWriter::new(&config, transport)?;

    let pumped = dispatch_lines(&mut writer, input).await;
    let closed = writer.close().await;
    let lines = match pumped {
        Ok(lines) => lines,
        Err(err) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "close after failed load also failed");
            }
            return Err(err);
        }
    };
    let stats = closed?;
    info!(
        lines,
        operations = stats.operations,
        bulk_requests = stats.bulk_requests,
        bytes = stats.bytes_flushed,
        refreshed = stats.refreshed,
        "load complete"
    );
    Ok(())
}
