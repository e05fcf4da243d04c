//! Newline-delimited JSON input for the `bulk-load` binary.

use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::transport::BulkTransport;
use crate::writer::BulkWriter;
use crate::Record;

/// Boxed line source: a file or stdin.
pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Opens `path`, or stdin when `None`.
///
/// # Errors
///
/// Fails if the file cannot be opened.
pub async fn open_input(path: Option<&Path>) -> anyhow::Result<Input> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Dispatches every JSON object line of `reader` through `writer`.
///
/// Blank lines are ignored. Returns the number of lines read.
///
/// # Errors
///
/// Fails on the first line that is not a JSON object or that the writer
/// rejects; the error names the line number.
pub async fn dispatch_lines<T, R>(writer: &mut BulkWriter<T>, reader: R) -> anyhow::Result<u64>
where
    T: BulkTransport,
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0u64;
    while let Some(line) = lines.next_line().await? {
        count += 1;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(&line)
            .with_context(|| format!("line {count} is not valid JSON"))?;
        let Value::Object(doc) = value else {
            anyhow::bail!("line {count} is not a JSON object");
        };
        writer
            .dispatch(Record::Mapping(doc))
            .await
            .with_context(|| format!("line {count} was rejected"))?;
    }
    Ok(count)
}
