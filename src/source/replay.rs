use std::fs;
use std::path::Path;

use tokio::sync::mpsc;

use super::SourceError;
use crate::record::PpiRecord;

/// Parse a recording: one interval per line, optionally followed by `,0`/`,1`
/// for the validity flag. Blank lines and `#` comments are skipped.
pub fn parse_records(text: &str) -> Result<Vec<PpiRecord>, SourceError> {
    let mut records = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let parse_err = |message: String| SourceError::Parse {
            line: idx + 1,
            message,
        };

        let mut fields = line.split(',').map(str::trim);
        let value = fields
            .next()
            .unwrap_or("")
            .parse::<u16>()
            .map_err(|e| parse_err(format!("bad interval: {e}")))?;
        let valid = match fields.next() {
            None | Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(other) => return Err(parse_err(format!("bad validity flag {other:?}"))),
        };
        records.push(PpiRecord { value, valid });
    }
    Ok(records)
}

/// Push every record of the file at `path` into the queue, in order.
pub async fn replay_file(path: &Path, tx: mpsc::Sender<PpiRecord>) -> Result<usize, SourceError> {
    let text = fs::read_to_string(path)?;
    let records = parse_records(&text)?;
    tracing::info!(path = %path.display(), records = records.len(), "replaying recording");
    for record in &records {
        tx.send(*record).await.map_err(|_| SourceError::QueueClosed)?;
    }
    Ok(records.len())
}
