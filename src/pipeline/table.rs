//! CSV output tables.

use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::debug;

use super::error::PipelineError;

/// Encodes a header and rows as CSV with `\n` line endings.
///
/// Cells holding a comma, a quote or a line break are quoted.
///
/// # Errors
///
/// Returns a [`csv::Error`] if a record cannot be encoded.
pub fn render_csv<H, R>(header: &[H], rows: &[R]) -> Result<Vec<u8>, csv::Error>
where
    H: AsRef<str>,
    R: AsRef<[String]>,
{
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(header.iter().map(AsRef::as_ref))?;
    for row in rows {
        writer.write_record(row.as_ref())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Writes a table to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if a row cannot be encoded and
/// [`PipelineError::Io`] if the directory or file cannot be written.
pub async fn write_csv<H, R>(path: &Path, header: &[H], rows: &[R]) -> Result<(), PipelineError>
where
    H: AsRef<str>,
    R: AsRef<[String]>,
{
    let encoded = render_csv(header, rows).map_err(|e| PipelineError::csv(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }

    tokio::fs::write(path, encoded)
        .await
        .map_err(|e| PipelineError::io(path, e))?;

    debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}
