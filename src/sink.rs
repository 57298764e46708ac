use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::types::CaseRecord;

/// Width of the separator line between record blocks.
const SEPARATOR_WIDTH: usize = 30;

/// Flat-file sink for extracted case records.
///
/// Writes one plain-text file per run, named after the search input, with
/// each record rendered as five labeled lines and a dashed separator.
pub struct TextSink {
    dir: PathBuf,
}

impl TextSink {
    /// Sink writing into `dir`. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write all records for `search_name` and return the created path,
    /// or `None` when there is nothing to write (no file is created for
    /// an empty run).
    pub fn write(&self, search_name: &str, records: &[CaseRecord]) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            info!("No results to save");
            return Ok(None);
        }

        let path = self.dir.join(file_name(search_name));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        let mut out = BufWriter::new(file);

        for record in records {
            write_block(&mut out, record)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        out.flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;

        info!("All {} results saved to {}", records.len(), path.display());
        Ok(Some(path))
    }
}

fn write_block(out: &mut impl Write, record: &CaseRecord) -> std::io::Result<()> {
    writeln!(out, "Case Number: {}", record.case_number)?;
    writeln!(out, "Case Link: {}", record.case_link)?;
    writeln!(out, "Type: {}", record.case_type)?;
    writeln!(out, "Location: {}", record.location)?;
    writeln!(out, "Party Name: {}", record.party_name)?;
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))
}

/// Output file name for a search input: whitespace becomes underscores,
/// path separators are dropped so the name cannot escape the output
/// directory. A name that sanitizes to nothing gets a placeholder stem.
pub fn file_name(search_name: &str) -> String {
    let sanitized: String = search_name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !matches!(c, '/' | '\\'))
        .collect();
    if sanitized.is_empty() {
        return "search_results.txt".to_string();
    }
    format!("{sanitized}_results.txt")
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
