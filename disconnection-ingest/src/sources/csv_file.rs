use std::{fs::File, io, path::PathBuf};

use crate::pipeline::{PipelineError, Source};

use super::table::{Cell, RawTable};

/// Delimited-text source.
///
/// The first line is the header; header names are kept verbatim (including
/// surrounding whitespace) because column maps match on them exactly. Short
/// rows are padded with empty cells.
pub struct CsvFileSource {
    path: PathBuf,
    delimiter: u8,
    skip_rows: usize,
}

impl CsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            skip_rows: 0,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        // Non-ASCII delimiters are rejected when the config is validated.
        self.delimiter = u8::try_from(delimiter).unwrap_or(b',');
        self
    }

    /// Drop this many data rows after the header.
    pub fn skip_rows(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }

    pub fn read_from<R: io::Read>(&self, reader: R) -> Result<RawTable, PipelineError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut table = RawTable::new(headers);
        for result in rdr.records().skip(self.skip_rows) {
            let record = result
                .map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))?;
            table.push_row(record.iter().map(Cell::text).collect());
        }
        Ok(table)
    }
}

impl Source<RawTable> for CsvFileSource {
    fn read(&self) -> Result<RawTable, PipelineError> {
        let file = File::open(&self.path).map_err(|e| {
            PipelineError::Source(format!(
                "failed to open CSV file '{}': {e}",
                self.path.display()
            ))
        })?;
        let table = self.read_from(file)?;
        tracing::debug!(path = %self.path.display(), rows = table.len(), "CSV source read");
        Ok(table)
    }
}
