pub mod csv_file;
pub mod spreadsheet_file;
pub mod table;

pub use csv_file::CsvFileSource;
pub use spreadsheet_file::SpreadsheetFileSource;
pub use table::{Cell, MissingColumn, RawTable};

use crate::{
    config::{SourceConfig, SourceKind},
    pipeline::Source,
};

/// Build the reader for a configured source.
pub fn open(cfg: &SourceConfig) -> Box<dyn Source<RawTable>> {
    match cfg.kind {
        SourceKind::Csv => Box::new(
            CsvFileSource::new(&cfg.path)
                .with_delimiter(cfg.delimiter)
                .skip_rows(cfg.skip_rows),
        ),
        SourceKind::Spreadsheet => Box::new(
            SpreadsheetFileSource::new(&cfg.path)
                .with_sheet(cfg.sheet.clone())
                .skip_rows(cfg.skip_rows),
        ),
    }
}
