use std::path::PathBuf;

use calamine::{open_workbook_auto, Data, Range, Reader};
use time::Date;

use disconnection_client::domain::parse_iso_date;

use crate::pipeline::{PipelineError, Source};

use super::table::{Cell, RawTable};

/// Julian day of 1899-12-30, day zero of Excel's 1900 date system.
const EXCEL_EPOCH_JULIAN_DAY: i32 = 2_415_019;

/// Spreadsheet source (xls, xlsx, xlsb, ods).
///
/// The first row of the sheet is the header. Blank header cells are named
/// `Unnamed: <column index>` so layouts can address them by position.
pub struct SpreadsheetFileSource {
    path: PathBuf,
    sheet: Option<String>,
    skip_rows: usize,
}

impl SpreadsheetFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            sheet: None,
            skip_rows: 0,
        }
    }

    /// Read the named sheet instead of the first one.
    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn skip_rows(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }
}

fn excel_serial_to_date(serial: f64) -> Option<Date> {
    if !serial.is_finite() {
        return None;
    }
    let days = i32::try_from(serial.floor() as i64).ok()?;
    Date::from_julian_day(EXCEL_EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

fn header_name(idx: usize, cell: &Data) -> String {
    match cell {
        Data::String(s) if !s.is_empty() => s.clone(),
        Data::Empty => format!("Unnamed: {idx}"),
        Data::String(_) => format!("Unnamed: {idx}"),
        other => other.to_string(),
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_date(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Materialize a sheet range into a table.
///
/// calamine trims leading empty columns from the used range; they are put
/// back so `Unnamed: <idx>` counts from column A. Leading empty rows are
/// skipped, so the header is the first non-empty row.
pub fn range_to_table(range: &Range<Data>, skip_rows: usize) -> RawTable {
    let col_offset = range.start().map_or(0, |(_, col)| col as usize);
    let leading = || std::iter::repeat(Cell::Empty).take(col_offset);

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => (0..col_offset)
            .map(|idx| format!("Unnamed: {idx}"))
            .chain(
                header_row
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| header_name(col_offset + idx, cell)),
            )
            .collect(),
        None => Vec::new(),
    };

    let mut table = RawTable::new(headers);
    for row in rows.skip(skip_rows) {
        table.push_row(leading().chain(row.iter().map(to_cell)).collect());
    }
    table
}

impl Source<RawTable> for SpreadsheetFileSource {
    fn read(&self) -> Result<RawTable, PipelineError> {
        let source_err = |what: &str, e: &dyn std::fmt::Display| {
            PipelineError::Source(format!("{what} '{}': {e}", self.path.display()))
        };

        let mut workbook =
            open_workbook_auto(&self.path).map_err(|e| source_err("failed to open spreadsheet", &e))?;

        let sheet = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| source_err("spreadsheet has no sheets", &"empty workbook"))?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| source_err(&format!("failed to read sheet '{sheet}' of"), &e))?;

        let table = range_to_table(&range, self.skip_rows);
        tracing::debug!(
            path = %self.path.display(),
            sheet = %sheet,
            rows = table.len(),
            "spreadsheet source read"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample_range() -> Range<Data> {
        let mut range = Range::new((0, 0), (2, 3));
        range.set_value((0, 0), Data::String("UTILITY CHARATERISTICS".into()));
        range.set_value((0, 2), Data::String("RES_CONS ".into()));
        range.set_value((0, 3), Data::Float(2017.0));
        range.set_value((1, 0), Data::String("Year".into()));
        range.set_value((2, 0), Data::Float(2017.0));
        range.set_value((2, 1), Data::Int(3));
        range.set_value((2, 2), Data::String("1,234".into()));
        range.set_value((2, 3), Data::DateTimeIso("2022-08-01T00:00:00".into()));
        range
    }

    #[test]
    fn blank_headers_are_named_by_position() {
        let table = range_to_table(&sample_range(), 0);
        assert_eq!(
            table.headers,
            vec!["UTILITY CHARATERISTICS", "Unnamed: 1", "RES_CONS ", "2017"]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unnamed_headers_count_from_column_a() {
        // Used range starts at B2: column A and row 1 are empty.
        let mut range = Range::new((1, 1), (2, 3));
        range.set_value((1, 1), Data::String("UTILITY CHARATERISTICS".into()));
        range.set_value((1, 3), Data::String("RES".into()));
        range.set_value((2, 1), Data::Float(2018.0));
        range.set_value((2, 2), Data::String("Virginia Electric & Power Co".into()));
        range.set_value((2, 3), Data::Int(5));

        let table = range_to_table(&range, 0);
        assert_eq!(
            table.headers,
            vec!["Unnamed: 0", "UTILITY CHARATERISTICS", "Unnamed: 2", "RES"]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Empty,
                Cell::Number(2018.0),
                Cell::text("Virginia Electric & Power Co"),
                Cell::Number(5.0),
            ]
        );
        assert_eq!(table.column_index("Unnamed: 2"), Ok(2));
    }

    #[test]
    fn cells_keep_native_types() {
        let table = range_to_table(&sample_range(), 1);
        assert_eq!(table.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row[0], Cell::Number(2017.0));
        assert_eq!(row[1], Cell::Number(3.0));
        assert_eq!(row[2], Cell::text("1,234"));
        assert_eq!(row[3], Cell::Date(date!(2022 - 08 - 01)));
    }

    #[test]
    fn excel_serials_map_to_calendar_dates() {
        assert_eq!(excel_serial_to_date(36526.0), Some(date!(2000 - 01 - 01)));
        assert_eq!(excel_serial_to_date(44774.0), Some(date!(2022 - 08 - 01)));
        assert_eq!(excel_serial_to_date(44774.75), Some(date!(2022 - 08 - 01)));
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn missing_workbook_is_a_source_error() {
        let res = SpreadsheetFileSource::new("/nonexistent/dc_23.xlsx").read();
        assert!(matches!(res, Err(PipelineError::Source(_))));
    }
}
