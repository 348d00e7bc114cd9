//! Column layouts of the legacy utility account filings.
//!
//! The filings changed shape several times between 2000 and 2020, often
//! without changing the file format. Each era lists the layouts seen in it;
//! a year's file is read with the first layout whose columns all exist.

use serde::Deserialize;
use time::{Date, Month};

use disconnection_client::domain::{month_from_name, UtilityName};

use crate::{
    config::EraConfig,
    sources::{Cell, MissingColumn, RawTable},
    transform::strip_thousands_separators,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilingLayout {
    pub utility_column: String,
    pub state_column: String,
    pub year_column: String,
    pub month_column: String,
    pub accounts_column: String,
}

impl FilingLayout {
    pub fn new(utility: &str, state: &str, year: &str, month: &str, accounts: &str) -> Self {
        Self {
            utility_column: utility.to_string(),
            state_column: state.to_string(),
            year_column: year.to_string(),
            month_column: month.to_string(),
            accounts_column: accounts.to_string(),
        }
    }

    fn with_state(mut self, state: &str) -> Self {
        self.state_column = state.to_string();
        self
    }

    fn with_accounts(mut self, accounts: &str) -> Self {
        self.accounts_column = accounts.to_string();
        self
    }
}

/// Eras and layouts of the Virginia Electric & Power Co (Dominion) filings.
pub fn default_eras() -> Vec<EraConfig> {
    // The 2017+ sales workbooks misspell "CHARACTERISTICS"; some 2013-2016
    // files already use that header.
    let retail_sales = FilingLayout::new(
        "Unnamed: 3",
        "Unnamed: 4",
        "UTILITY CHARATERISTICS",
        "Unnamed: 1",
        "Unnamed: 9",
    );
    let f826 = FilingLayout::new(
        "Unnamed: 3",
        "Unnamed: 4",
        "UTILITY CHARACTERISTICS",
        "Unnamed: 1",
        "Unnamed: 8",
    );
    let f826_flat = FilingLayout::new("UTILNAME", "STATE_CODE", "YEAR", "MONTH", "RES_CONS ");

    vec![
        EraConfig {
            name: "2017-2020".to_string(),
            first_year: 2017,
            last_year: 2020,
            file_pattern: "retail_sales_{year}.xlsx".to_string(),
            layouts: vec![retail_sales.clone()],
        },
        EraConfig {
            name: "2013-2016".to_string(),
            first_year: 2013,
            last_year: 2016,
            file_pattern: "f826{year}.xls".to_string(),
            layouts: vec![f826, retail_sales],
        },
        EraConfig {
            name: "2000-2012".to_string(),
            first_year: 2000,
            last_year: 2012,
            file_pattern: "f826{year}.xls".to_string(),
            layouts: vec![
                f826_flat.clone(),
                f826_flat.clone().with_state("STATE"),
                f826_flat.with_accounts("RESIDENTIAL CUSTOMERS"),
            ],
        },
    ]
}

/// Which filing rows to keep and which canonical utility they belong to.
#[derive(Debug, Clone, Copy)]
pub struct FilingTarget<'a> {
    pub utility: UtilityName,
    pub filing_utility: &'a str,
    pub state: &'a str,
}

/// Residential account count for one utility and month.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub utility: UtilityName,
    pub timestamp: Date,
    pub residential_accounts: Option<f64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error(transparent)]
    MissingColumn(#[from] MissingColumn),
    #[error("data row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Year from a numeric cell or from the first four characters of text
/// ("2005R" -> 2005).
fn filing_year(cell: &Cell) -> Option<i32> {
    match cell {
        Cell::Number(v) if v.fract() == 0.0 && v.abs() < 10_000.0 => Some(*v as i32),
        Cell::Text(s) => s.trim().get(..4)?.parse().ok(),
        _ => None,
    }
}

fn filing_month(cell: &Cell) -> Option<Month> {
    match cell {
        Cell::Number(v) if v.fract() == 0.0 && (1.0..=12.0).contains(v) => {
            Month::try_from(*v as u8).ok()
        }
        Cell::Text(s) => match s.trim().parse::<u8>() {
            Ok(m) => Month::try_from(m).ok(),
            Err(_) => month_from_name(s),
        },
        _ => None,
    }
}

fn filing_accounts(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Text(s) => match strip_thousands_separators(s) {
            Some(clean) => Cell::Text(clean).to_f64(),
            None => cell.to_f64(),
        },
        _ => cell.to_f64(),
    }
}

/// Extract the target utility's monthly account counts with one layout.
///
/// Fails with `MissingColumn` when the table does not have this layout.
pub fn extract_accounts(
    table: &RawTable,
    layout: &FilingLayout,
    target: &FilingTarget<'_>,
) -> Result<Vec<AccountRow>, LayoutError> {
    let utility_idx = table.column_index(&layout.utility_column)?;
    let state_idx = table.column_index(&layout.state_column)?;
    let year_idx = table.column_index(&layout.year_column)?;
    let month_idx = table.column_index(&layout.month_column)?;
    let accounts_idx = table.column_index(&layout.accounts_column)?;

    let mut out = Vec::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let text = |idx: usize| row[idx].as_text().map(str::trim);
        if text(utility_idx) != Some(target.filing_utility) || text(state_idx) != Some(target.state) {
            continue;
        }

        let invalid = |message: String| LayoutError::InvalidRow {
            row: row_no + 1,
            message,
        };
        let year = filing_year(&row[year_idx])
            .ok_or_else(|| invalid(format!("invalid year {:?}", row[year_idx])))?;
        let month = filing_month(&row[month_idx])
            .ok_or_else(|| invalid(format!("invalid month {:?}", row[month_idx])))?;
        let timestamp = Date::from_calendar_date(year, month, 1)
            .map_err(|e| invalid(format!("invalid date: {e}")))?;

        out.push(AccountRow {
            utility: target.utility,
            timestamp,
            residential_accounts: filing_accounts(&row[accounts_idx]),
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackError {
    /// No layout had all of its columns; holds the first missing column of
    /// each layout tried.
    Exhausted(Vec<String>),
    Invalid { layout: usize, error: LayoutError },
}

/// Try each layout in order until one has all of its columns.
///
/// Returns the index of the layout used together with the extracted rows.
/// Only a missing column moves on to the next layout; malformed rows in a
/// matching layout are an error.
pub fn extract_with_fallback(
    table: &RawTable,
    layouts: &[FilingLayout],
    target: &FilingTarget<'_>,
) -> Result<(usize, Vec<AccountRow>), FallbackError> {
    let mut missing = Vec::with_capacity(layouts.len());
    for (idx, layout) in layouts.iter().enumerate() {
        match extract_accounts(table, layout, target) {
            Ok(rows) => return Ok((idx, rows)),
            Err(LayoutError::MissingColumn(MissingColumn(column))) => {
                tracing::debug!(layout = idx, column = %column, "filing layout mismatch, trying next");
                metrics::counter!("backfill_layout_fallbacks_total").increment(1);
                missing.push(column);
            }
            Err(error) => return Err(FallbackError::Invalid { layout: idx, error }),
        }
    }
    Err(FallbackError::Exhausted(missing))
}
