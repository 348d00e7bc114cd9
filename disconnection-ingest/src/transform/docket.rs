//! Docket sources: the monthly disconnection filings, exported as a
//! spreadsheet (Aug 2022 onward) and as CSV (Feb-Jul 2022).

use std::collections::BTreeMap;

use time::{macros::format_description, parsing::Parsed, Date};

use disconnection_client::domain::{
    parse_iso_date, ratio, DisconnectionRecord, ReportingPeriod, UtilityName,
};

use crate::{
    pipeline::{PipelineError, Transform},
    sources::{Cell, RawTable},
};

use super::standardize_utility_name;

pub const UTILITY_TYPE: &str = "utility_type";
pub const UTILITY_NAME: &str = "utility_name";
pub const REPORTING_PERIOD: &str = "reporting_period";
pub const ACCOUNTS_DISCONNECTED: &str = "accounts_disconnected";
pub const ACCOUNTS: &str = "accounts";
pub const DISCONNECTED_UNDER_24H: &str = "accounts_disconnected_<24h";

const NON_NUMERIC_COLUMNS: [&str; 3] = [UTILITY_TYPE, UTILITY_NAME, REPORTING_PERIOD];

/// A docket row after filtering, retyping and metric derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct DocketRecord {
    pub reporting_period: ReportingPeriod,
    pub utility_name: UtilityName,
    pub disconnections: Option<f64>,
    pub accounts: Option<f64>,
    pub disconnected_under_24h: Option<f64>,
    /// `disconnections / accounts`
    pub disconnection_rate: Option<f64>,
    /// `1 - disconnected_under_24h / disconnections`
    pub over_24h_disconnection_rate: Option<f64>,
    /// Remaining source columns, coerced to numbers.
    pub other: BTreeMap<String, Option<f64>>,
}

impl From<DocketRecord> for DisconnectionRecord {
    fn from(d: DocketRecord) -> Self {
        let mut r = DisconnectionRecord::new(d.reporting_period, d.utility_name);
        r.disconnections = d.disconnections;
        r.residential_accounts = d.accounts;
        r.disconnection_rate = d.disconnection_rate;
        r
    }
}

/// `%m/%d/%y`, with two-digit years pivoting at 69 (69-99 -> 19xx).
fn parse_month_day_short_year(s: &str) -> Option<Date> {
    let mut parsed = Parsed::new();
    let rest = parsed
        .parse_items(
            s.trim().as_bytes(),
            format_description!("[month padding:none]/[day padding:none]/[year repr:last_two]"),
        )
        .ok()?;
    if !rest.is_empty() {
        return None;
    }
    let yy = i32::from(parsed.year_last_two()?);
    let year = if yy < 69 { 2000 + yy } else { 1900 + yy };
    Date::from_calendar_date(year, parsed.month()?, parsed.day()?.get()).ok()
}

/// Date of a reporting period cell. Text is tried as `%m/%d/%y` first and
/// then as an already-formatted ISO date.
fn reporting_date(cell: &Cell) -> Result<Date, String> {
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Text(s) => parse_month_day_short_year(s)
            .or_else(|| parse_iso_date(s))
            .ok_or_else(|| format!("unparseable reporting period '{s}'")),
        Cell::Number(n) => Err(format!("unparseable reporting period {n}")),
        Cell::Empty => Err("empty reporting period".to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocketPreprocessor;

impl DocketPreprocessor {
    pub fn records(&self, table: &RawTable) -> Result<Vec<DocketRecord>, PipelineError> {
        let col = |name: &str| {
            table
                .column_index(name)
                .map_err(|e| PipelineError::Transform(format!("docket source: {e}")))
        };
        let type_idx = col(UTILITY_TYPE)?;
        let name_idx = col(UTILITY_NAME)?;
        let period_idx = col(REPORTING_PERIOD)?;
        for required in [ACCOUNTS_DISCONNECTED, ACCOUNTS, DISCONNECTED_UNDER_24H] {
            col(required)?;
        }

        let numeric_columns: Vec<(usize, &str)> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !NON_NUMERIC_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (i, h.as_str()))
            .collect();

        let mut out = Vec::with_capacity(table.len());
        let mut filtered = 0u64;
        let mut unrecognized = 0u64;
        let mut coercion_failures = 0u64;

        for (row_no, row) in table.rows.iter().enumerate() {
            let raw_name = row[name_idx].as_text().unwrap_or_default();
            let is_electric = row[type_idx].as_text() == Some("Electric");
            if !is_electric || !(raw_name.contains("Duke") || raw_name.contains("Dominion")) {
                filtered += 1;
                continue;
            }

            let date = reporting_date(&row[period_idx]).map_err(|e| {
                PipelineError::Transform(format!("docket data row {}: {e}", row_no + 1))
            })?;

            let mut numeric: BTreeMap<String, Option<f64>> = BTreeMap::new();
            for &(idx, name) in &numeric_columns {
                let cell = &row[idx];
                let value = cell.to_f64();
                if value.is_none() && !cell.is_empty() {
                    coercion_failures += 1;
                    tracing::debug!(row = row_no + 1, column = name, cell = ?cell, "non-numeric cell coerced to missing");
                }
                numeric.insert(name.to_string(), value);
            }

            let Some(utility_name) = standardize_utility_name(raw_name) else {
                unrecognized += 1;
                tracing::warn!(utility = raw_name, "docket row dropped: no canonical utility name");
                continue;
            };

            let disconnections = numeric.remove(ACCOUNTS_DISCONNECTED).flatten();
            let accounts = numeric.remove(ACCOUNTS).flatten();
            let disconnected_under_24h = numeric.remove(DISCONNECTED_UNDER_24H).flatten();

            out.push(DocketRecord {
                reporting_period: ReportingPeriod::containing(date),
                utility_name,
                disconnections,
                accounts,
                disconnected_under_24h,
                disconnection_rate: ratio(disconnections, accounts),
                over_24h_disconnection_rate: ratio(disconnected_under_24h, disconnections)
                    .map(|r| 1.0 - r),
                other: numeric,
            });
        }

        metrics::counter!("docket_rows_filtered_total").increment(filtered);
        metrics::counter!("docket_rows_unrecognized_utility_total").increment(unrecognized);
        metrics::counter!("numeric_coercion_failures_total", "source" => "docket")
            .increment(coercion_failures);
        tracing::debug!(
            rows = out.len(),
            filtered,
            unrecognized,
            coercion_failures,
            "docket table preprocessed"
        );

        Ok(out)
    }
}

impl Transform<RawTable, Vec<DisconnectionRecord>> for DocketPreprocessor {
    fn apply(&self, input: RawTable) -> Result<Vec<DisconnectionRecord>, PipelineError> {
        let records = self.records(&input)?;
        Ok(records.into_iter().map(DisconnectionRecord::from).collect())
    }
}
