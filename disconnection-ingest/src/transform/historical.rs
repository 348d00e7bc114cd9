use disconnection_client::domain::{month_from_name, DisconnectionRecord, ReportingPeriod};

use crate::{
    pipeline::{PipelineError, Transform},
    sources::{Cell, RawTable},
};

use super::standardize_utility_name;

pub const MONTH: &str = "month";
pub const YEAR: &str = "year";
pub const DISCONNECTION_RATE: &str = "disconnection_rate";
pub const DISCONNECTIONS: &str = "disconnections";
pub const UTILITY_NAME: &str = "utility_name";

/// Whole-number year from a numeric or text cell ("2019", "2019.0").
fn year_of(cell: &Cell) -> Option<i32> {
    let v = cell.to_f64()?;
    (v.fract() == 0.0 && v.abs() < 10_000.0).then_some(v as i32)
}

/// Legacy pre-docket dataset: full month names, a year column and a
/// percentage rate.
#[derive(Debug, Clone, Copy)]
pub struct HistoricalPreprocessor {
    /// First period covered by the docket sources; historical rows from this
    /// period on are dropped.
    pub cutoff: ReportingPeriod,
}

impl Default for HistoricalPreprocessor {
    fn default() -> Self {
        Self {
            cutoff: docket_reporting_start(),
        }
    }
}

/// Aug 2022, when disconnection reporting moved to the monthly docket.
pub fn docket_reporting_start() -> ReportingPeriod {
    ReportingPeriod::containing(time::macros::date!(2022 - 08 - 01))
}

impl Transform<RawTable, Vec<DisconnectionRecord>> for HistoricalPreprocessor {
    fn apply(&self, input: RawTable) -> Result<Vec<DisconnectionRecord>, PipelineError> {
        let col = |name: &str| {
            input
                .column_index(name)
                .map_err(|e| PipelineError::Transform(format!("historical source: {e}")))
        };
        let month_idx = col(MONTH)?;
        let year_idx = col(YEAR)?;
        let rate_idx = col(DISCONNECTION_RATE)?;
        let name_idx = col(UTILITY_NAME)?;
        let disconnections_idx = input.column_index(DISCONNECTIONS).ok();

        let mut out = Vec::with_capacity(input.len());
        let mut after_cutoff = 0u64;
        let mut unplaceable = 0u64;

        for (row_no, row) in input.rows.iter().enumerate() {
            let month_name = row[month_idx].as_text().unwrap_or_default();
            let period = month_from_name(month_name)
                .zip(year_of(&row[year_idx]))
                .and_then(|(month, year)| ReportingPeriod::new(year, month).ok());
            let Some(period) = period else {
                unplaceable += 1;
                tracing::warn!(row = row_no + 1, month = month_name, year = ?row[year_idx], "historical row dropped: no reporting period");
                continue;
            };

            if period >= self.cutoff {
                after_cutoff += 1;
                continue;
            }

            let raw_name = row[name_idx].as_text().unwrap_or_default();
            let Some(utility_name) = standardize_utility_name(raw_name) else {
                unplaceable += 1;
                tracing::warn!(row = row_no + 1, utility = raw_name, "historical row dropped: no canonical utility name");
                continue;
            };

            let mut r = DisconnectionRecord::new(period, utility_name);
            r.disconnection_rate = row[rate_idx].to_f64().map(|pct| pct / 100.0);
            r.disconnections = disconnections_idx.and_then(|i| row[i].to_f64());
            out.push(r);
        }

        metrics::counter!("historical_rows_after_cutoff_total").increment(after_cutoff);
        metrics::counter!("historical_rows_dropped_total").increment(unplaceable);
        tracing::debug!(
            rows = out.len(),
            after_cutoff,
            dropped = unplaceable,
            cutoff = %self.cutoff,
            "historical table preprocessed"
        );

        Ok(out)
    }
}
