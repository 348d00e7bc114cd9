//! Residential account backfill from the legacy per-year utility filings.

pub mod layout;
pub mod reconcile;

use std::path::Path;

use disconnection_client::domain::DisconnectionRecord;

use crate::{
    config::BackfillConfig,
    pipeline::{PipelineError, Source, Transform},
    sources::{RawTable, SpreadsheetFileSource},
};

pub use layout::{
    default_eras, extract_accounts, extract_with_fallback, AccountRow, FallbackError, FilingLayout,
    FilingTarget, LayoutError,
};
pub use reconcile::{reconcile, AccountTable};

/// Reads one year's filing into a table.
pub trait FilingReader {
    fn read_filing(&self, path: &Path) -> Result<RawTable, PipelineError>;
}

impl<F> FilingReader for F
where
    F: Fn(&Path) -> Result<RawTable, PipelineError>,
{
    fn read_filing(&self, path: &Path) -> Result<RawTable, PipelineError> {
        self(path)
    }
}

/// Filings stored as `.xls`/`.xlsx` workbooks; the first sheet is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetFilings;

impl FilingReader for SpreadsheetFilings {
    fn read_filing(&self, path: &Path) -> Result<RawTable, PipelineError> {
        SpreadsheetFileSource::new(path).read()
    }
}

pub struct LegacyAccountBackfill {
    cfg: BackfillConfig,
    reader: Box<dyn FilingReader>,
}

impl LegacyAccountBackfill {
    pub fn from_config(cfg: &BackfillConfig) -> Self {
        Self::with_reader(cfg.clone(), SpreadsheetFilings)
    }

    pub fn with_reader<R: FilingReader + 'static>(cfg: BackfillConfig, reader: R) -> Self {
        Self {
            cfg,
            reader: Box::new(reader),
        }
    }

    /// Read every configured era and year into one account table.
    pub fn account_table(&self) -> Result<AccountTable, PipelineError> {
        let target = FilingTarget {
            utility: self.cfg.utility,
            filing_utility: &self.cfg.filing_utility,
            state: &self.cfg.state,
        };

        let mut parts = Vec::new();
        for era in &self.cfg.eras {
            for year in era.first_year..=era.last_year {
                let path = self.cfg.data_dir.join(era.file_name(year));
                let table = self.reader.read_filing(&path)?;

                let rows = match extract_with_fallback(&table, &era.layouts, &target) {
                    Ok((layout, rows)) => {
                        tracing::debug!(era = %era.name, year, layout, rows = rows.len(), "filing read");
                        rows
                    }
                    Err(FallbackError::Exhausted(missing)) => {
                        return Err(PipelineError::LayoutExhausted {
                            era: era.name.clone(),
                            year,
                            path: path.display().to_string(),
                            missing,
                        })
                    }
                    Err(FallbackError::Invalid { layout, error }) => {
                        return Err(PipelineError::Backfill(format!(
                            "era '{}' year {year} ({}), layout {layout}: {error}",
                            era.name,
                            path.display()
                        )))
                    }
                };
                if rows.is_empty() {
                    tracing::warn!(era = %era.name, year, path = %path.display(), "filing has no rows for target utility");
                }
                parts.push(rows);
            }
        }

        let table = AccountTable::concat(parts);
        metrics::counter!("backfill_account_rows_total").increment(table.len() as u64);
        tracing::info!(rows = table.len(), utility = %self.cfg.utility, "filing accounts loaded");
        Ok(table)
    }
}

impl Transform<Vec<DisconnectionRecord>, Vec<DisconnectionRecord>> for LegacyAccountBackfill {
    fn apply(&self, input: Vec<DisconnectionRecord>) -> Result<Vec<DisconnectionRecord>, PipelineError> {
        let filings = self.account_table()?;
        Ok(reconcile(input, &filings, self.cfg.reconciliation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EraConfig, sources::Cell};
    use disconnection_client::domain::{ReportingPeriod, UtilityName};

    fn flat_filing(state_header: &str, rows: &[(&str, &str, f64, f64, f64)]) -> RawTable {
        let mut t = RawTable::new(
            ["UTILNAME", state_header, "YEAR", "MONTH", "RES_CONS "]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for (name, state, year, month, accounts) in rows {
            t.push_row(vec![
                Cell::text(*name),
                Cell::text(*state),
                Cell::Number(*year),
                Cell::Number(*month),
                Cell::Number(*accounts),
            ]);
        }
        t
    }

    fn config(first_year: i32, last_year: i32) -> BackfillConfig {
        let flat = default_eras().pop().unwrap();
        BackfillConfig {
            eras: vec![EraConfig {
                first_year,
                last_year,
                ..flat
            }],
            ..BackfillConfig::default()
        }
    }

    fn reader(path: &Path) -> Result<RawTable, PipelineError> {
        const VEPCO: &str = "Virginia Electric & Power Co";
        match path.file_name().and_then(|n| n.to_str()) {
            Some("f8262004.xls") => Ok(flat_filing(
                "STATE_CODE",
                &[
                    (VEPCO, "NC", 2004.0, 1.0, 100_000.0),
                    (VEPCO, "VA", 2004.0, 1.0, 2_000_000.0),
                    ("Duke Energy Carolinas", "NC", 2004.0, 1.0, 1.0),
                ],
            )),
            Some("f8262005.xls") => Ok(flat_filing("STATE", &[(VEPCO, "NC", 2005.0, 2.0, 101_000.0)])),
            Some("f8262006.xls") => Ok(RawTable::new(vec!["UTILNAME".into(), "TOTAL".into()])),
            other => Err(PipelineError::Source(format!("no fixture for {other:?}"))),
        }
    }

    #[test]
    fn builds_one_table_across_years_and_layouts() {
        let backfill = LegacyAccountBackfill::with_reader(config(2004, 2005), reader);
        let table = backfill.account_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(UtilityName::DominionEnergy, time::macros::date!(2005 - 02 - 01)),
            Some(101_000.0)
        );
    }

    #[test]
    fn exhausted_layouts_name_era_year_and_file() {
        let backfill = LegacyAccountBackfill::with_reader(config(2006, 2006), reader);
        match backfill.account_table() {
            Err(PipelineError::LayoutExhausted { era, year, path, .. }) => {
                assert_eq!(era, "2000-2012");
                assert_eq!(year, 2006);
                assert!(path.ends_with("f8262006.xls"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_filing_is_fatal() {
        let backfill = LegacyAccountBackfill::with_reader(config(2004, 2007), reader);
        assert!(backfill.account_table().is_err());
    }

    #[test]
    fn backfill_fills_historical_rates_and_accounts() {
        let backfill = LegacyAccountBackfill::with_reader(config(2004, 2005), reader);
        let period: ReportingPeriod = "Jan 2004".parse().unwrap();
        let mut historical = DisconnectionRecord::new(period, UtilityName::DominionEnergy);
        historical.disconnections = Some(500.0);

        let out = backfill.apply(vec![historical]).unwrap();
        assert!((out[0].disconnection_rate.unwrap() - 0.005).abs() < 1e-12);
        assert!((out[0].residential_accounts.unwrap() - 100_000.0).abs() < 1e-6);
    }
}
