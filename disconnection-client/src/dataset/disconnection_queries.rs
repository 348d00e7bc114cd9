use std::{fs::File, io, path::Path};

use csv::StringRecord;

use time::{macros::format_description, Date};

use crate::domain::{
    format_iso_date, DisconnectionRecord, ReportingPeriod, UtilityName, DATASET_COLUMNS,
};

use super::DatasetError;

/// Inclusive bounds on `timestamp`'s year. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }
}

fn parse_optional_f64(s: &str) -> Result<Option<f64>, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let v: f64 = trimmed.parse().map_err(|e| format!("'{trimmed}': {e}"))?;
    Ok(if v.is_nan() { None } else { Some(v) })
}

fn format_optional_f64(v: Option<f64>) -> String {
    match v {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

fn record_to_disconnection(
    record: &StringRecord,
    headers: &StringRecord,
    line: u64,
) -> Result<DisconnectionRecord, DatasetError> {
    let invalid = |column: &str, message: String| DatasetError::InvalidValue {
        line,
        column: column.to_string(),
        message,
    };
    let get = |name: &str| -> Result<&str, DatasetError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    };

    let ts_str = get("timestamp")?;
    let timestamp = Date::parse(ts_str.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| invalid("timestamp", format!("'{ts_str}': {e}")))?;

    let reporting_period: ReportingPeriod = get("reporting_period")?
        .parse()
        .map_err(|e| invalid("reporting_period", format!("{e}")))?;
    let utility_name: UtilityName = get("utility_name")?
        .parse()
        .map_err(|e| invalid("utility_name", format!("{e}")))?;

    let numeric = |name: &str| -> Result<Option<f64>, DatasetError> {
        parse_optional_f64(get(name)?).map_err(|m| invalid(name, m))
    };

    Ok(DisconnectionRecord {
        timestamp,
        reporting_period,
        utility_name,
        residential_accounts: numeric("residential_accounts")?,
        disconnections: numeric("disconnections")?,
        disconnection_rate: numeric("disconnection_rate")?,
    })
}

/// Read the persisted dataset, keeping rows whose year falls in `years`.
pub fn read_disconnections<R: io::Read>(
    reader: R,
    years: YearRange,
) -> Result<Vec<DisconnectionRecord>, DatasetError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let rec = record_to_disconnection(&record, &headers, line)?;
        if years.contains(rec.timestamp.year()) {
            out.push(rec);
        }
    }
    Ok(out)
}

/// Load the disconnection dataset from `path`, optionally bounded by year.
pub fn load_disconnections(
    path: impl AsRef<Path>,
    years: YearRange,
) -> Result<Vec<DisconnectionRecord>, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_disconnections(file, years)
}

/// Write records in dataset column order. Callers are responsible for
/// ordering the records.
pub fn write_disconnections<W: io::Write>(
    writer: W,
    records: &[DisconnectionRecord],
) -> Result<(), DatasetError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(DATASET_COLUMNS)?;
    for r in records {
        wtr.write_record([
            format_iso_date(r.timestamp)?,
            r.reporting_period.to_string(),
            r.utility_name.to_string(),
            format_optional_f64(r.residential_accounts),
            format_optional_f64(r.disconnections),
            format_optional_f64(r.disconnection_rate),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
