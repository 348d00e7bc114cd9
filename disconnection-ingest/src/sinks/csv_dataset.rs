use std::{fs, path::PathBuf};

use disconnection_client::{dataset::write_disconnections, DisconnectionRecord};

use crate::pipeline::{PipelineError, Sink};

/// Persists the final dataset as a six-column CSV file.
pub struct CsvDatasetSink {
    path: PathBuf,
}

impl CsvDatasetSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl Sink<DisconnectionRecord> for CsvDatasetSink {
    fn write(&self, records: &[DisconnectionRecord]) -> Result<(), PipelineError> {
        let mut buf = Vec::new();
        write_disconnections(&mut buf, records).map_err(|e| PipelineError::Sink(e.to_string()))?;
        let digest = blake3::hash(&buf);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Sink(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(&self.path, &buf).map_err(|e| {
            tracing::error!(error = %e, path = %self.path.display(), "dataset write failed");
            PipelineError::Sink(format!("failed to write {}: {e}", self.path.display()))
        })?;

        metrics::counter!("dataset_rows_written_total").increment(records.len() as u64);
        tracing::info!(
            rows = records.len(),
            bytes = buf.len(),
            blake3 = %digest.to_hex(),
            path = %self.path.display(),
            "dataset written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disconnection_client::{load_disconnections, ReportingPeriod, UtilityName, YearRange};

    #[test]
    fn writes_dataset_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("disconnections.csv");

        let period: ReportingPeriod = "Aug 2022".parse().unwrap();
        let mut r = DisconnectionRecord::new(period, UtilityName::DukeEnergyCarolinas);
        r.disconnections = Some(1234.0);
        r.residential_accounts = Some(500_000.0);
        r.disconnection_rate = Some(0.002468);

        CsvDatasetSink::new(&path).write(&[r.clone()]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "timestamp,reporting_period,utility_name,residential_accounts,disconnections,disconnection_rate\n"
        ));
        assert!(text.contains("2022-08-01,Aug 2022,Duke Energy Carolinas,500000,1234,0.002468"));

        let back = load_disconnections(&path, YearRange::default()).unwrap();
        assert_eq!(back, vec![r]);
    }

    #[test]
    fn identical_datasets_produce_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let period: ReportingPeriod = "Mar 2019".parse().unwrap();
        let records = vec![DisconnectionRecord::new(period, UtilityName::DominionEnergy)];

        CsvDatasetSink::new(&a).write(&records).unwrap();
        CsvDatasetSink::new(&b).write(&records).unwrap();
        assert_eq!(
            blake3::hash(&fs::read(&a).unwrap()),
            blake3::hash(&fs::read(&b).unwrap())
        );
    }
}
