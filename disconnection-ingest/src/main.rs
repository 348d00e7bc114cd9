use std::{collections::BTreeMap, env};

use anyhow::Result;
use disconnection_client::UtilityName;
use disconnection_ingest::{
    config::AppConfig, metrics_textfile, observability, pipeline::Pipeline, sinks::CsvDatasetSink,
};

fn main() -> Result<()> {
    observability::init_tracing();

    // Optional config path; falls back to DISCONNECTIONS_CONFIG.
    let config_path = env::args().nth(1);
    let cfg = AppConfig::load(config_path.as_deref())?;

    if cfg.metrics.is_some() {
        metrics_textfile::init()?;
    }

    let sink = CsvDatasetSink::new(&cfg.output.path);
    let dataset = Pipeline::from_config(&cfg, sink).run()?;

    let mut per_utility: BTreeMap<UtilityName, usize> = BTreeMap::new();
    for r in &dataset {
        *per_utility.entry(r.utility_name).or_default() += 1;
    }
    for (utility, rows) in &per_utility {
        tracing::info!(utility = %utility, rows, "utility rows");
    }
    tracing::info!(
        rows = dataset.len(),
        first = ?dataset.first().map(|r| r.reporting_period.to_string()),
        last = ?dataset.last().map(|r| r.reporting_period.to_string()),
        output = %cfg.output.path.display(),
        "disconnection dataset built"
    );

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_textfile::write(&metrics_cfg.textfile_path)?;
    }

    Ok(())
}
