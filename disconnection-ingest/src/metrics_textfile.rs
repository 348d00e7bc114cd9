use std::{fs, path::Path};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init() -> Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Render the current metrics in text exposition format to `path`.
pub fn write(path: &Path) -> Result<()> {
    let Some(handle) = PROM_HANDLE.get() else {
        anyhow::bail!("Prometheus recorder not initialized");
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, handle.render())
        .with_context(|| format!("failed to write metrics textfile {}", path.display()))?;
    tracing::debug!(path = %path.display(), "metrics textfile written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The recorder is process-global, so init and write are covered in one
    // test to keep the "not initialized" check ordered before install.
    #[test]
    fn renders_counters_to_textfile_after_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("disconnections.prom");

        assert!(write(&path).is_err());
        assert!(!path.exists());

        init().unwrap();
        init().unwrap();
        metrics::counter!("backfill_account_rows_total").increment(12);

        write(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# TYPE backfill_account_rows_total counter"), "{text}");
        let value: u64 = text
            .lines()
            .find_map(|l| l.strip_prefix("backfill_account_rows_total "))
            .and_then(|v| v.trim().parse().ok())
            .unwrap();
        assert!(value >= 12);
    }
}
