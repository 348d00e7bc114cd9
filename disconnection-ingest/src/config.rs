use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{bail, Context};
use disconnection_client::domain::UtilityName;
use serde::Deserialize;

use crate::backfill::{default_eras, FilingLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Csv,
    Spreadsheet,
}

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Sheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    /// Leading data rows to drop after the header.
    #[serde(default)]
    pub skip_rows: usize,
    /// Raw column name -> canonical column name.
    #[serde(default)]
    pub column_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub current_docket: SourceConfig,
    pub prior_docket: SourceConfig,
    pub historical: SourceConfig,
}

/// How account and rate figures are reconciled after the filing merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    /// Keep reported account counts; derive accounts only where none were
    /// reported.
    #[default]
    PreserveReported,
    /// Recompute `accounts = disconnections / rate` for every row.
    DeriveFromRate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EraConfig {
    pub name: String,
    pub first_year: i32,
    pub last_year: i32,
    /// File name under `data_dir`, with `{year}` substituted.
    pub file_pattern: String,
    /// Column layouts, tried in order.
    pub layouts: Vec<FilingLayout>,
}

impl EraConfig {
    pub fn file_name(&self, year: i32) -> String {
        self.file_pattern.replace("{year}", &year.to_string())
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/dominion")
}

fn default_utility() -> UtilityName {
    UtilityName::DominionEnergy
}

fn default_filing_utility() -> String {
    "Virginia Electric & Power Co".to_string()
}

fn default_state() -> String {
    "NC".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Canonical utility the filings are attributed to.
    #[serde(default = "default_utility")]
    pub utility: UtilityName,
    /// Utility name as written in the filings.
    #[serde(default = "default_filing_utility")]
    pub filing_utility: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub reconciliation: Reconciliation,
    #[serde(default = "default_eras")]
    pub eras: Vec<EraConfig>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            utility: default_utility(),
            filing_utility: default_filing_utility(),
            state: default_state(),
            reconciliation: Reconciliation::default(),
            eras: default_eras(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text exposition written at the end of the run.
    pub textfile_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    pub output: OutputConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `path`, or from `DISCONNECTIONS_CONFIG`, or from
    /// `disconnections-config.toml` in the working directory.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        use std::env;

        let path = match path {
            Some(p) => p.to_string(),
            None => env::var("DISCONNECTIONS_CONFIG")
                .unwrap_or_else(|_| "disconnections-config.toml".to_string()),
        };
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config '{path}'"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let s = &self.sources;
        for (name, src) in [
            ("current_docket", &s.current_docket),
            ("prior_docket", &s.prior_docket),
            ("historical", &s.historical),
        ] {
            if !src.delimiter.is_ascii() {
                bail!("sources.{name}.delimiter must be a single ASCII character");
            }
        }

        for era in &self.backfill.eras {
            if era.first_year > era.last_year {
                bail!("backfill era '{}' has first_year after last_year", era.name);
            }
            if era.layouts.is_empty() {
                bail!("backfill era '{}' has no layouts", era.name);
            }
            if !era.file_pattern.contains("{year}") {
                bail!("backfill era '{}' file_pattern has no {{year}} placeholder", era.name);
            }
        }
        Ok(())
    }
}
