pub mod assemble;

use std::fmt;

use disconnection_client::domain::DisconnectionRecord;

use crate::{
    backfill::LegacyAccountBackfill,
    config::{AppConfig, SourceConfig},
    sources::{self, RawTable},
    transform::{Preprocessor, SchemaNormalizer},
};

pub use assemble::assemble;

/// Identifies one of the disconnection sources. Declaration order is the
/// deduplication precedence: earlier sources win on duplicate keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    CurrentDocket,
    PriorDocket,
    Historical,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentDocket => "current_docket",
            Self::PriorDocket => "prior_docket",
            Self::Historical => "historical",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record tagged with the source it came from.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub source: SourceId,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("backfill error: {0}")]
    Backfill(String),
    #[error("no filing layout matched for era '{era}' year {year} ({path}); missing columns: {missing:?}")]
    LayoutExhausted {
        era: String,
        year: i32,
        path: String,
        missing: Vec<String>,
    },
    #[error("sink error: {0}")]
    Sink(String),
    #[error("config error: {0}")]
    Config(String),
}

pub trait Source<T> {
    fn read(&self) -> Result<T, PipelineError>;
}

pub trait Transform<I, O> {
    fn apply(&self, input: I) -> Result<O, PipelineError>;
}

pub trait Sink<T> {
    fn write(&self, records: &[T]) -> Result<(), PipelineError>;
}

/// One disconnection source: where to read it, how to rename its columns and
/// which preprocessor shapes it into canonical records.
pub struct Input {
    pub id: SourceId,
    pub source: Box<dyn Source<RawTable>>,
    pub normalizer: SchemaNormalizer,
    pub preprocessor: Preprocessor,
}

impl Input {
    pub fn from_config(id: SourceId, cfg: &SourceConfig, preprocessor: Preprocessor) -> Self {
        Self {
            id,
            source: sources::open(cfg),
            normalizer: SchemaNormalizer::new(cfg.column_map.clone()),
            preprocessor,
        }
    }

    fn records(&self) -> Result<Vec<Envelope<DisconnectionRecord>>, PipelineError> {
        let raw = self.source.read()?;
        let normalized = self.normalizer.apply(raw)?;
        let records = self.preprocessor.apply(normalized)?;
        tracing::info!(source = %self.id, rows = records.len(), "source preprocessed");
        Ok(records
            .into_iter()
            .map(|payload| Envelope {
                payload,
                source: self.id,
            })
            .collect())
    }
}

/// Builds the canonical disconnection dataset from an ordered list of inputs.
pub struct Pipeline<K> {
    /// Inputs in deduplication precedence order.
    pub inputs: Vec<Input>,
    pub backfill: LegacyAccountBackfill,
    pub sink: K,
}

impl<K> Pipeline<K>
where
    K: Sink<DisconnectionRecord>,
{
    /// Wire the three configured sources in precedence order
    /// [current docket, prior docket, historical].
    pub fn from_config(cfg: &AppConfig, sink: K) -> Self {
        let s = &cfg.sources;
        Self {
            inputs: vec![
                Input::from_config(SourceId::CurrentDocket, &s.current_docket, Preprocessor::docket()),
                Input::from_config(SourceId::PriorDocket, &s.prior_docket, Preprocessor::docket()),
                Input::from_config(SourceId::Historical, &s.historical, Preprocessor::historical()),
            ],
            backfill: LegacyAccountBackfill::from_config(&cfg.backfill),
            sink,
        }
    }

    /// Read, normalize, assemble, backfill and persist. Returns the records
    /// that were written.
    pub fn run(self) -> Result<Vec<DisconnectionRecord>, PipelineError> {
        let mut batches = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            batches.push(input.records()?);
        }

        let assembled = assemble(batches);
        let mut dataset = self.backfill.apply(assembled)?;
        dataset.sort_by_key(|r| r.timestamp);

        self.sink.write(&dataset)?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashSet, path::Path, rc::Rc};

    use disconnection_client::domain::UtilityName;

    use super::*;
    use crate::{
        backfill::FilingLayout,
        config::{BackfillConfig, EraConfig},
        sources::Cell,
    };

    struct TableSource(RawTable);

    impl Source<RawTable> for TableSource {
        fn read(&self) -> Result<RawTable, PipelineError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Clone, Default)]
    struct CaptureSink(Rc<RefCell<Vec<DisconnectionRecord>>>);

    impl Sink<DisconnectionRecord> for CaptureSink {
        fn write(&self, records: &[DisconnectionRecord]) -> Result<(), PipelineError> {
            self.0.borrow_mut().extend_from_slice(records);
            Ok(())
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut t = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|s| Cell::text(*s)).collect());
        }
        t
    }

    fn docket(rows: &[&[&str]]) -> RawTable {
        table(
            &[
                "Utility",
                "utility_type",
                "reporting_period",
                "accounts_disconnected",
                "accounts",
                "accounts_disconnected_<24h",
            ],
            rows,
        )
    }

    fn input(id: SourceId, raw: RawTable, preprocessor: Preprocessor) -> Input {
        let column_map = [("Utility".to_string(), "utility_name".to_string())].into();
        Input {
            id,
            source: Box::new(TableSource(raw)),
            normalizer: SchemaNormalizer::new(column_map),
            preprocessor,
        }
    }

    fn filing(_: &Path) -> Result<RawTable, PipelineError> {
        Ok(table(
            &["UTILNAME", "STATE_CODE", "YEAR", "MONTH", "RES_CONS "],
            &[&["Virginia Electric & Power Co", "NC", "2010", "5", "100,000"]],
        ))
    }

    fn backfill() -> LegacyAccountBackfill {
        let layout = FilingLayout::new("UTILNAME", "STATE_CODE", "YEAR", "MONTH", "RES_CONS ");
        let cfg = BackfillConfig {
            eras: vec![EraConfig {
                name: "2010".to_string(),
                first_year: 2010,
                last_year: 2010,
                file_pattern: "f826{year}.xls".to_string(),
                layouts: vec![layout],
            }],
            ..BackfillConfig::default()
        };
        LegacyAccountBackfill::with_reader(cfg, filing)
    }

    #[test]
    fn builds_deduplicated_backfilled_dataset() {
        let current = docket(&[
            &["Duke Energy Carolinas - Electric", "Electric", "08/01/22", "1,234", "500000", "900"],
            &["Duke Energy Carolinas - Electric", "Electric", "07/01/22", "10", "1000", "5"],
        ]);
        let prior = docket(&[
            &["Duke Energy Carolinas - Electric", "Electric", "07/01/22", "999", "1000", "5"],
            &["Dominion Energy", "Electric", "06/01/22", "20", "2000", "5"],
            &["Piedmont Natural Gas", "Gas", "06/01/22", "1", "1", "1"],
        ]);
        let historical = table(
            &["Utility", "month", "year", "disconnections", "disconnection_rate"],
            &[
                &["Dominion Energy", "May", "2010", "500", ""],
                &["Duke Energy Progress", "March", "2019", "350", "3.5"],
                &["Duke Energy Progress", "September", "2022", "1", "1.0"],
            ],
        );

        let sink = CaptureSink::default();
        let pipeline = Pipeline {
            inputs: vec![
                input(SourceId::CurrentDocket, current, Preprocessor::docket()),
                input(SourceId::PriorDocket, prior, Preprocessor::docket()),
                input(SourceId::Historical, historical, Preprocessor::historical()),
            ],
            backfill: backfill(),
            sink: sink.clone(),
        };
        let out = pipeline.run().unwrap();
        assert_eq!(*sink.0.borrow(), out);

        let periods: Vec<String> = out.iter().map(|r| r.reporting_period.to_string()).collect();
        assert_eq!(periods, vec!["May 2010", "Mar 2019", "Jun 2022", "Jul 2022", "Aug 2022"]);

        let keys: HashSet<_> = out.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), out.len());

        let jul = &out[3];
        assert_eq!(jul.utility_name, UtilityName::DukeEnergyCarolinas);
        assert_eq!(jul.disconnections, Some(10.0));

        let may_2010 = &out[0];
        assert!((may_2010.disconnection_rate.unwrap() - 0.005).abs() < 1e-12);
        assert!((may_2010.residential_accounts.unwrap() - 100_000.0).abs() < 1e-6);

        for r in &out {
            if let (Some(d), Some(a), Some(rate)) =
                (r.disconnections, r.residential_accounts, r.disconnection_rate)
            {
                if a != 0.0 && rate.is_finite() && rate != 0.0 {
                    assert!(((rate - d / a) / rate).abs() < 1e-9, "{r:?}");
                    assert!(((a - d / rate) / a).abs() < 1e-9, "{r:?}");
                }
            }
        }
    }

    #[test]
    fn source_failure_aborts_before_sink() {
        struct Failing;
        impl Source<RawTable> for Failing {
            fn read(&self) -> Result<RawTable, PipelineError> {
                Err(PipelineError::Source("unreadable".to_string()))
            }
        }

        let sink = CaptureSink::default();
        let pipeline = Pipeline {
            inputs: vec![Input {
                id: SourceId::CurrentDocket,
                source: Box::new(Failing),
                normalizer: SchemaNormalizer::default(),
                preprocessor: Preprocessor::docket(),
            }],
            backfill: backfill(),
            sink: sink.clone(),
        };
        assert!(matches!(pipeline.run(), Err(PipelineError::Source(_))));
        assert!(sink.0.borrow().is_empty());
    }
}
