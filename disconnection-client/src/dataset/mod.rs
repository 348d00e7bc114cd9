pub mod disconnection_queries;
pub mod series;

pub use disconnection_queries::{
    load_disconnections, read_disconnections, write_disconnections, YearRange,
};
pub use series::{disconnection_rate_series, disconnection_series, ChartPoint, ChartSeries};

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("failed to open dataset '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("date format error: {0}")]
    Format(#[from] time::error::Format),
    #[error("missing column '{0}' in dataset")]
    MissingColumn(String),
    #[error("line {line}: invalid {column}: {message}")]
    InvalidValue {
        line: u64,
        column: String,
        message: String,
    },
}
