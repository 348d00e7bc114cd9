pub mod dataset;
pub mod domain;

pub use dataset::{load_disconnections, DatasetError, YearRange};
pub use domain::{DisconnectionRecord, ReportingPeriod, UtilityName};
