use time::Date;

use super::{period::ReportingPeriod, utility::UtilityName};

/// Column order of the persisted disconnection dataset.
pub const DATASET_COLUMNS: [&str; 6] = [
    "timestamp",
    "reporting_period",
    "utility_name",
    "residential_accounts",
    "disconnections",
    "disconnection_rate",
];

/// One utility's disconnection figures for one reporting month.
///
/// Counts are kept as `f64` because accounts can be back-derived from a rate.
/// `None` marks a missing value; infinities from a zero denominator are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DisconnectionRecord {
    pub timestamp: Date,
    pub reporting_period: ReportingPeriod,
    pub utility_name: UtilityName,
    pub residential_accounts: Option<f64>,
    pub disconnections: Option<f64>,
    pub disconnection_rate: Option<f64>,
}

impl DisconnectionRecord {
    pub fn new(reporting_period: ReportingPeriod, utility_name: UtilityName) -> Self {
        Self {
            timestamp: reporting_period.first_day(),
            reporting_period,
            utility_name,
            residential_accounts: None,
            disconnections: None,
            disconnection_rate: None,
        }
    }

    /// Uniqueness key of the dataset.
    pub fn key(&self) -> (ReportingPeriod, UtilityName) {
        (self.reporting_period, self.utility_name)
    }
}

/// Divide two optional figures.
///
/// Missing inputs give `None`. `x / 0` propagates as an infinity; `0 / 0` is
/// undefined and also gives `None`.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let value = numerator? / denominator?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
