pub mod disconnection;
pub mod period;
pub mod utility;

pub use disconnection::{ratio, DisconnectionRecord, DATASET_COLUMNS};
pub use period::{format_iso_date, month_from_name, parse_iso_date, InvalidPeriod, ReportingPeriod};
pub use utility::{SeriesName, UnknownUtility, UtilityName};
