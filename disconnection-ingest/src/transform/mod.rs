pub mod docket;
pub mod historical;

use std::collections::BTreeMap;

use disconnection_client::domain::{DisconnectionRecord, UtilityName};

use crate::{
    pipeline::{PipelineError, Transform},
    sources::{Cell, RawTable},
};

pub use docket::{DocketPreprocessor, DocketRecord};
pub use historical::HistoricalPreprocessor;

/// Name standardization rules, applied in order. A later matching rule
/// overwrites an earlier one, so "Dominion" wins over the Duke patterns.
const UTILITY_NAME_RULES: [(&str, UtilityName); 3] = [
    ("Duke Energy Carolinas", UtilityName::DukeEnergyCarolinas),
    ("Duke Energy Progress", UtilityName::DukeEnergyProgress),
    ("Dominion", UtilityName::DominionEnergy),
];

/// Map a raw source utility name onto a canonical name by substring match.
pub fn standardize_utility_name(raw: &str) -> Option<UtilityName> {
    UTILITY_NAME_RULES
        .iter()
        .filter(|(pattern, _)| raw.contains(pattern))
        .last()
        .map(|(_, name)| *name)
}

/// True for text like "1,234", "-12,000.5" or "42": an optional sign, digits
/// and commas, and an optional fractional part.
fn is_numeric_looking(s: &str) -> bool {
    let s = s.trim();
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    int_part.chars().any(|c| c.is_ascii_digit())
        && int_part.chars().all(|c| c.is_ascii_digit() || c == ',')
        && !int_part.starts_with(',')
        && frac_part.map_or(true, |f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}

/// Remove thousands separators from a numeric-looking text value.
pub fn strip_thousands_separators(s: &str) -> Option<String> {
    (s.contains(',') && is_numeric_looking(s)).then(|| s.replace(',', ""))
}

/// Renames a source's columns to canonical names and strips thousands
/// separators from numeric-looking text cells.
///
/// Columns not named in the map pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SchemaNormalizer {
    column_map: BTreeMap<String, String>,
}

impl SchemaNormalizer {
    pub fn new(column_map: BTreeMap<String, String>) -> Self {
        Self { column_map }
    }
}

impl Transform<RawTable, RawTable> for SchemaNormalizer {
    fn apply(&self, mut input: RawTable) -> Result<RawTable, PipelineError> {
        for header in input.headers.iter_mut() {
            if let Some(canonical) = self.column_map.get(header.as_str()) {
                *header = canonical.clone();
            }
        }

        let mut stripped = 0u64;
        for cell in input.rows.iter_mut().flatten() {
            if let Cell::Text(s) = cell {
                if let Some(clean) = strip_thousands_separators(s) {
                    *s = clean;
                    stripped += 1;
                }
            }
        }
        if stripped > 0 {
            tracing::debug!(cells = stripped, "stripped thousands separators");
        }

        Ok(input)
    }
}

/// Shapes a normalized source table into canonical records.
pub enum Preprocessor {
    Docket(DocketPreprocessor),
    Historical(HistoricalPreprocessor),
}

impl Preprocessor {
    pub fn docket() -> Self {
        Self::Docket(DocketPreprocessor)
    }

    pub fn historical() -> Self {
        Self::Historical(HistoricalPreprocessor::default())
    }
}

impl Transform<RawTable, Vec<DisconnectionRecord>> for Preprocessor {
    fn apply(&self, input: RawTable) -> Result<Vec<DisconnectionRecord>, PipelineError> {
        match self {
            Self::Docket(p) => p.apply(input),
            Self::Historical(p) => p.apply(input),
        }
    }
}
