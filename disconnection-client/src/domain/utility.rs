use std::{fmt, str::FromStr};

/// Canonical electric utility names carried in the disconnection dataset.
///
/// Variant order matches the alphabetical order of the display names so the
/// derived `Ord` sorts the same way the names do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UtilityName {
    #[cfg_attr(feature = "serde", serde(rename = "Dominion Energy"))]
    DominionEnergy,
    #[cfg_attr(feature = "serde", serde(rename = "Duke Energy Carolinas"))]
    DukeEnergyCarolinas,
    #[cfg_attr(feature = "serde", serde(rename = "Duke Energy Progress"))]
    DukeEnergyProgress,
}

impl UtilityName {
    pub const ALL: [UtilityName; 3] = [
        UtilityName::DominionEnergy,
        UtilityName::DukeEnergyCarolinas,
        UtilityName::DukeEnergyProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DominionEnergy => "Dominion Energy",
            Self::DukeEnergyCarolinas => "Duke Energy Carolinas",
            Self::DukeEnergyProgress => "Duke Energy Progress",
        }
    }

    /// Chart color reserved for this utility.
    pub fn color(&self) -> &'static str {
        match self {
            Self::DominionEnergy => "orange",
            Self::DukeEnergyCarolinas => "blue",
            Self::DukeEnergyProgress => "green",
        }
    }
}

impl fmt::Display for UtilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown utility name '{0}'")]
pub struct UnknownUtility(pub String);

/// Exact match against the canonical names only. Raw source names such as
/// "Duke Energy Carolinas - Electric" go through the ingest standardization
/// rules instead.
impl FromStr for UtilityName {
    type Err = UnknownUtility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s.trim())
            .ok_or_else(|| UnknownUtility(s.to_string()))
    }
}

/// Name of a chart series: one canonical utility or the synthetic aggregate.
///
/// The aggregate only exists at chart time and is never written to the
/// persisted dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesName {
    AllUtilities,
    Utility(UtilityName),
}

impl SeriesName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllUtilities => "All Utilities",
            Self::Utility(u) => u.as_str(),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::AllUtilities => "red",
            Self::Utility(u) => u.color(),
        }
    }
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SeriesName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
