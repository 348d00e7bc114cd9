//! Chart-ready series built from the persisted dataset.
//!
//! Both charts color by utility with a reserved color per name. The optional
//! "All Utilities" aggregate is computed here and never written back.

use std::collections::BTreeMap;

use time::Date;

use crate::domain::{DisconnectionRecord, SeriesName};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChartPoint {
    pub timestamp: Date,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChartSeries {
    pub name: SeriesName,
    pub color: &'static str,
    pub points: Vec<ChartPoint>,
}

fn into_series(grouped: BTreeMap<SeriesName, BTreeMap<Date, f64>>) -> Vec<ChartSeries> {
    grouped
        .into_iter()
        .map(|(name, points)| ChartSeries {
            name,
            color: name.color(),
            points: points
                .into_iter()
                .map(|(timestamp, value)| ChartPoint { timestamp, value })
                .collect(),
        })
        .collect()
}

/// Monthly disconnection counts per utility, sorted by name then time.
///
/// With `aggregate`, an "All Utilities" series sums the utilities' counts for
/// each month.
pub fn disconnection_series(records: &[DisconnectionRecord], aggregate: bool) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<SeriesName, BTreeMap<Date, f64>> = BTreeMap::new();

    for r in records {
        let Some(d) = r.disconnections else { continue };
        grouped
            .entry(SeriesName::Utility(r.utility_name))
            .or_default()
            .insert(r.timestamp, d);
        if aggregate {
            *grouped
                .entry(SeriesName::AllUtilities)
                .or_default()
                .entry(r.timestamp)
                .or_insert(0.0) += d;
        }
    }

    into_series(grouped)
}

/// Monthly disconnection rates per utility. Missing and non-finite rates are
/// left out.
///
/// With `aggregate`, the "All Utilities" rate for a month is the summed
/// disconnections over the summed accounts of the rows where both are known.
pub fn disconnection_rate_series(
    records: &[DisconnectionRecord],
    aggregate: bool,
) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<SeriesName, BTreeMap<Date, f64>> = BTreeMap::new();
    let mut totals: BTreeMap<Date, (f64, f64)> = BTreeMap::new();

    for r in records {
        if let Some(rate) = r.disconnection_rate.filter(|v| v.is_finite()) {
            grouped
                .entry(SeriesName::Utility(r.utility_name))
                .or_default()
                .insert(r.timestamp, rate);
        }
        if let (Some(d), Some(a)) = (r.disconnections, r.residential_accounts) {
            if d.is_finite() && a.is_finite() && a > 0.0 {
                let t = totals.entry(r.timestamp).or_insert((0.0, 0.0));
                t.0 += d;
                t.1 += a;
            }
        }
    }

    if aggregate {
        let all: BTreeMap<Date, f64> = totals
            .into_iter()
            .filter(|(_, (_, a))| *a > 0.0)
            .map(|(ts, (d, a))| (ts, d / a))
            .collect();
        if !all.is_empty() {
            grouped.insert(SeriesName::AllUtilities, all);
        }
    }

    into_series(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UtilityName;

    fn record(period: &str, utility: UtilityName, d: Option<f64>, a: Option<f64>, rate: Option<f64>) -> DisconnectionRecord {
        let mut r = DisconnectionRecord::new(period.parse().unwrap(), utility);
        r.disconnections = d;
        r.residential_accounts = a;
        r.disconnection_rate = rate;
        r
    }

    fn sample() -> Vec<DisconnectionRecord> {
        vec![
            record("Feb 2022", UtilityName::DukeEnergyProgress, Some(30.0), Some(1000.0), Some(0.03)),
            record("Jan 2022", UtilityName::DukeEnergyProgress, Some(10.0), Some(1000.0), Some(0.01)),
            record("Jan 2022", UtilityName::DominionEnergy, Some(5.0), Some(0.0), Some(f64::INFINITY)),
            record("Jan 2022", UtilityName::DukeEnergyCarolinas, None, None, None),
        ]
    }

    #[test]
    fn counts_are_grouped_and_time_ordered() {
        let series = disconnection_series(&sample(), false);
        let names: Vec<SeriesName> = series.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                SeriesName::Utility(UtilityName::DominionEnergy),
                SeriesName::Utility(UtilityName::DukeEnergyProgress),
            ]
        );
        let progress = &series[1];
        assert_eq!(progress.color, "green");
        let values: Vec<f64> = progress.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![10.0, 30.0]);
    }

    #[test]
    fn aggregate_counts_sum_per_month() {
        let series = disconnection_series(&sample(), true);
        let all = &series[0];
        assert_eq!(all.name, SeriesName::AllUtilities);
        assert_eq!(all.color, "red");
        let values: Vec<f64> = all.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![15.0, 30.0]);
    }

    #[test]
    fn rate_series_drops_non_finite_values() {
        let series = disconnection_rate_series(&sample(), false);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, SeriesName::Utility(UtilityName::DukeEnergyProgress));
    }

    #[test]
    fn aggregate_rate_uses_summed_accounts() {
        let mut rows = sample();
        rows.push(record("Jan 2022", UtilityName::DukeEnergyCarolinas, Some(50.0), Some(4000.0), Some(0.0125)));
        let series = disconnection_rate_series(&rows, true);
        let all = &series[0];
        assert_eq!(all.name, SeriesName::AllUtilities);
        // Jan: (10 + 50) / (1000 + 4000); the zero-account Dominion row is excluded.
        assert!((all.points[0].value - 0.012).abs() < 1e-12);
        assert!((all.points[1].value - 0.03).abs() < 1e-12);
    }
}
