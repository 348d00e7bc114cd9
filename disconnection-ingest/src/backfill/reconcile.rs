use std::collections::BTreeMap;

use time::Date;

use disconnection_client::domain::{ratio, DisconnectionRecord, UtilityName};

use crate::config::Reconciliation;

use super::layout::AccountRow;

/// Filing account counts keyed on (utility, first-of-month date).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountTable {
    rows: BTreeMap<(UtilityName, Date), Option<f64>>,
}

impl AccountTable {
    /// Concatenate per-file extractions into one table. Keys are unique; the
    /// first row seen for a key is kept.
    pub fn concat(parts: Vec<Vec<AccountRow>>) -> Self {
        let mut rows = BTreeMap::new();
        let mut duplicates = 0u64;
        for row in parts.into_iter().flatten() {
            let key = (row.utility, row.timestamp);
            if rows.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            rows.insert(key, row.residential_accounts);
        }
        if duplicates > 0 {
            tracing::warn!(duplicates, "duplicate filing months ignored");
        }
        Self { rows }
    }

    pub fn get(&self, utility: UtilityName, timestamp: Date) -> Option<f64> {
        self.rows.get(&(utility, timestamp)).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Left-join filing account counts onto the dataset and make accounts and
/// rates agree.
///
/// Rates missing from the sources are derived from the best known account
/// count. Accounts are then derived from the rate as `disconnections / rate`
/// for every row in `DeriveFromRate` mode, and only for rows without
/// reported accounts in `PreserveReported` mode.
pub fn reconcile(
    mut records: Vec<DisconnectionRecord>,
    filings: &AccountTable,
    mode: Reconciliation,
) -> Vec<DisconnectionRecord> {
    let mut joined = 0u64;
    let mut rates_derived = 0u64;
    let mut accounts_derived = 0u64;

    for r in records.iter_mut() {
        let filed = filings.get(r.utility_name, r.timestamp);
        if filed.is_some() {
            joined += 1;
        }
        let known_accounts = r.residential_accounts.or(filed);

        if r.disconnection_rate.is_none() {
            r.disconnection_rate = ratio(r.disconnections, known_accounts);
            if r.disconnection_rate.is_some() {
                rates_derived += 1;
            }
        }

        let derived = ratio(r.disconnections, r.disconnection_rate);
        let accounts = match mode {
            Reconciliation::DeriveFromRate => derived,
            Reconciliation::PreserveReported => r.residential_accounts.or(derived).or(filed),
        };
        if r.residential_accounts.is_none() && accounts.is_some() {
            accounts_derived += 1;
        }
        r.residential_accounts = accounts;
    }

    metrics::counter!("backfill_joined_rows_total").increment(joined);
    metrics::counter!("backfill_rates_derived_total").increment(rates_derived);
    metrics::counter!("backfill_accounts_derived_total").increment(accounts_derived);
    tracing::info!(
        rows = records.len(),
        joined,
        rates_derived,
        accounts_derived,
        mode = ?mode,
        "accounts reconciled"
    );

    records
}
