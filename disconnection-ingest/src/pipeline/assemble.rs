use std::collections::HashMap;

use disconnection_client::domain::DisconnectionRecord;

use super::{Envelope, SourceId};

/// Concatenate per-source batches, keep the first record for each
/// (`reporting_period`, `utility_name`) and sort by timestamp.
///
/// Batches are concatenated in the order given, so that order is the
/// precedence on duplicate keys. The sort is stable: records sharing a
/// timestamp keep their concatenation order.
pub fn assemble(batches: Vec<Vec<Envelope<DisconnectionRecord>>>) -> Vec<DisconnectionRecord> {
    let total: usize = batches.iter().map(Vec::len).sum();
    let mut kept_from: HashMap<_, SourceId> = HashMap::with_capacity(total);
    let mut out = Vec::with_capacity(total);

    for env in batches.into_iter().flatten() {
        let key = env.payload.key();
        if let Some(winner) = kept_from.get(&key) {
            tracing::debug!(
                reporting_period = %key.0,
                utility = %key.1,
                kept = %winner,
                dropped = %env.source,
                "duplicate disconnection record dropped"
            );
            metrics::counter!("dedupe_dropped_rows_total", "source" => env.source.as_str())
                .increment(1);
            continue;
        }
        kept_from.insert(key, env.source);
        out.push(env.payload);
    }

    out.sort_by_key(|r| r.timestamp);
    tracing::info!(input_rows = total, rows = out.len(), "disconnection sources assembled");
    out
}
