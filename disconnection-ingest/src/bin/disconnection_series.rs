use std::env;

use anyhow::{bail, Context, Result};
use disconnection_client::{
    dataset::{disconnection_rate_series, disconnection_series},
    load_disconnections, YearRange,
};
use disconnection_ingest::observability;

fn parse_year(arg: Option<&String>, name: &str) -> Result<Option<i32>> {
    arg.map(|s| s.parse::<i32>().with_context(|| format!("invalid {name} '{s}'")))
        .transpose()
}

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        bail!("usage: disconnection_series <dataset.csv> [start_year] [end_year]");
    }
    let years = YearRange::new(
        parse_year(args.get(2), "start_year")?,
        parse_year(args.get(3), "end_year")?,
    );

    let records = load_disconnections(&args[1], years)?;
    tracing::info!(rows = records.len(), path = %args[1], "dataset loaded");

    let payload = serde_json::json!({
        "disconnections": disconnection_series(&records, true),
        "disconnection_rate": disconnection_rate_series(&records, true),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}
