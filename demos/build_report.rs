//! Builds a report request and, when credentials are present, runs it.
//!
//! Without `CJA_ORG_ID`, `CJA_CLIENT_ID` and `CJA_ACCESS_TOKEN` in the
//! environment the request body is only printed.
//!
//! Run with: `cargo run --example build_report -- <data view id>`

use cja_client::api::ReportOptions;
use cja_client::dates::DatePreset;
use cja_client::{Cja, CjaConfig, Error, ReportRequestBuilder};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("cja_client=debug,build_report=info")
        .init();

    let data_view_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dv_demo".to_string());

    let mut builder = ReportRequestBuilder::new();
    builder.set_data_view_id(&data_view_id)?;
    builder.set_dimension("variables/page")?;
    builder.add_metric("metrics/visits")?;
    builder.add_metric("metrics/pageviews")?;
    builder.add_metric_filter("metrics/pageviews", "variables/device:::mobile", None)?;
    let last_week = builder.dates().get(DatePreset::Last7DaysTillToday).to_string();
    builder.add_global_filter(&last_week)?;

    println!("=== Report request ===");
    println!("{}", builder.to_json_string()?);
    println!();

    println!("=== Date presets ===");
    for (preset, range) in builder.dates().iter() {
        println!("{:<24} {}", preset.name(), range);
    }
    println!();

    let config = match CjaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("Not running the report: {}", e);
            return Ok(());
        }
    };

    println!("=== Report rows ===");
    let cja = Cja::new(&config)?;
    let options = ReportOptions {
        limit: 100,
        ..ReportOptions::default()
    };
    let rows = cja
        .get_report_rows(&builder.serialize(), &options, Some(500))
        .await?;
    for row in rows.iter().take(10) {
        println!("{}", row);
    }
    println!("{} rows in total", rows.len());

    Ok(())
}
