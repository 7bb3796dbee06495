//! # cja-client - a typed client for the Customer Journey Analytics API
//!
//! The crate has two halves:
//!
//! - [`ReportRequestBuilder`] assembles the JSON body of a report query:
//!   metrics, filters attached to individual metrics, global filters, the
//!   breakdown dimension, the data view and report settings. It keeps the ids
//!   that cross-reference those parts consistent.
//! - [`Cja`] calls the API endpoints (data views, dimensions, metrics,
//!   filters, calculated metrics, tags, shares, reports) over a retrying
//!   [`Client`], walking paginated listings to the end.
//!
//! ## Building a report
//!
//! ```
//! use cja_client::ReportRequestBuilder;
//!
//! # fn main() -> Result<(), cja_client::Error> {
//! let mut builder = ReportRequestBuilder::new();
//! builder.set_data_view_id("dv_5f3c")?;
//! builder.set_dimension("variables/page")?;
//! builder.add_metric("metrics/visits")?;
//! builder.add_global_filter("2024-01-01T00:00:00.000/2024-02-01T00:00:00.000")?;
//! builder.add_metric_filter("metrics/visits", "variables/device:::mobile", None)?;
//!
//! let body = builder.to_value()?;
//! assert_eq!(body["globalFilters"][0]["type"], "dateRange");
//! assert_eq!(body["metricContainer"]["metrics"][0]["filters"][0], "0");
//! # Ok(())
//! # }
//! ```
//!
//! ## Running it
//!
//! ```no_run
//! use cja_client::{Cja, CjaConfig, ReportRequestBuilder};
//! use cja_client::api::ReportOptions;
//!
//! # async fn example(builder: ReportRequestBuilder) -> Result<(), cja_client::Error> {
//! let cja = Cja::new(&CjaConfig::from_json_file("cja_config.json")?)?;
//! let first_page = cja.get_report(&builder.serialize(), &ReportOptions::default()).await?;
//! println!("{}", first_page["totalPages"]);
//! # Ok(())
//! # }
//! ```
//!
//! Logging goes through `tracing`; install a subscriber to see it.

pub mod api;
pub mod builder;
mod client;
pub mod config;
pub mod dates;
mod error;
pub mod metadata;
pub mod pagination;
pub mod rate_limit;
pub mod report;
mod response;
pub mod retry;

pub use api::Cja;
pub use builder::ReportRequestBuilder;
pub use client::{Client, ClientBuilder};
pub use config::CjaConfig;
pub use error::{Error, Result};
pub use metadata::RequestMetadata;
pub use report::{Filter, Metric, NonesBehavior, ReportRequest};
pub use response::Response;
pub use retry::{RetryPredicate, RetryStrategy};
