//! Incremental construction of a [`ReportRequest`].
//!
//! [`ReportRequestBuilder`] owns one report document and keeps the ids that
//! tie its parts together consistent: metric `columnId`s, metric-filter ids
//! referenced from each metric's `filters` list, and global filter ids. The
//! next id of each list is always derived from the list itself.
//!
//! Every operation validates its arguments before touching the document, so
//! a call that returns an error leaves the request exactly as it was.
//!
//! The builder is not internally synchronized. All mutating methods take
//! `&mut self`; callers sharing one builder across threads must wrap it in a
//! lock themselves.

use crate::dates::DateRanges;
use crate::report::{
    classify_filter, next_id, Filter, Metric, NonesBehavior, ReportRequest, BREAKDOWN_SEPARATOR,
};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::path::Path;

/// Builds the body of a `/reports` call.
///
/// # Examples
///
/// ```
/// use cja_client::ReportRequestBuilder;
/// use cja_client::dates::DatePreset;
///
/// # fn main() -> Result<(), cja_client::Error> {
/// let mut builder = ReportRequestBuilder::new();
/// builder.set_data_view_id("dv_5f3c")?;
/// builder.set_dimension("variables/page")?;
/// builder.add_metric("metrics/visits")?;
/// builder.add_metric("metrics/pageviews")?;
/// builder.add_metric_filter("metrics/pageviews", "variables/device:::mobile", None)?;
///
/// let range = builder.dates().get(DatePreset::Last7DaysTillToday).to_string();
/// builder.add_global_filter(&range)?;
///
/// let request = builder.serialize();
/// assert_eq!(request.metric_container.metrics[0].sort.as_deref(), Some("desc"));
/// assert_eq!(request.metric_container.metrics[1].filters, Some(vec!["0".to_string()]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReportRequestBuilder {
    request: ReportRequest,
    dates: DateRanges,
}

impl ReportRequestBuilder {
    /// Starts from the empty template.
    pub fn new() -> Self {
        Self::from_request(ReportRequest::default())
    }

    /// Continues building an existing request.
    ///
    /// New metrics and filters are numbered after the ones already present.
    pub fn from_request(request: ReportRequest) -> Self {
        tracing::debug!(
            metrics = request.metric_container.metrics.len(),
            metric_filters = request.metric_container.metric_filters.len(),
            global_filters = request.global_filters.len(),
            "Report request builder created"
        );
        Self {
            request,
            dates: DateRanges::now(),
        }
    }

    /// Continues building a request given as raw JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if `value` is not a report document.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(Self::from_request(serde_json::from_value(value)?))
    }

    /// Continues building a request saved as a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_request(serde_json::from_str(&raw)?))
    }

    /// Re-anchors the convenience date ranges to `today`.
    pub fn with_anchor(mut self, today: NaiveDate) -> Self {
        self.dates = DateRanges::anchored(today);
        self
    }

    /// Convenience date ranges anchored when the builder was created.
    pub fn dates(&self) -> &DateRanges {
        &self.dates
    }

    /// Read-only view of the request being built.
    pub fn request(&self) -> &ReportRequest {
        &self.request
    }

    /// Appends a metric column. The first metric is sorted descending.
    pub fn add_metric(&mut self, metric_id: &str) -> Result<()> {
        if metric_id.is_empty() {
            return Err(Error::required("metric ID"));
        }
        let metrics = &mut self.request.metric_container.metrics;
        let column = next_id(metrics.iter().map(|m| m.column_id.as_str()), metrics.len());
        metrics.push(Metric {
            column_id: column.to_string(),
            id: metric_id.to_string(),
            sort: (column == 0).then(|| "desc".to_string()),
            filters: None,
            extra: Map::new(),
        });
        tracing::debug!(metric = metric_id, column_id = column, "Metric added");
        Ok(())
    }

    /// Adds a metric filter and attaches it to metrics.
    ///
    /// With `metric_index` the filter goes to the metric at that position,
    /// whatever its id. Without it, every metric whose id equals `metric_id`
    /// receives the filter. Breakdown filters use the `dimension:::itemId`
    /// form.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if an id is empty or `metric_index` is out
    /// of range.
    pub fn add_metric_filter(
        &mut self,
        metric_id: &str,
        filter_id: &str,
        metric_index: Option<usize>,
    ) -> Result<()> {
        if metric_id.is_empty() {
            return Err(Error::required("metric ID"));
        }
        if filter_id.is_empty() {
            return Err(Error::required("filter ID"));
        }
        let container = &mut self.request.metric_container;
        if let Some(index) = metric_index {
            if index >= container.metrics.len() {
                return Err(Error::InvalidArgument(format!(
                    "metric index {} is out of range ({} metrics)",
                    index,
                    container.metrics.len()
                )));
            }
        }

        let id = next_id(
            container.metric_filters.iter().map(Filter::id),
            container.metric_filters.len(),
        )
        .to_string();
        let filter = classify_filter(filter_id, id.clone());
        tracing::debug!(
            filter = filter_id,
            kind = filter.type_name(),
            id = %id,
            "Metric filter added"
        );
        container.metric_filters.push(filter);

        match metric_index {
            Some(index) => container.metrics[index].attach_filter(&id),
            None => container
                .metrics
                .iter_mut()
                .filter(|metric| metric.id == metric_id)
                .for_each(|metric| metric.attach_filter(&id)),
        }
        Ok(())
    }

    /// Removes every metric filter whose JSON form contains `filter_id`.
    ///
    /// For breakdown tokens (`dimension:::itemId`) only the item id is
    /// matched. The haystack is each filter's compact JSON rendering, e.g.
    /// `{"type":"segment","id":"0","segmentId":"s1@AdobeOrg"}`, so quote
    /// characters in `filter_id` match JSON double quotes.
    ///
    /// Filters are removed by id and their ids are detached from all
    /// metrics; ids of the remaining filters are left as they are.
    /// Returns how many filters were removed, zero when nothing matched.
    pub fn remove_metric_filter(&mut self, filter_id: &str) -> Result<usize> {
        if filter_id.is_empty() {
            return Err(Error::required("filter ID"));
        }
        let needle = filter_id
            .split_once(BREAKDOWN_SEPARATOR)
            .map_or(filter_id, |(_, item)| item);

        let container = &mut self.request.metric_container;
        let mut matched = Vec::new();
        for filter in &container.metric_filters {
            let rendered = serde_json::to_string(filter)
                .map_err(|e| Error::SerializationFailed(e.to_string()))?;
            if rendered.contains(needle) {
                matched.push(filter.id().to_string());
            }
        }

        for id in &matched {
            container.metric_filters.retain(|filter| filter.id() != id);
            for metric in container.metrics.iter_mut() {
                metric.detach_filter(id);
            }
        }
        if !matched.is_empty() {
            tracing::debug!(filter = filter_id, removed = ?matched, "Metric filters removed");
        }
        Ok(matched.len())
    }

    /// Maximum number of rows per page.
    pub fn set_limit(&mut self, limit: u32) {
        self.request.settings.limit = limit;
    }

    /// Page of results to request, starting at 0.
    pub fn set_page(&mut self, page: u32) {
        self.request.settings.page = page;
    }

    /// Whether repeated instances of a dimension item count separately.
    pub fn set_repeat_instance(&mut self, count_repeat_instances: bool) {
        self.request.settings.count_repeat_instances = count_repeat_instances;
    }

    /// `true` returns rows without a dimension value, `false` drops them.
    pub fn set_none_behavior(&mut self, return_nones: bool) {
        self.request.settings.nones_behavior = NonesBehavior::from_return_nones(return_nones);
    }

    /// Dimension the report breaks down by, e.g. `variables/page`.
    pub fn set_dimension(&mut self, dimension: &str) -> Result<()> {
        if dimension.is_empty() {
            return Err(Error::required("dimension"));
        }
        self.request.dimension = dimension.to_string();
        Ok(())
    }

    /// Data view the report runs against.
    pub fn set_data_view_id(&mut self, data_view_id: &str) -> Result<()> {
        if data_view_id.is_empty() {
            return Err(Error::required("data view ID"));
        }
        self.request.data_id = data_view_id.to_string();
        Ok(())
    }

    /// Adds a filter that applies to the whole report.
    ///
    /// The service requires at least one date range among the global filters.
    pub fn add_global_filter(&mut self, filter_id: &str) -> Result<()> {
        if filter_id.is_empty() {
            return Err(Error::required("filter ID"));
        }
        let filters = &mut self.request.global_filters;
        let id = next_id(filters.iter().map(Filter::id), filters.len()).to_string();
        let filter = classify_filter(filter_id, id);
        tracing::debug!(
            filter = filter_id,
            kind = filter.type_name(),
            id = filter.id(),
            "Global filter added"
        );
        filters.push(filter);
        Ok(())
    }

    /// Returns a snapshot of the request; later changes to the builder do
    /// not affect it.
    pub fn serialize(&self) -> ReportRequest {
        self.request.clone()
    }

    /// The snapshot as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(&self.request).map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.request)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// Consumes the builder, returning the request.
    pub fn into_request(self) -> ReportRequest {
        self.request
    }
}

impl Default for ReportRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ReportRequest> for ReportRequestBuilder {
    fn from(request: ReportRequest) -> Self {
        Self::from_request(request)
    }
}
