//! Endpoint methods of the Customer Journey Analytics API.
//!
//! Responses are returned as raw JSON ([`serde_json::Value`]); list
//! endpoints are walked to the last page and return the concatenated
//! `content` items.

use crate::builder::ReportRequestBuilder;
use crate::pagination::collect_pages;
use crate::report::ReportRequest;
use crate::{Client, CjaConfig, Error, RequestMetadata, Result, RetryStrategy};
use serde::Deserialize;
use serde_json::Value;

const CALCULATED_METRIC_EXPANSION: &str = "approved,favorite,shares,tags,sharesFullName,usageSummary,usageSummaryWithRelevancyScore,reportSuiteName,siteTitle,ownerFullName,modified,migratedIds,isDeleted,definition,authorization,compatibility,legacyId,internal,dataGroup,categories";

const COMPONENT_EXPANSION: &str = "approved,favorite,tags,usageSummary,usageSummaryWithRelevancyScore,description,sourceFieldId,segmentable,required,hideFromReporting,hidden,includeExcludeSetting,fieldDefinition,bucketingSetting,noValueOptionsSetting,defaultDimensionSort,persistenceSetting,storageId,tableName,dataSetIds,dataSetType,type,schemaPath,hasData,sourceFieldName,schemaType,sourceFieldType,fromGlobalLookup,multiValued,precision";

const DATA_VIEW_EXPANSION: &str = "name,description,owner,isDeleted,parentDataGroupId,segmentList,currentTimezoneOffset,timezoneDesignator,modified,createdDate,organization,curationEnabled,recentRecordedAccess,sessionDefinition,curatedComponents,externalData,containerNames";

const FILTER_EXPANSION: &str = "compatibility,definition,internal,modified,isDeleted,definitionLastModified,createdDate,recentRecordedAccess,performanceScore,owner,dataId,ownerFullName,dataName,sharesFullName,approved,favorite,shares,tags,usageSummary,usageSummaryWithRelevancyScore";

/// Component types accepted by the tag endpoints.
pub const COMPONENT_TYPES: [&str; 13] = [
    "segment",
    "dashboard",
    "bookmark",
    "calculatedMetric",
    "project",
    "dateRange",
    "metric",
    "dimension",
    "virtualReportSuite",
    "scheduledJob",
    "alert",
    "classificationSet",
    "dataView",
];

fn known_component_type(value: &str) -> Result<&str> {
    let value = require(value, "component type")?;
    if COMPONENT_TYPES.contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidArgument(format!(
            "unknown component type '{}'",
            value
        )))
    }
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.is_empty() {
        Err(Error::required(what))
    } else {
        Ok(value)
    }
}

/// Options of the calculated metrics listing.
#[derive(Debug, Clone)]
pub struct CalculatedMetricsQuery {
    pub full: bool,
    /// `all`, `shared`, `templates`, `unauthorized`, `deleted`, `internal`
    /// or `curatedItem`.
    pub include_type: String,
    /// Comma-separated data view ids.
    pub data_ids: Option<String>,
    pub owner_id: Option<String>,
    pub limit: u32,
    /// Comma-separated calculated metric ids.
    pub filter_by_ids: Option<String>,
    pub favorite: bool,
    pub approved: bool,
}

impl Default for CalculatedMetricsQuery {
    fn default() -> Self {
        Self {
            full: false,
            include_type: "all".to_string(),
            data_ids: None,
            owner_id: None,
            limit: 100,
            filter_by_ids: None,
            favorite: false,
            approved: false,
        }
    }
}

/// Options of the data views listing.
#[derive(Debug, Clone)]
pub struct DataViewsQuery {
    pub limit: u32,
    pub full: bool,
    pub parent_data_group_id: Option<String>,
    pub external_ids: Option<String>,
    pub external_parent_ids: Option<String>,
    pub include_type: String,
    pub cached: bool,
}

impl Default for DataViewsQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            full: true,
            parent_data_group_id: None,
            external_ids: None,
            external_parent_ids: None,
            include_type: "all".to_string(),
            cached: true,
        }
    }
}

/// Options of the filters (segments) listing.
#[derive(Debug, Clone)]
pub struct FiltersQuery {
    pub limit: u32,
    pub full: bool,
    /// `all`, `shared`, `templates`, `deleted` or `internal`.
    pub include_type: String,
    /// Only filters whose name contains this.
    pub name: Option<String>,
    pub data_ids: Option<String>,
    pub owner_id: Option<String>,
    pub filter_by_ids: Option<String>,
    pub cached: bool,
}

impl Default for FiltersQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            full: false,
            include_type: "all".to_string(),
            name: None,
            data_ids: None,
            owner_id: None,
            filter_by_ids: None,
            cached: true,
        }
    }
}

/// Options of the top items report.
#[derive(Debug, Clone)]
pub struct TopItemsQuery {
    pub data_id: String,
    pub dimension: String,
    /// `YYYY-MM-DD/YYYY-MM-DD`; the service defaults to the last 90 days.
    pub date_range: Option<String>,
    /// Used only together with `end_date`.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: u32,
    pub search_clause: Option<String>,
    pub search_and: Option<String>,
    pub search_or: Option<String>,
    pub search_not: Option<String>,
    pub search_phrase: Option<String>,
    pub remote_load: bool,
    pub include_xml: bool,
    pub none_values: bool,
}

impl TopItemsQuery {
    pub fn new(data_id: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            data_id: data_id.into(),
            dimension: dimension.into(),
            date_range: None,
            start_date: None,
            end_date: None,
            limit: 100,
            search_clause: None,
            search_and: None,
            search_or: None,
            search_not: None,
            search_phrase: None,
            remote_load: true,
            include_xml: false,
            none_values: true,
        }
    }
}

/// Query flags and setting overrides for a report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Rows per page.
    pub limit: u32,
    /// `default`, `true` or `false`.
    pub allow_remote_load: String,
    pub use_cache: bool,
    pub use_results_cache: bool,
    pub include_oberon_xml: bool,
    pub include_predictive_objects: bool,
    /// Overrides `settings.nonesBehavior`.
    pub return_nones: bool,
    /// Overrides `settings.countRepeatInstances`.
    pub count_repeat_instances: bool,
    /// Overrides `dataId` when set.
    pub data_view_id: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            allow_remote_load: "default".to_string(),
            use_cache: true,
            use_results_cache: false,
            include_oberon_xml: false,
            include_predictive_objects: false,
            return_nones: true,
            count_repeat_instances: true,
            data_view_id: None,
        }
    }
}

impl ReportOptions {
    fn prepare(&self, request: &ReportRequest, page: u32) -> Result<ReportRequest> {
        let mut builder = ReportRequestBuilder::from_request(request.clone());
        builder.set_page(page);
        builder.set_limit(self.limit);
        builder.set_none_behavior(self.return_nones);
        builder.set_repeat_instance(self.count_repeat_instances);
        if let Some(data_view_id) = &self.data_view_id {
            builder.set_data_view_id(data_view_id)?;
        }
        Ok(builder.into_request())
    }

    fn metadata(&self) -> RequestMetadata {
        RequestMetadata::post("/reports")
            .with_query_param("allowRemoteLoad", &self.allow_remote_load)
            .with_query_param("useCache", self.use_cache)
            .with_query_param("useResultsCache", self.use_results_cache)
            .with_query_param("includeOberonXml", self.include_oberon_xml)
            .with_query_param(
                "includePlatformPredictiveObjects",
                self.include_predictive_objects,
            )
    }
}

/// The part of a report response needed to walk its pages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportPage {
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    last_page: Option<bool>,
    #[serde(default)]
    total_pages: Option<u64>,
}

/// A connection to one organisation's Customer Journey Analytics API.
///
/// # Examples
///
/// ```no_run
/// use cja_client::{Cja, CjaConfig, ReportRequestBuilder};
/// use cja_client::api::ReportOptions;
/// use cja_client::dates::DatePreset;
///
/// # async fn example() -> Result<(), cja_client::Error> {
/// let cja = Cja::new(&CjaConfig::from_env()?)?;
///
/// let mut report = ReportRequestBuilder::new();
/// report.set_data_view_id("dv_5f3c")?;
/// report.set_dimension("variables/page")?;
/// report.add_metric("metrics/visits")?;
/// let this_month = report.dates().get(DatePreset::ThisMonth).to_string();
/// report.add_global_filter(&this_month)?;
///
/// let rows = cja.get_report_rows(&report.serialize(), &ReportOptions::default(), None).await?;
/// println!("{} rows", rows.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cja {
    client: Client,
}

impl Cja {
    /// Connects with [`RetryStrategy::standard`] retries.
    pub fn new(config: &CjaConfig) -> Result<Self> {
        let client = Client::builder()
            .config(config)?
            .retry_strategy(RetryStrategy::standard())
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Uses a client configured by the caller.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn send(&self, metadata: RequestMetadata) -> Result<Value> {
        Ok(self.client.call::<(), Value>(metadata, None).await?.data)
    }

    async fn send_json(&self, metadata: RequestMetadata, body: &Value) -> Result<Value> {
        Ok(self.client.call::<Value, Value>(metadata, Some(body)).await?.data)
    }

    // Users

    /// The user the access token belongs to.
    pub async fn get_current_user(&self, admin: bool, use_cache: bool) -> Result<Value> {
        let metadata = RequestMetadata::get("/aresconfig/users/me")
            .with_query_param("useCache", use_cache)
            .with_optional_query_param("expansion", admin.then_some("admin"));
        self.send(metadata).await
    }

    // Calculated metrics

    pub async fn get_calculated_metrics(&self, query: &CalculatedMetricsQuery) -> Result<Vec<Value>> {
        let metadata = RequestMetadata::get("/calculatedmetrics")
            .with_query_param("limit", query.limit)
            .with_query_param("includeType", &query.include_type)
            .with_query_param("pagination", false)
            .with_optional_query_param(
                "expansion",
                query.full.then_some(format!("dataName,{}", CALCULATED_METRIC_EXPANSION)),
            )
            .with_optional_query_param("dataIds", query.data_ids.as_ref())
            .with_optional_query_param("ownerId", query.owner_id.as_ref())
            .with_optional_query_param("filterByIds", query.filter_by_ids.as_ref())
            .with_optional_query_param("favorite", query.favorite.then_some(true))
            .with_optional_query_param("approved", query.approved.then_some(true));
        collect_pages(&self.client, metadata).await
    }

    /// Functions usable in calculated metric definitions.
    pub async fn get_calculated_metrics_functions(&self) -> Result<Value> {
        self.send(RequestMetadata::get("/calculatedmetrics/functions"))
            .await
    }

    pub async fn get_calculated_metric(&self, calc_id: &str, full: bool) -> Result<Value> {
        let calc_id = require(calc_id, "calculated metric ID")?;
        let metadata = RequestMetadata::get(format!("/calculatedmetrics/{}", calc_id))
            .with_query_param("includeHidden", true)
            .with_optional_query_param("expansion", full.then_some(CALCULATED_METRIC_EXPANSION));
        self.send(metadata).await
    }

    pub async fn create_calculated_metric(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/calculatedmetrics"), definition)
            .await
    }

    pub async fn validate_calculated_metric(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/calculatedmetrics/validate"), definition)
            .await
    }

    pub async fn delete_calculated_metric(&self, calc_id: &str) -> Result<Value> {
        let calc_id = require(calc_id, "calculated metric ID")?;
        self.send(RequestMetadata::delete(format!("/calculatedmetrics/{}", calc_id)))
            .await
    }

    pub async fn update_calculated_metric(&self, calc_id: &str, definition: &Value) -> Result<Value> {
        let calc_id = require(calc_id, "calculated metric ID")?;
        self.send_json(
            RequestMetadata::put(format!("/calculatedmetrics/{}", calc_id)),
            definition,
        )
        .await
    }

    // Shares

    /// Shares of a user; `include_type` is `sharedTo` or `sharedBy`.
    pub async fn get_shares(
        &self,
        user_id: Option<&str>,
        include_type: &str,
        limit: u32,
        use_cache: bool,
    ) -> Result<Value> {
        let metadata = RequestMetadata::get("/componentmetadata/shares")
            .with_query_param("includeType", include_type)
            .with_query_param("limit", limit)
            .with_query_param("useCache", use_cache)
            .with_optional_query_param("userId", user_id);
        self.send(metadata).await
    }

    pub async fn get_share(&self, share_id: &str, use_cache: bool) -> Result<Value> {
        let share_id = require(share_id, "share ID")?;
        let metadata = RequestMetadata::get(format!("/componentmetadata/shares/{}", share_id))
            .with_query_param("useCache", use_cache);
        self.send(metadata).await
    }

    pub async fn delete_share(&self, share_id: &str) -> Result<Value> {
        let share_id = require(share_id, "share ID")?;
        self.send(RequestMetadata::delete(format!(
            "/componentmetadata/shares/{}",
            share_id
        )))
        .await
    }

    /// Searches shares by component ids, e.g.
    /// `{"componentType": "calculatedMetric", "componentIds": ["cm1"]}`.
    pub async fn search_shares(&self, search: &Value, full: bool, limit: u32) -> Result<Value> {
        let metadata = RequestMetadata::post("/componentmetadata/shares/component/search")
            .with_query_param("limit", limit)
            .with_optional_query_param("expansion", full.then_some("sharesFullName"));
        self.send_json(metadata, search).await
    }

    /// Replaces the shares of the listed components.
    pub async fn update_shares(&self, shares: &Value, use_cache: bool) -> Result<Value> {
        let metadata = RequestMetadata::put("/componentmetadata/shares")
            .with_query_param("useCache", use_cache);
        self.send_json(metadata, shares).await
    }

    // Tags

    pub async fn get_tags(&self, limit: u32) -> Result<Value> {
        let metadata = RequestMetadata::get("/componentmetadata/tags").with_query_param("limit", limit);
        self.send(metadata).await
    }

    pub async fn create_tags(&self, tags: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/componentmetadata/tags"), tags)
            .await
    }

    /// Removes all tags from the listed components.
    pub async fn delete_tags(&self, component_ids: &str, component_type: &str) -> Result<Value> {
        let component_ids = require(component_ids, "component ID list")?;
        let component_type = known_component_type(component_type)?;
        let metadata = RequestMetadata::delete("/componentmetadata/tags")
            .with_query_param("componentIds", component_ids)
            .with_query_param("componentType", component_type);
        self.send(metadata).await
    }

    pub async fn get_tag(&self, tag_id: &str) -> Result<Value> {
        let tag_id = require(tag_id, "tag ID")?;
        self.send(RequestMetadata::get(format!("/componentmetadata/tags/{}", tag_id)))
            .await
    }

    pub async fn get_component_tags(&self, component_id: &str, component_type: &str) -> Result<Value> {
        let component_id = require(component_id, "component ID")?;
        let component_type = known_component_type(component_type)?;
        let metadata = RequestMetadata::get("/componentmetadata/tags/search")
            .with_query_param("componentId", component_id)
            .with_query_param("componentType", component_type);
        self.send(metadata).await
    }

    pub async fn update_tags(&self, tags: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::put("/componentmetadata/tags/tagitems"), tags)
            .await
    }

    // Top items

    pub async fn get_top_items(&self, query: &TopItemsQuery) -> Result<Value> {
        require(&query.data_id, "data ID")?;
        require(&query.dimension, "dimension")?;
        let (start_date, end_date) = match (&query.start_date, &query.end_date) {
            (Some(start), Some(end)) => (Some(start), Some(end)),
            _ => (None, None),
        };
        let metadata = RequestMetadata::get("/reports/topItems")
            .with_query_param("dataId", &query.data_id)
            .with_query_param("dimension", &query.dimension)
            .with_query_param("limit", query.limit)
            .with_query_param("allowRemoteLoad", query.remote_load)
            .with_query_param("includeOberonXml", query.include_xml)
            .with_query_param("lookupNoneValues", query.none_values)
            .with_optional_query_param("dateRange", query.date_range.as_ref())
            .with_optional_query_param("startDate", start_date)
            .with_optional_query_param("endDate", end_date)
            .with_optional_query_param("search-clause", query.search_clause.as_ref())
            .with_optional_query_param("searchAnd", query.search_and.as_ref())
            .with_optional_query_param("searchOr", query.search_or.as_ref())
            .with_optional_query_param("searchNot", query.search_not.as_ref())
            .with_optional_query_param("searchPhrase", query.search_phrase.as_ref());
        self.send(metadata).await
    }

    // Dimensions and metrics

    pub async fn get_dimensions(&self, data_view_id: &str, full: bool, include_hidden: bool) -> Result<Value> {
        self.list_components(data_view_id, "dimensions", full, include_hidden)
            .await
    }

    pub async fn get_dimension(&self, data_view_id: &str, dimension_id: &str, full: bool) -> Result<Value> {
        self.component(data_view_id, "dimensions", dimension_id, full)
            .await
    }

    pub async fn get_metrics(&self, data_view_id: &str, full: bool, include_hidden: bool) -> Result<Value> {
        self.list_components(data_view_id, "metrics", full, include_hidden)
            .await
    }

    pub async fn get_metric(&self, data_view_id: &str, metric_id: &str, full: bool) -> Result<Value> {
        self.component(data_view_id, "metrics", metric_id, full)
            .await
    }

    async fn list_components(
        &self,
        data_view_id: &str,
        kind: &str,
        full: bool,
        include_hidden: bool,
    ) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        let metadata = RequestMetadata::get(format!("/datagroups/data/{}/{}", data_view_id, kind))
            .with_optional_query_param("expansion", full.then_some(COMPONENT_EXPANSION))
            .with_optional_query_param("includeType", include_hidden.then_some("hidden"));
        self.send(metadata).await
    }

    async fn component(&self, data_view_id: &str, kind: &str, component_id: &str, full: bool) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        let component_id = require(component_id, "component ID")?;
        let metadata = RequestMetadata::get(format!(
            "/datagroups/data/{}/{}/{}",
            data_view_id, kind, component_id
        ))
        .with_optional_query_param("expansion", full.then_some(COMPONENT_EXPANSION));
        self.send(metadata).await
    }

    // Data views

    pub async fn get_data_views(&self, query: &DataViewsQuery) -> Result<Vec<Value>> {
        let metadata = RequestMetadata::get("/datagroups/dataviews")
            .with_query_param("limit", query.limit)
            .with_query_param("includeType", &query.include_type)
            .with_query_param("cached", query.cached)
            .with_optional_query_param("expansion", query.full.then_some(DATA_VIEW_EXPANSION))
            .with_optional_query_param("parentDataGroupId", query.parent_data_group_id.as_ref())
            .with_optional_query_param("externalIds", query.external_ids.as_ref())
            .with_optional_query_param("externalParentIds", query.external_parent_ids.as_ref());
        collect_pages(&self.client, metadata).await
    }

    pub async fn get_data_view(&self, data_view_id: &str, full: bool) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        let metadata = RequestMetadata::get(format!("/datagroups/dataviews/{}", data_view_id))
            .with_optional_query_param("expansion", full.then_some(DATA_VIEW_EXPANSION));
        self.send(metadata).await
    }

    pub async fn validate_data_view(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/datagroups/dataviews/validate"), definition)
            .await
    }

    pub async fn create_data_view(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/datagroups/dataviews"), definition)
            .await
    }

    pub async fn delete_data_view(&self, data_view_id: &str) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        self.send(RequestMetadata::delete(format!(
            "/datagroups/dataviews/{}",
            data_view_id
        )))
        .await
    }

    pub async fn update_data_view(&self, data_view_id: &str, definition: &Value) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        self.send_json(
            RequestMetadata::put(format!("/datagroups/dataviews/{}", data_view_id)),
            definition,
        )
        .await
    }

    pub async fn copy_data_view(&self, data_view_id: &str) -> Result<Value> {
        let data_view_id = require(data_view_id, "data view ID")?;
        self.send(RequestMetadata::put(format!(
            "/datagroups/dataviews/copy/{}",
            data_view_id
        )))
        .await
    }

    // Filters

    pub async fn get_filters(&self, query: &FiltersQuery) -> Result<Vec<Value>> {
        let metadata = RequestMetadata::get("/filters")
            .with_query_param("limit", query.limit)
            .with_query_param("cached", query.cached)
            .with_query_param("includeType", &query.include_type)
            .with_optional_query_param("expansion", query.full.then_some(FILTER_EXPANSION))
            .with_optional_query_param("name", query.name.as_ref())
            .with_optional_query_param("dataIds", query.data_ids.as_ref())
            .with_optional_query_param("ownerId", query.owner_id.as_ref())
            .with_optional_query_param("filterByIds", query.filter_by_ids.as_ref());
        collect_pages(&self.client, metadata).await
    }

    pub async fn get_filter(&self, filter_id: &str, full: bool) -> Result<Value> {
        let filter_id = require(filter_id, "filter ID")?;
        let metadata = RequestMetadata::get(format!("/filters/{}", filter_id))
            .with_optional_query_param("expansion", full.then_some(FILTER_EXPANSION));
        self.send(metadata).await
    }

    pub async fn delete_filter(&self, filter_id: &str) -> Result<Value> {
        let filter_id = require(filter_id, "filter ID")?;
        self.send(RequestMetadata::delete(format!("/filters/{}", filter_id)))
            .await
    }

    pub async fn validate_filter(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/filters/validate"), definition)
            .await
    }

    pub async fn create_filter(&self, definition: &Value) -> Result<Value> {
        self.send_json(RequestMetadata::post("/filters"), definition)
            .await
    }

    pub async fn update_filter(&self, filter_id: &str, definition: &Value) -> Result<Value> {
        let filter_id = require(filter_id, "filter ID")?;
        self.send_json(RequestMetadata::put(format!("/filters/{}", filter_id)), definition)
            .await
    }

    // Reports

    /// Runs a report and returns its first page as received.
    ///
    /// `request` is left untouched; the overrides in `options` are applied
    /// to a copy.
    pub async fn get_report(&self, request: &ReportRequest, options: &ReportOptions) -> Result<Value> {
        let body = options.prepare(request, 0)?;
        Ok(self
            .client
            .call::<ReportRequest, Value>(options.metadata(), Some(&body))
            .await?
            .data)
    }

    /// Runs a report page by page and returns the collected `rows`.
    ///
    /// Stops at the last page, or once `max_rows` rows are collected (the
    /// result is then truncated to exactly `max_rows`).
    pub async fn get_report_rows(
        &self,
        request: &ReportRequest,
        options: &ReportOptions,
        max_rows: Option<usize>,
    ) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        let mut page_number: u32 = 0;

        loop {
            let body = options.prepare(request, page_number)?;
            let page = self
                .client
                .call::<ReportRequest, ReportPage>(options.metadata(), Some(&body))
                .await?
                .data;

            let received = page.rows.len();
            rows.extend(page.rows);
            tracing::debug!(
                page = page_number,
                received = received,
                total = rows.len(),
                total_pages = ?page.total_pages,
                "Fetched report page"
            );

            if let Some(max) = max_rows {
                if rows.len() >= max {
                    rows.truncate(max);
                    break;
                }
            }
            if page.last_page.unwrap_or(true) || received == 0 {
                break;
            }
            page_number += 1;
        }

        Ok(rows)
    }
}
