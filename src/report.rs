//! The report query document submitted to the `/reports` endpoint.
//!
//! These types mirror the JSON shape the reporting service expects. They are
//! plain values: cloning a [`ReportRequest`] yields a fully independent copy.
//! Keys the types do not model are kept in `extra` maps so that a document
//! loaded from a template round-trips without losing anything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between dimension and item id in a breakdown token.
pub const BREAKDOWN_SEPARATOR: &str = ":::";

/// A complete report query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Filters applied to the whole report.
    #[serde(default)]
    pub global_filters: Vec<Filter>,

    /// Metrics and the filters scoped to them.
    #[serde(default)]
    pub metric_container: MetricContainer,

    /// The breakdown dimension, e.g. `variables/page`.
    #[serde(default)]
    pub dimension: String,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub statistics: Statistics,

    /// The data view the report runs against.
    #[serde(default)]
    pub data_id: String,

    /// Keys not modelled above, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ReportRequest {
    /// The empty template every new builder starts from.
    fn default() -> Self {
        Self {
            global_filters: Vec::new(),
            metric_container: MetricContainer::default(),
            dimension: String::new(),
            settings: Settings::default(),
            statistics: Statistics::default(),
            data_id: String::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricContainer {
    #[serde(default)]
    pub metrics: Vec<Metric>,

    /// Filters referenced from [`Metric::filters`] by id.
    #[serde(default)]
    pub metric_filters: Vec<Filter>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One metric column of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Stringified zero-based insertion index.
    pub column_id: String,

    /// Metric identifier, e.g. `metrics/visits`.
    pub id: String,

    /// `"desc"` on the first metric only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Ids of the metric filters applied to this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metric {
    pub(crate) fn attach_filter(&mut self, filter_id: &str) {
        self.filters
            .get_or_insert_with(Vec::new)
            .push(filter_id.to_string());
    }

    /// Drops `filter_id` from this metric's filter list, if present.
    pub(crate) fn detach_filter(&mut self, filter_id: &str) -> bool {
        match self.filters.as_mut() {
            Some(filters) => {
                let before = filters.len();
                filters.retain(|id| id != filter_id);
                filters.len() != before
            }
            None => false,
        }
    }
}

/// How rows with no dimension value are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonesBehavior {
    ReturnNones,
    #[default]
    ExcludeNones,
}

impl NonesBehavior {
    /// `true` maps to [`NonesBehavior::ReturnNones`].
    pub fn from_return_nones(return_nones: bool) -> Self {
        if return_nones {
            NonesBehavior::ReturnNones
        } else {
            NonesBehavior::ExcludeNones
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NonesBehavior::ReturnNones => "return-nones",
            NonesBehavior::ExcludeNones => "exclude-nones",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub count_repeat_instances: bool,
    pub limit: u32,
    pub page: u32,
    pub nones_behavior: NonesBehavior,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            count_repeat_instances: true,
            limit: 20_000,
            page: 0,
            nones_behavior: NonesBehavior::ExcludeNones,
            extra: Map::new(),
        }
    }
}

/// Summary statistics computed per column; carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub functions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            functions: vec!["col-max".to_string(), "col-min".to_string()],
            extra: Map::new(),
        }
    }
}

/// A global or metric filter as it appears on the wire.
///
/// A missing `id` reads as empty and stays absent on output. Keys beyond
/// the modelled ones, such as an inline `segmentDefinition`, are kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Filter {
    #[serde(rename = "segment")]
    Segment {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        #[serde(rename = "segmentId")]
        segment_id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    #[serde(rename = "dateRange")]
    DateRange {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        #[serde(rename = "dateRange")]
        date_range: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    #[serde(rename = "breakdown")]
    Breakdown {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        dimension: String,
        #[serde(rename = "itemId")]
        item_id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Filter {
    /// The id other parts of the document use to reference this filter.
    pub fn id(&self) -> &str {
        match self {
            Filter::Segment { id, .. } | Filter::DateRange { id, .. } | Filter::Breakdown { id, .. } => id,
        }
    }

    /// The wire value of the `type` key.
    pub fn type_name(&self) -> &'static str {
        match self {
            Filter::Segment { .. } => "segment",
            Filter::DateRange { .. } => "dateRange",
            Filter::Breakdown { .. } => "breakdown",
        }
    }
}

/// What a raw filter token looks like, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// An organisation-scoped segment id: `s…@AdobeOrg…`.
    Segment,
    /// An ISO range such as `2020-01-01T00:00:00.000/2020-02-01T00:00:00.000`.
    DateRange,
    /// `dimension:::itemId`.
    Breakdown,
    /// Anything else, e.g. a predefined segment like `All_Visits`.
    NamedSegment,
}

impl FilterKind {
    /// Detects the kind of `token`. The first matching rule wins, so a token
    /// that looks like both a segment id and a date range is a segment.
    pub fn detect(token: &str) -> Self {
        if token.starts_with('s') && token.contains("@AdobeOrg") {
            FilterKind::Segment
        } else if token.starts_with("20") && token.contains("/20") {
            FilterKind::DateRange
        } else if token.contains(BREAKDOWN_SEPARATOR) {
            FilterKind::Breakdown
        } else {
            FilterKind::NamedSegment
        }
    }
}

/// Turns a filter token into a [`Filter`] carrying `id`.
///
/// Breakdown tokens are split on the first separator; anything after it,
/// further separators included, becomes the item id.
///
/// ```
/// use cja_client::report::{classify_filter, Filter};
///
/// let filter = classify_filter("variables/page:::home", "3");
/// assert_eq!(
///     filter,
///     Filter::Breakdown {
///         id: "3".into(),
///         dimension: "variables/page".into(),
///         item_id: "home".into(),
///         extra: Default::default(),
///     }
/// );
/// ```
pub fn classify_filter(token: &str, id: impl Into<String>) -> Filter {
    let id = id.into();
    match FilterKind::detect(token) {
        FilterKind::Segment | FilterKind::NamedSegment => Filter::Segment {
            id,
            segment_id: token.to_string(),
            extra: Map::new(),
        },
        FilterKind::DateRange => Filter::DateRange {
            id,
            date_range: token.to_string(),
            extra: Map::new(),
        },
        FilterKind::Breakdown => {
            let (dimension, item_id) = token
                .split_once(BREAKDOWN_SEPARATOR)
                .unwrap_or((token, ""));
            Filter::Breakdown {
                id,
                dimension: dimension.to_string(),
                item_id: item_id.to_string(),
                extra: Map::new(),
            }
        }
    }
}

/// The id the next appended element of a list should get.
///
/// Equals `len` for a densely numbered list. When ids have been removed it
/// moves past the highest surviving numeric id so new ids never collide.
pub(crate) fn next_id<'a>(ids: impl Iterator<Item = &'a str>, len: usize) -> usize {
    ids.filter_map(|id| id.parse::<usize>().ok())
        .map(|id| id + 1)
        .max()
        .map_or(len, |after_highest| after_highest.max(len))
}
