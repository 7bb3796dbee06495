use chrono::NaiveDate;
use cja_client::dates::DatePreset;
use cja_client::{Error, ReportRequestBuilder};
use serde_json::json;
use std::io::Write;

#[test]
fn test_saved_request_is_extended() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let saved = json!({
        "globalFilters": [
            {"id": "0", "type": "dateRange", "dateRange": "2024-01-01T00:00:00.000/2024-02-01T00:00:00.000"}
        ],
        "metricContainer": {
            "metrics": [
                {"columnId": "0", "id": "metrics/visits", "sort": "desc", "filters": ["0"]}
            ],
            "metricFilters": [
                {"id": "0", "type": "breakdown", "dimension": "variables/device", "itemId": "mobile"}
            ]
        },
        "dimension": "variables/page",
        "settings": {
            "countRepeatInstances": true,
            "limit": 50,
            "page": 0,
            "nonesBehavior": "exclude-nones"
        },
        "statistics": {"functions": ["col-max", "col-min"]},
        "dataId": "dv_saved",
        "capacityMetadata": {"associations": []}
    });
    write!(file, "{}", saved).unwrap();

    let mut builder = ReportRequestBuilder::from_json_file(file.path()).unwrap();
    builder.add_metric("metrics/orders").unwrap();
    builder
        .add_metric_filter("metrics/orders", "s300000000@AdobeOrg_abc", None)
        .unwrap();
    builder.add_global_filter("My named segment").unwrap();

    let body = builder.to_value().unwrap();
    assert_eq!(body["metricContainer"]["metrics"][1]["columnId"], "1");
    assert!(body["metricContainer"]["metrics"][1].get("sort").is_none());
    assert_eq!(body["metricContainer"]["metrics"][1]["filters"], json!(["1"]));
    assert_eq!(body["metricContainer"]["metricFilters"][1]["type"], "segment");
    assert_eq!(body["globalFilters"][1], json!({"id": "1", "type": "segment", "segmentId": "My named segment"}));
    assert_eq!(body["settings"]["limit"], 50);
    assert_eq!(body["capacityMetadata"], json!({"associations": []}));
}

#[test]
fn test_unreadable_documents() {
    let missing = ReportRequestBuilder::from_json_file("/nonexistent/report.json");
    assert!(matches!(missing, Err(Error::Io(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    let malformed = ReportRequestBuilder::from_json_file(file.path());
    assert!(matches!(malformed, Err(Error::InvalidDocument(_))));
}

#[test]
fn test_filter_lifecycle() {
    let mut builder = ReportRequestBuilder::new();
    builder.add_metric("metrics/visits").unwrap();
    builder.add_metric("metrics/visits").unwrap();
    builder
        .add_metric_filter("metrics/visits", "variables/device:::mobile", None)
        .unwrap();
    builder
        .add_metric_filter("metrics/visits", "variables/device:::tablet", Some(1))
        .unwrap();

    let request = builder.serialize();
    assert_eq!(
        request.metric_container.metrics[0].filters,
        Some(vec!["0".to_string()])
    );
    assert_eq!(
        request.metric_container.metrics[1].filters,
        Some(vec!["0".to_string(), "1".to_string()])
    );

    assert_eq!(builder.remove_metric_filter("variables/device:::mobile").unwrap(), 1);
    assert_eq!(builder.remove_metric_filter("unknown").unwrap(), 0);

    builder
        .add_metric_filter("metrics/visits", "variables/device:::desktop", Some(0))
        .unwrap();
    let request = builder.serialize();
    let ids: Vec<&str> = request
        .metric_container
        .metric_filters
        .iter()
        .map(|f| f.id())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(
        request.metric_container.metrics[0].filters,
        Some(vec!["2".to_string()])
    );
    assert_eq!(
        request.metric_container.metrics[1].filters,
        Some(vec!["1".to_string()])
    );
}

#[test]
fn test_date_presets_as_global_filters() {
    let mut builder =
        ReportRequestBuilder::new().with_anchor(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    for preset in DatePreset::ALL {
        let range = builder.dates().get(preset).to_string();
        builder.add_global_filter(&range).unwrap();
    }

    let body = builder.to_value().unwrap();
    let filters = body["globalFilters"].as_array().unwrap();
    assert_eq!(filters.len(), DatePreset::ALL.len());
    assert!(filters.iter().all(|f| f["type"] == "dateRange"));
    assert_eq!(
        filters[0]["dateRange"],
        "2024-03-01T00:00:00.000/2024-03-31T23:59:59.999"
    );
}
