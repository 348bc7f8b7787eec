//! Catalog query route: `GET /api/labels`.
//!
//! Without query parameters the handler returns the bootstrap payload the
//! front-end needs to draw its filter panel. With parameters it runs the
//! filter and returns the matching records plus the facets still reachable
//! from them.

use std::collections::{BTreeMap, HashSet};

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDate, NaiveTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use tc_catalog::filter::NONE;
use tc_catalog::{
    filter, reduce, Catalog, CatalogEntry, DateRange, FacetSummary, FilterCriteria, GeoPoint,
    Selection, Timestamp,
};
use tc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;

/// Query string accepted by `/api/labels`. Every field is raw text so that
/// parse failures surface as 400s with a useful message.
#[derive(Debug, Default, Deserialize)]
pub struct LabelsQuery {
    pub sites: Option<String>,
    pub animals: Option<String>,
    pub actions: Option<String>,
    pub add_labels: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub restricted: Option<String>,
}

impl LabelsQuery {
    fn is_bootstrap(&self) -> bool {
        self.sites.is_none()
            && self.animals.is_none()
            && self.actions.is_none()
            && self.add_labels.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.restricted.is_none()
    }
}

/// Records serialized as a JSON object in catalog order.
pub struct LabelMap<'a>(Vec<&'a CatalogEntry>);

impl Serialize for LabelMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.key, &entry.label)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
pub struct BootstrapResponse<'a> {
    pub sites: &'a BTreeMap<String, GeoPoint>,
    pub animals: Vec<String>,
    pub actions: Vec<String>,
    pub add_labels: Vec<String>,
    pub video_labels: LabelMap<'a>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub restricted: bool,
}

#[derive(Serialize)]
pub struct FilteredResponse<'a> {
    pub video_labels: LabelMap<'a>,
    pub reverse_subset: FacetSummary,
}

fn with_none(tags: &[String]) -> Vec<String> {
    std::iter::once(NONE.to_string())
        .chain(tags.iter().cloned())
        .collect()
}

/// Parse a boolean query flag.
pub fn parse_bool(raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Validation(format!("invalid boolean: {other:?}"))),
    }
}

fn parse_sites(raw: Option<&str>) -> HashSet<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_selection(raw: Option<&str>) -> Selection {
    raw.map(Selection::parse_list).unwrap_or_default()
}

fn end_of_day(date: NaiveDate) -> Timestamp {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    Timestamp::from(date.and_time(last))
}

/// Turn a non-bootstrap query into filter criteria.
///
/// Absent bounds default to the configured start date and the end of
/// `today`; absent `restricted` uses the configured default.
pub fn build_criteria(
    query: &LabelsQuery,
    default_start: NaiveDate,
    default_restricted: bool,
    today: NaiveDate,
) -> Result<FilterCriteria, Error> {
    let start = match query.start.as_deref() {
        Some(raw) => Timestamp::parse(raw)
            .map_err(|_| Error::Validation(format!("invalid start date: {raw:?}")))?,
        None => Timestamp::from_date(default_start),
    };
    let end = match query.end.as_deref() {
        Some(raw) => Timestamp::parse(raw)
            .map_err(|_| Error::Validation(format!("invalid end date: {raw:?}")))?,
        None => end_of_day(today),
    };
    let exclude_restricted = match query.restricted.as_deref() {
        Some(raw) => parse_bool(raw)?,
        None => default_restricted,
    };

    Ok(FilterCriteria {
        sites: parse_sites(query.sites.as_deref()),
        animals: parse_selection(query.animals.as_deref()),
        actions: parse_selection(query.actions.as_deref()),
        add_labels: parse_selection(query.add_labels.as_deref()),
        date_range: DateRange::new(start, end),
        exclude_restricted,
    })
}

fn bootstrap<'a>(
    catalog: &'a Catalog,
    default_start: NaiveDate,
    default_restricted: bool,
    today: NaiveDate,
) -> BootstrapResponse<'a> {
    let vocabulary = catalog.vocabulary();
    BootstrapResponse {
        sites: catalog.sites(),
        animals: with_none(&vocabulary.animals),
        actions: with_none(&vocabulary.actions),
        add_labels: with_none(&vocabulary.add_labels),
        video_labels: LabelMap(catalog.entries().iter().collect()),
        start: default_start,
        end: today,
        restricted: default_restricted,
    }
}

fn filtered<'a>(catalog: &'a Catalog, criteria: &FilterCriteria) -> FilteredResponse<'a> {
    let keys = filter(catalog, criteria);
    let reverse_subset = reduce(keys.iter().copied(), catalog);
    let video_labels = LabelMap(keys.iter().filter_map(|key| catalog.get(key)).collect());
    FilteredResponse {
        video_labels,
        reverse_subset,
    }
}

/// GET /api/labels
///
/// The typed payloads are serialized straight into the response body so
/// `video_labels` keeps catalog order.
pub async fn get_labels(
    State(ctx): State<AppContext>,
    Query(query): Query<LabelsQuery>,
) -> Result<Response, AppError> {
    let catalog = ctx.catalog.snapshot();
    let settings = &ctx.config.catalog;
    let today = Local::now().date_naive();

    if query.is_bootstrap() {
        return Ok(Json(bootstrap(
            &catalog,
            settings.default_start,
            settings.default_restricted,
            today,
        ))
        .into_response());
    }

    let criteria = build_criteria(
        &query,
        settings.default_start,
        settings.default_restricted,
        today,
    )?;
    Ok(Json(filtered(&catalog, &criteria)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_json(
            &json!({
                "video_labels": {
                    "/c/b.mp4": { "site": "north", "animals": ["deer"], "actions": ["feeding"], "time": "2021-06-01T05:00:00" },
                    "/c/a.mp4": { "site": "north", "animals": [], "time": "2021-01-01" },
                    "/c/r.mp4": { "site": "south", "animals": ["hog"], "time": "2021-03-01", "restricted": true }
                },
                "sites": { "1": { "site": "north", "gps": [31.5, -103.25] } }
            })
            .to_string(),
            None,
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query(pairs: &str) -> LabelsQuery {
        let uri: axum::http::Uri = format!("/api/labels?{pairs}").parse().unwrap();
        Query::<LabelsQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn empty_query_is_bootstrap() {
        assert!(LabelsQuery::default().is_bootstrap());
        assert!(!query("animals=deer").is_bootstrap());
        assert!(!query("restricted=false").is_bootstrap());
    }

    #[test]
    fn unrecognised_parameters_are_ignored() {
        assert!(query("foo=1").is_bootstrap());
        assert!(query("foo=1&token=abc").is_bootstrap());
        assert!(!query("foo=1&sites=north").is_bootstrap());
    }

    #[test]
    fn bootstrap_lists_none_first_and_keeps_time_order() {
        let catalog = catalog();
        let body =
            serde_json::to_value(bootstrap(&catalog, date(2020, 1, 1), true, date(2022, 2, 2)))
                .unwrap();

        assert_eq!(body["animals"], json!(["none", "deer", "hog"]));
        assert_eq!(body["actions"], json!(["none", "feeding"]));
        assert_eq!(body["add_labels"], json!(["none"]));
        assert_eq!(body["sites"], json!({ "north": [31.5, -103.25] }));
        assert_eq!(body["start"], "2020-01-01");
        assert_eq!(body["end"], "2022-02-02");
        assert_eq!(body["restricted"], true);

        let json = serde_json::to_string(&bootstrap(&catalog, date(2020, 1, 1), true, date(2022, 2, 2)))
            .unwrap();
        let a = json.find("/c/a.mp4").unwrap();
        let r = json.find("/c/r.mp4").unwrap();
        let b = json.find("/c/b.mp4").unwrap();
        assert!(a < r && r < b);
    }

    #[test]
    fn filtered_response_has_subset_and_facets() {
        let catalog = catalog();
        let criteria = build_criteria(
            &query("sites=north,south&animals=none,deer,hog&actions=none,feeding&add_labels=none"),
            date(2020, 1, 1),
            true,
            date(2022, 1, 1),
        )
        .unwrap();

        let body = serde_json::to_value(filtered(&catalog, &criteria)).unwrap();
        let labels = body["video_labels"].as_object().unwrap();
        assert_eq!(labels.len(), 2);
        assert!(!labels.contains_key("/c/r.mp4"));
        assert_eq!(body["reverse_subset"]["sites"], json!(["north"]));
        assert_eq!(body["reverse_subset"]["animals"], json!(["deer", "none"]));
        assert_eq!(body["reverse_subset"]["actions"], json!(["feeding", "none"]));
    }

    #[test]
    fn restricted_false_includes_restricted_clips() {
        let catalog = catalog();
        let criteria = build_criteria(
            &query("sites=south&animals=hog&actions=none&add_labels=none&restricted=false"),
            date(2020, 1, 1),
            true,
            date(2022, 1, 1),
        )
        .unwrap();
        let body = serde_json::to_value(filtered(&catalog, &criteria)).unwrap();
        assert!(body["video_labels"].get("/c/r.mp4").is_some());
    }

    #[test]
    fn missing_category_matches_nothing() {
        let catalog = catalog();
        let criteria = build_criteria(
            &query("sites=north&animals=deer&actions=feeding"),
            date(2020, 1, 1),
            true,
            date(2022, 1, 1),
        )
        .unwrap();
        let body = serde_json::to_value(filtered(&catalog, &criteria)).unwrap();
        assert_eq!(body["video_labels"], json!({}));
        assert_eq!(body["reverse_subset"]["animals"], json!([]));
    }

    #[test]
    fn end_date_is_midnight_inclusive() {
        let criteria = build_criteria(
            &query("sites=north&animals=deer&actions=feeding&add_labels=none&end=2021-06-01"),
            date(2020, 1, 1),
            true,
            date(2022, 1, 1),
        )
        .unwrap();
        let body = serde_json::to_value(filtered(&catalog(), &criteria)).unwrap();
        assert_eq!(body["video_labels"], json!({}));
    }

    #[test]
    fn absent_end_covers_all_of_today() {
        let criteria = build_criteria(&query("sites=x"), date(2020, 1, 1), true, date(2021, 6, 1))
            .unwrap();
        assert!(criteria
            .date_range
            .contains(Timestamp::parse("2021-06-01T23:59:59").unwrap()));
    }

    #[test]
    fn bad_dates_and_flags_are_rejected() {
        let err = build_criteria(&query("start=yesterday"), date(2020, 1, 1), true, date(2022, 1, 1))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = build_criteria(&query("restricted=maybe"), date(2020, 1, 1), true, date(2022, 1, 1))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn bool_parsing() {
        for raw in ["true", "1", "YES", "on"] {
            assert!(parse_bool(raw).unwrap());
        }
        for raw in ["false", "0", "no", "Off"] {
            assert!(!parse_bool(raw).unwrap());
        }
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn sites_are_split_and_trimmed() {
        let sites = parse_sites(Some("north, south,,"));
        assert_eq!(sites.len(), 2);
        assert!(sites.contains("south"));
        assert!(parse_sites(None).is_empty());
    }
}
