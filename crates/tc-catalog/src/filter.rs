//! Category and date filtering over a catalog snapshot.
//!
//! Within one category a record matches if any selected tag is present
//! (OR); across categories every check must pass (AND). A selection with no
//! tags and no `"none"` can never be satisfied, so [`filter`] returns an
//! empty result for it without scanning. It is never read as "no
//! restriction".

use std::collections::HashSet;

use tc_core::{Error, Result};

use crate::store::Catalog;
use crate::timestamp::Timestamp;

/// Wire value meaning "records whose list for this category is empty".
pub const NONE: &str = "none";

/// Tags chosen for one list-valued category.
///
/// The `"none"` sentinel is lifted out of the tag set at parse time into
/// `include_empty`, so a record only matches it by having an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    tags: HashSet<String>,
    include_empty: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from wire values, treating `"none"` as the empty-list sentinel.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::new();
        for value in values {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            if value == NONE {
                selection.include_empty = true;
            } else {
                selection.tags.insert(value.to_string());
            }
        }
        selection
    }

    /// Parse a comma-separated query value. Blank segments are ignored.
    pub fn parse_list(raw: &str) -> Self {
        Self::from_values(raw.split(','))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_empty(mut self) -> Self {
        self.include_empty = true;
        self
    }

    pub fn includes_empty(&self) -> bool {
        self.include_empty
    }

    pub fn is_empty(&self) -> bool {
        !self.include_empty && self.tags.is_empty()
    }

    /// Whether a record carrying `values` satisfies this selection.
    pub fn matches(&self, values: &[String]) -> bool {
        if values.is_empty() {
            return self.include_empty;
        }
        values.iter().any(|v| self.tags.contains(v))
    }
}

/// Inclusive capture-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Parse both bounds. Each accepts any form [`Timestamp::parse`] does.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = Timestamp::parse(start)
            .map_err(|_| Error::Validation(format!("invalid start date: {start:?}")))?;
        let end = Timestamp::parse(end)
            .map_err(|_| Error::Validation(format!("invalid end date: {end:?}")))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Everything a query narrows on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub sites: HashSet<String>,
    pub animals: Selection,
    pub actions: Selection,
    pub add_labels: Selection,
    pub date_range: DateRange,
    pub exclude_restricted: bool,
}

impl FilterCriteria {
    /// True if some category has nothing selected, which matches nothing.
    pub fn has_empty_selection(&self) -> bool {
        self.sites.is_empty()
            || self.animals.is_empty()
            || self.actions.is_empty()
            || self.add_labels.is_empty()
    }
}

/// Keys of every record matching `criteria`, in catalog (ascending time) order.
pub fn filter<'a>(catalog: &'a Catalog, criteria: &FilterCriteria) -> Vec<&'a str> {
    if criteria.has_empty_selection() {
        tracing::debug!("Filter short-circuit: a category selection is empty");
        return Vec::new();
    }

    let matched: Vec<&str> = catalog
        .entries()
        .iter()
        .filter(|entry| {
            let label = &entry.label;
            !(criteria.exclude_restricted && label.restricted)
                && criteria.sites.contains(&label.site)
                && criteria.animals.matches(&label.animals)
                && criteria.actions.matches(&label.actions)
                && criteria.add_labels.matches(&label.additional_labels)
                && criteria.date_range.contains(entry.captured_at)
        })
        .map(|entry| entry.key.as_str())
        .collect();

    tracing::debug!(
        "Filter matched {} of {} videos",
        matched.len(),
        catalog.len()
    );
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_record_catalog() -> Catalog {
        let json = json!({
            "video_labels": {
                "B": { "site": "north", "animals": ["deer"], "time": "2021-06-01" },
                "A": { "site": "north", "animals": [], "time": "2021-01-01" }
            }
        })
        .to_string();
        Catalog::from_json(&json, None).unwrap()
    }

    fn sites(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn criteria(animals: Selection) -> FilterCriteria {
        FilterCriteria {
            sites: sites(&["north"]),
            animals,
            actions: Selection::new().with_empty(),
            add_labels: Selection::new().with_empty(),
            date_range: DateRange::parse("2020-01-01", "2022-01-01").unwrap(),
            exclude_restricted: false,
        }
    }

    fn mixed_catalog() -> Catalog {
        let json = json!({
            "video_labels": {
                "/v/1.mp4": { "site": "north", "animals": ["deer"], "actions": ["feeding"], "additional_labels": ["night"], "time": "2021-05-01T22:10:00" },
                "/v/2.mp4": { "site": "south", "animals": ["hog"], "actions": [], "additional_labels": [], "time": "2021-02-14" },
                "/v/3.mp4": { "site": "north", "animals": [], "actions": [], "additional_labels": [], "time": "2021-03-03", "restricted": true },
                "/v/4.mp4": { "site": "east", "animals": ["deer", "turkey"], "actions": ["walking"], "additional_labels": [], "time": "2021-04-20T06:00:00" },
                "/v/5.mp4": { "site": "south", "animals": ["none"], "actions": ["running"], "additional_labels": ["blurry"], "time": "2020-12-31T23:59:59" }
            }
        })
        .to_string();
        Catalog::from_json(&json, None).unwrap()
    }

    fn everything(catalog: &Catalog) -> FilterCriteria {
        let mut animals = Selection::new().with_empty();
        let mut actions = Selection::new().with_empty();
        let mut add_labels = Selection::new().with_empty();
        let mut all_sites = HashSet::new();
        for entry in catalog.entries() {
            all_sites.insert(entry.label.site.clone());
            for a in &entry.label.animals {
                animals = animals.with_tag(a.clone());
            }
            for a in &entry.label.actions {
                actions = actions.with_tag(a.clone());
            }
            for a in &entry.label.additional_labels {
                add_labels = add_labels.with_tag(a.clone());
            }
        }
        FilterCriteria {
            sites: all_sites,
            animals,
            actions,
            add_labels,
            date_range: DateRange::parse("2000-01-01", "2100-01-01").unwrap(),
            exclude_restricted: false,
        }
    }

    #[test]
    fn none_matches_only_empty_animal_lists() {
        let catalog = two_record_catalog();
        let result = filter(&catalog, &criteria(Selection::parse_list("none")));
        assert_eq!(result, vec!["A"]);
    }

    #[test]
    fn none_plus_tag_keeps_time_order() {
        let catalog = two_record_catalog();
        let result = filter(&catalog, &criteria(Selection::parse_list("deer,none")));
        assert_eq!(result, vec!["A", "B"]);
    }

    #[test]
    fn empty_category_selection_returns_nothing() {
        let catalog = mixed_catalog();
        let base = everything(&catalog);
        assert_eq!(filter(&catalog, &base).len(), 5);

        let mut no_sites = base.clone();
        no_sites.sites.clear();
        assert!(filter(&catalog, &no_sites).is_empty());

        let mut no_animals = base.clone();
        no_animals.animals = Selection::new();
        assert!(filter(&catalog, &no_animals).is_empty());

        let mut no_actions = base.clone();
        no_actions.actions = Selection::parse_list("");
        assert!(filter(&catalog, &no_actions).is_empty());

        let mut no_labels = base;
        no_labels.add_labels = Selection::parse_list(" , ,");
        assert!(filter(&catalog, &no_labels).is_empty());
    }

    #[test]
    fn restricted_records_excluded_when_requested() {
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        assert!(filter(&catalog, &c).contains(&"/v/3.mp4"));

        c.exclude_restricted = true;
        let result = filter(&catalog, &c);
        assert!(!result.contains(&"/v/3.mp4"));
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn sentinel_does_not_match_literal_none_tag() {
        // /v/5.mp4 carries a real tag spelled "none"; it has a non-empty list.
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        c.animals = Selection::parse_list("none");
        let result = filter(&catalog, &c);
        assert_eq!(result, vec!["/v/3.mp4"]);

        c.animals = Selection::new().with_tag("none");
        assert_eq!(filter(&catalog, &c), vec!["/v/5.mp4"]);
    }

    #[test]
    fn categories_combine_with_and() {
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        c.animals = Selection::parse_list("deer");
        c.actions = Selection::parse_list("walking");
        assert_eq!(filter(&catalog, &c), vec!["/v/4.mp4"]);

        c.sites = sites(&["north"]);
        assert!(filter(&catalog, &c).is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        c.date_range = DateRange::parse("2021-02-14", "2021-03-03").unwrap();
        assert_eq!(filter(&catalog, &c), vec!["/v/2.mp4", "/v/3.mp4"]);

        c.date_range = DateRange::parse("2020-12-31T23:59:59", "2020-12-31T23:59:59").unwrap();
        assert_eq!(filter(&catalog, &c), vec!["/v/5.mp4"]);
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        c.date_range = DateRange::parse("2022-01-01", "2020-01-01").unwrap();
        assert!(filter(&catalog, &c).is_empty());
    }

    #[test]
    fn output_is_ordered_subset_of_catalog() {
        let catalog = mixed_catalog();
        let mut c = everything(&catalog);
        c.animals = Selection::parse_list("deer,hog,none");
        let result = filter(&catalog, &c);

        let order: Vec<&str> = catalog.entries().iter().map(|e| e.key.as_str()).collect();
        let positions: Vec<usize> = result
            .iter()
            .map(|k| order.iter().position(|o| o == k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(result, vec!["/v/2.mp4", "/v/3.mp4", "/v/4.mp4", "/v/1.mp4"]);
    }

    #[test]
    fn selection_parsing() {
        let s = Selection::parse_list("deer, hog,,none");
        assert!(s.includes_empty());
        assert!(s.matches(&["hog".to_string()]));
        assert!(s.matches(&[]));
        assert!(!s.matches(&["turkey".to_string()]));
        assert!(Selection::parse_list("").is_empty());
        assert!(!Selection::parse_list("none").is_empty());
    }

    #[test]
    fn date_range_parse_errors() {
        assert!(matches!(
            DateRange::parse("soon", "2021-01-01"),
            Err(Error::Validation(_))
        ));
        assert!(DateRange::parse("2021-01-01", "later").is_err());
    }
}
