//! Facet reduction: which filter values remain selectable for a subset.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::NONE;
use crate::store::Catalog;

/// Distinct values per category across a subset of the catalog.
///
/// Collections are sorted ascending. `"none"` appears in a list-valued
/// category when at least one member of the subset has an empty list there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetSummary {
    pub sites: BTreeSet<String>,
    pub animals: BTreeSet<String>,
    pub actions: BTreeSet<String>,
    pub add_labels: BTreeSet<String>,
}

impl FacetSummary {
    /// True when every collection here is contained in `other`.
    pub fn is_subset(&self, other: &FacetSummary) -> bool {
        self.sites.is_subset(&other.sites)
            && self.animals.is_subset(&other.animals)
            && self.actions.is_subset(&other.actions)
            && self.add_labels.is_subset(&other.add_labels)
    }
}

fn absorb(into: &mut BTreeSet<String>, values: &[String]) {
    if values.is_empty() {
        into.insert(NONE.to_string());
    } else {
        into.extend(values.iter().cloned());
    }
}

/// Summarize the facets present among `keys`. Unknown keys are skipped.
pub fn reduce<'k, I>(keys: I, catalog: &Catalog) -> FacetSummary
where
    I: IntoIterator<Item = &'k str>,
{
    let mut summary = FacetSummary::default();

    for key in keys {
        let Some(entry) = catalog.get(key) else {
            continue;
        };
        let label = &entry.label;

        if !label.site.is_empty() {
            summary.sites.insert(label.site.clone());
        }
        absorb(&mut summary.animals, &label.animals);
        absorb(&mut summary.actions, &label.actions);
        absorb(&mut summary.add_labels, &label.additional_labels);
    }

    summary
}
