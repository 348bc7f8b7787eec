//! tc-catalog: the in-memory video label catalog and its query engine.
//!
//! - [`store::CatalogStore`] loads the taxonomy document once and publishes an
//!   immutable, time-ordered [`store::Catalog`] snapshot.
//! - [`filter::filter`] narrows a snapshot by category selections and a date
//!   range.
//! - [`facets::reduce`] recomputes which facet values remain selectable for a
//!   result subset.

pub mod facets;
pub mod filter;
pub mod label;
pub mod store;
pub mod timestamp;

pub use facets::{reduce, FacetSummary};
pub use filter::{filter, DateRange, FilterCriteria, Selection};
pub use label::{GeoPoint, RawTime, TaxonomyDocument, VideoLabel};
pub use store::{Catalog, CatalogEntry, CatalogStore, Vocabulary};
pub use timestamp::Timestamp;
