//! The catalog snapshot and the store that publishes it.
//!
//! A [`Catalog`] is built once from a [`TaxonomyDocument`] and never mutated.
//! [`CatalogStore`] owns the current snapshot behind an `Arc`; readers clone
//! the `Arc` and keep a consistent view for as long as they hold it, while
//! [`CatalogStore::reload`] builds a fresh catalog and swaps the pointer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tc_core::config::{CatalogConfig, PathRewrite};
use tc_core::{Error, Result};

use crate::label::{GeoPoint, TaxonomyDocument, VideoLabel};
use crate::timestamp::Timestamp;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One indexed clip.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub key: String,
    pub label: VideoLabel,
    pub captured_at: Timestamp,
}

/// Tag names offered to clients before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    pub animals: Vec<String>,
    pub actions: Vec<String>,
    pub add_labels: Vec<String>,
}

/// Immutable, time-ordered set of video labels.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Sorted ascending by `captured_at`, ties by key.
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    sites: BTreeMap<String, GeoPoint>,
    vocabulary: Vocabulary,
}

impl Catalog {
    /// Build a catalog from a parsed document.
    ///
    /// Fails if any timestamp cannot be parsed or if two keys collide after
    /// `rewrite` is applied.
    pub fn from_document(doc: TaxonomyDocument, rewrite: Option<&PathRewrite>) -> Result<Self> {
        let mut entries = Vec::with_capacity(doc.video_labels.len());
        for (key, label) in doc.video_labels {
            let captured_at = label
                .time
                .parse()
                .map_err(|e| Error::catalog(format!("{key}: {e}")))?;
            let key = match rewrite {
                Some(rewrite) => rewrite.apply(&key),
                None => key,
            };
            entries.push(CatalogEntry {
                key,
                label,
                captured_at,
            });
        }

        entries.sort_by(|a, b| {
            a.captured_at
                .cmp(&b.captured_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.key.clone(), pos).is_some() {
                return Err(Error::catalog(format!(
                    "duplicate video key after path rewrite: {}",
                    entry.key
                )));
            }
        }

        let sites = doc
            .sites
            .into_values()
            .map(|record| (record.site, record.gps))
            .collect();

        let vocabulary = match doc.sorted_videos {
            Some(sorted) => Vocabulary {
                animals: tag_names(sorted.animal_videos.into_keys()),
                actions: tag_names(sorted.actions.into_keys()),
                add_labels: tag_names(sorted.additional_labels.into_keys()),
            },
            None => Vocabulary {
                animals: tag_names(entries.iter().flat_map(|e| e.label.animals.iter().cloned())),
                actions: tag_names(entries.iter().flat_map(|e| e.label.actions.iter().cloned())),
                add_labels: tag_names(
                    entries
                        .iter()
                        .flat_map(|e| e.label.additional_labels.iter().cloned()),
                ),
            },
        };

        Ok(Self {
            entries,
            index,
            sites,
            vocabulary,
        })
    }

    /// Parse a JSON taxonomy document and build a catalog from it.
    pub fn from_json(json: &str, rewrite: Option<&PathRewrite>) -> Result<Self> {
        let doc: TaxonomyDocument = serde_json::from_str(json)
            .map_err(|e| Error::catalog(format!("taxonomy parse error: {e}")))?;
        Self::from_document(doc, rewrite)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ascending capture order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Site name to coordinate.
    pub fn sites(&self) -> &BTreeMap<String, GeoPoint> {
        &self.sites
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Earliest and latest capture time, if the catalog is not empty.
    pub fn time_span(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.entries.first()?.captured_at, self.entries.last()?.captured_at))
    }
}

/// Distinct tag names in sorted order, without the "none" sentinel.
fn tag_names(names: impl Iterator<Item = String>) -> Vec<String> {
    names
        .filter(|name| name != crate::filter::NONE)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CatalogSource {
    path: PathBuf,
    rewrite: Option<PathRewrite>,
}

/// Owner of the published catalog snapshot.
#[derive(Debug)]
pub struct CatalogStore {
    source: Option<CatalogSource>,
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    /// Load the taxonomy named by `config` and publish it.
    pub fn load(config: &CatalogConfig) -> Result<Self> {
        let source = CatalogSource {
            path: config.path.clone(),
            rewrite: config.path_rewrite.clone(),
        };
        let catalog = read_catalog(&source.path, source.rewrite.as_ref())?;
        Ok(Self {
            source: Some(source),
            current: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Wrap an already-built catalog. Such a store cannot be reloaded.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Publish a new snapshot. Readers holding the old one are unaffected.
    pub fn replace(&self, catalog: Catalog) {
        *self.current.write() = Arc::new(catalog);
    }

    /// Re-read the source document and publish the result.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn reload(&self) -> Result<usize> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Validation("catalog has no source to reload from".into()))?;
        let catalog = read_catalog(&source.path, source.rewrite.as_ref())?;
        let count = catalog.len();
        self.replace(catalog);
        tracing::info!("Catalog reloaded: {count} videos");
        Ok(count)
    }
}

fn read_catalog(path: &Path, rewrite: Option<&PathRewrite>) -> Result<Catalog> {
    tracing::info!("Loading taxonomy from {}", path.display());
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::catalog(format!("failed to read {}: {e}", path.display())))?;
    let catalog = Catalog::from_json(&contents, rewrite)?;
    tracing::info!(
        "Catalog ready: {} videos, {} sites",
        catalog.len(),
        catalog.sites().len()
    );
    Ok(catalog)
}
