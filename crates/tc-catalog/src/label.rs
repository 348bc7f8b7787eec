//! Taxonomy document model.
//!
//! The document is produced by the classification pipeline and looks like:
//!
//! ```json
//! {
//!   "video_labels": {
//!     "/mnt/D/north/clip_01.mp4": {
//!       "site": "north",
//!       "animals": ["deer"],
//!       "actions": ["feeding"],
//!       "additional_labels": [],
//!       "time": "2021-06-01T05:42:10",
//!       "restricted": false
//!     }
//!   },
//!   "sites": { "1": { "site": "north", "gps": [31.2, -103.5] } },
//!   "sorted_videos": { "animal_videos": {}, "actions": {}, "additional_labels": {} }
//! }
//! ```

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;
use tc_core::Result;

/// Labels attached to a single clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLabel {
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub animals: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub additional_labels: Vec<String>,
    pub time: RawTime,
    #[serde(default)]
    pub restricted: bool,
    /// Anything else the pipeline wrote; passed through to clients untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Capture time exactly as it appears in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Epoch(serde_json::Number),
    Text(String),
}

impl RawTime {
    pub fn parse(&self) -> Result<Timestamp> {
        match self {
            RawTime::Text(text) => Timestamp::parse(text),
            RawTime::Epoch(number) => match number.as_f64() {
                Some(secs) => Timestamp::from_epoch(secs),
                None => Timestamp::parse(&number.to_string()),
            },
        }
    }
}

/// Latitude/longitude pair, serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint(pub f64, pub f64);

impl GeoPoint {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteRecord {
    pub site: String,
    pub gps: GeoPoint,
}

/// Per-tag indices written by the pipeline. Only the tag names are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortedVideos {
    #[serde(default)]
    pub animal_videos: BTreeMap<String, IgnoredAny>,
    #[serde(default)]
    pub actions: BTreeMap<String, IgnoredAny>,
    #[serde(default)]
    pub additional_labels: BTreeMap<String, IgnoredAny>,
}

/// The whole taxonomy document.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyDocument {
    pub video_labels: BTreeMap<String, VideoLabel>,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteRecord>,
    #[serde(default)]
    pub sorted_videos: Option<SortedVideos>,
}
