//! Shared test harness for integration tests.
//!
//! [`TestHarness::start`] writes a small taxonomy and its media files into a
//! temp directory, then serves it on a random port with auth enabled.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use tc_catalog::CatalogStore;
use tc_core::config::Config;
use tc_server::auth::{AuthGate, HmacTokenGate};

pub const USERNAME: &str = "ranger";
pub const PASSWORD: &str = "hunter2";
pub const SECRET: &str = "integration-secret";

/// Size of every media file written by the harness.
pub const CLIP_SIZE: usize = 2000;

/// Running server plus the files it serves.
pub struct TestHarness {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    /// Serve the default fixture with auth enabled.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Serve the default fixture after `tweak` adjusts the config.
    pub async fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let mut config = Config::default();
        config.server.host = "127.0.0.1".into();
        config.catalog.path = dir.path().join("labels.json");
        config.auth.username = Some(USERNAME.into());
        config.auth.password_hash = Some(bcrypt::hash(PASSWORD, 4).unwrap());
        config.auth.secret = Some(SECRET.into());
        tweak(&mut config);

        let store = CatalogStore::load(&config.catalog).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_config = config.clone();
        tokio::spawn(async move {
            tc_server::serve(listener, server_config, store).await.ok();
        });

        Self { addr, dir, config }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A valid bearer token for the configured account.
    pub fn token(&self) -> String {
        HmacTokenGate::new(SECRET.as_bytes().to_vec(), 3600, Some(USERNAME.into()))
            .issue(USERNAME)
            .unwrap()
            .access_token
    }

    /// Catalog key (absolute path) for a fixture clip.
    pub fn clip(&self, name: &str) -> String {
        clip_path(self.dir.path(), name)
    }

    /// GET /api/labels with a bearer token and the given query pairs.
    pub async fn labels(&self, query: &[(&str, &str)]) -> reqwest::Response {
        reqwest::Client::new()
            .get(self.url("/api/labels"))
            .bearer_auth(self.token())
            .query(query)
            .send()
            .await
            .unwrap()
    }

    /// Overwrite the taxonomy document on disk.
    pub fn write_taxonomy(&self, doc: &Value) {
        std::fs::write(self.config.catalog.path.clone(), doc.to_string()).unwrap();
    }
}

fn clip_path(root: &Path, name: &str) -> String {
    root.join(name).to_string_lossy().into_owned()
}

/// Clip contents: a repeating byte ramp so slices are distinguishable.
pub fn clip_bytes() -> Vec<u8> {
    (0..=255u8).cycle().take(CLIP_SIZE).collect()
}

/// The fixture taxonomy. `missing.mp4` is indexed but never written.
pub fn fixture_doc(root: &Path) -> Value {
    json!({
        "video_labels": {
            clip_path(root, "north/deer_feeding.mp4"): {
                "site": "north", "animals": ["deer"], "actions": ["feeding"],
                "additional_labels": [], "time": "2021-06-01T05:42:10", "restricted": false
            },
            clip_path(root, "north/empty.mp4"): {
                "site": "north", "animals": [], "actions": [],
                "additional_labels": [], "time": "2021-01-01"
            },
            clip_path(root, "south/hog.mp4"): {
                "site": "south", "animals": ["hog"], "actions": ["walking"],
                "additional_labels": ["night"], "time": 1615000000, "restricted": true
            },
            clip_path(root, "south/missing.mp4"): {
                "site": "south", "animals": ["deer"], "actions": [],
                "additional_labels": [], "time": "2021-07-01"
            },
            clip_path(root, "east/coyote.mp4"): {
                "site": "east", "animals": ["coyote"], "actions": [],
                "additional_labels": [], "time": "2022-02-02 10:00:00"
            }
        },
        "sites": {
            "1": { "site": "north", "gps": [31.5, -103.25] },
            "2": { "site": "south", "gps": [30.75, -104.5] }
        }
    })
}

fn write_fixture(root: &Path) {
    for name in ["north/deer_feeding.mp4", "north/empty.mp4", "south/hog.mp4", "east/coyote.mp4"] {
        let path = PathBuf::from(clip_path(root, name));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, clip_bytes()).unwrap();
    }
    std::fs::write(root.join("labels.json"), fixture_doc(root).to_string()).unwrap();
}
