//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! server, catalog, and auth sections. Every section defaults sensibly so an
//! empty file is valid.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Environment variable overriding [`CatalogConfig::path`].
pub const TAXONOMY_ENV: &str = "TRAILCAM_TAXONOMY";

/// Locations searched when no `--config` is given.
const DEFAULT_PATHS: &[&str] = &[
    "./trailcam.toml",
    "~/.config/trailcam/config.toml",
    "/etc/trailcam/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from an explicit file path.
    ///
    /// Unlike [`Config::load_or_default`], a missing file is an error here.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("failed to read config {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from `path` if given, otherwise from the first
    /// default location that exists, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                tracing::info!("Using config file {}", candidate.display());
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found; using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(TAXONOMY_ENV) {
            if !path.is_empty() {
                self.catalog.path = PathBuf::from(shellexpand::tilde(&path).as_ref());
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.enabled {
            if self.auth.username.is_none() {
                warnings.push("auth is enabled but no username is set; /token will reject all logins".into());
            }
            if self.auth.username.is_some() && self.auth.password_hash.is_none() {
                warnings.push("auth username is set but password_hash is missing".into());
            }
            if self.auth.secret.is_none() {
                warnings.push(
                    "auth.secret is not set; a random signing key will be used and tokens will not survive restarts"
                        .into(),
                );
            }
            if self.auth.token_ttl_minutes == 0 {
                warnings.push("auth.token_ttl_minutes is 0; issued tokens expire immediately".into());
            }
        }

        if let Some(ref rewrite) = self.catalog.path_rewrite {
            if rewrite.from.is_empty() {
                warnings.push("catalog.path_rewrite.from is empty; keys will only be prefixed".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Built front-end to serve as a SPA fallback.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 10000,
            static_dir: None,
        }
    }
}

/// Where the taxonomy lives and how its records are presented.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Taxonomy JSON document.
    pub path: PathBuf,
    /// Rewrite applied to every video key before it is indexed.
    pub path_rewrite: Option<PathRewrite>,
    /// Start of the date range offered on the bootstrap response.
    pub default_start: NaiveDate,
    /// Whether restricted clips are hidden by default.
    pub default_restricted: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("GameCamClassifiers.json"),
            path_rewrite: None,
            default_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            default_restricted: true,
        }
    }
}

/// Prefix substitution for video keys produced on another machine.
///
/// Keys beginning with `from` have it replaced by `to`; backslashes in the
/// remainder are turned into forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    pub from: String,
    pub to: String,
}

impl PathRewrite {
    /// Apply the rewrite to one key. Keys outside `from` are returned as-is.
    pub fn apply(&self, key: &str) -> String {
        match key.strip_prefix(self.from.as_str()) {
            Some(rest) => {
                let rest = rest.replace('\\', "/");
                let rest = rest.trim_start_matches('/');
                if self.to.ends_with('/') || self.to.is_empty() {
                    format!("{}{rest}", self.to)
                } else {
                    format!("{}/{rest}", self.to)
                }
            }
            None => key.to_string(),
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub username: Option<String>,
    /// Bcrypt hash of the password (generate with `trailcam hash-password`).
    pub password_hash: Option<String>,
    /// HMAC key for signing bearer tokens.
    pub secret: Option<String>,
    pub token_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: None,
            password_hash: None,
            secret: None,
            token_ttl_minutes: 120,
        }
    }
}
