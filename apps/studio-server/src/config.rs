use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_EXPORT_DIR: &str = "./exports";
pub const DEFAULT_CATALOG_PATH: &str = "config/studio_catalog.json";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Boot-time settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub port: u16,
    pub export_dir: PathBuf,
    pub catalog_path: PathBuf,
    /// Sessions untouched for longer than this are evicted.
    pub session_ttl: Duration,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            port: DEFAULT_PORT,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("STUDIO_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("STUDIO_PORT '{}' is not a valid port. Using {}.", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let session_ttl = match lookup("STUDIO_SESSION_TTL_SECS") {
            Some(raw) => raw.parse().map(Duration::from_secs).unwrap_or_else(|_| {
                tracing::warn!(
                    "STUDIO_SESSION_TTL_SECS '{}' is not a number of seconds. Using {}.",
                    raw,
                    DEFAULT_SESSION_TTL_SECS
                );
                defaults.session_ttl
            }),
            None => defaults.session_ttl,
        };

        StudioConfig {
            port,
            export_dir: lookup("STUDIO_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            catalog_path: lookup("STUDIO_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            session_ttl,
        }
    }
}
