use std::path::PathBuf;
use std::time::Duration;

use crate::results_fetch::DEFAULT_RESULTS_URL;

const DEFAULT_SEASONS_PATH: &str = "config/seasons.json";
const DEFAULT_ARCHIVE_DIR: &str = "data";
const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub seasons_path: PathBuf,
    pub archive_dir: PathBuf,
    pub export_dir: PathBuf,
    pub results_url: String,
    pub cache_ttl: Duration,
    pub initial_season: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seasons_path: PathBuf::from(DEFAULT_SEASONS_PATH),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            export_dir: PathBuf::from("."),
            results_url: DEFAULT_RESULTS_URL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            initial_season: None,
        }
    }
}

impl AppConfig {
    /// Reads `.env.local` / `.env` when present, then the `POG_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = Self::default();
        let cache_ttl_secs = std::env::var("POG_CACHE_TTL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS)
            .max(60);

        Self {
            seasons_path: path_env("POG_SEASONS_PATH").unwrap_or(defaults.seasons_path),
            archive_dir: path_env("POG_ARCHIVE_DIR").unwrap_or(defaults.archive_dir),
            export_dir: path_env("POG_EXPORT_DIR").unwrap_or(defaults.export_dir),
            results_url: non_empty_env("POG_RESULTS_URL").unwrap_or(defaults.results_url),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            initial_season: non_empty_env("POG_SEASON"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn path_env(key: &str) -> Option<PathBuf> {
    non_empty_env(key).map(PathBuf::from)
}
