use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};

use crate::archive;
use crate::config::AppConfig;
use crate::record::{MatchResultRecord, SeasonWindow};
use crate::registry::PlayerRegistry;
use crate::result_cache::ResultCache;
use crate::results_fetch::{self, LiveFetch};
use crate::season_config::SeasonConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonMode {
    /// An archive file exists; read-only.
    Archived,
    /// No archive yet; scraped from the results page.
    Live,
}

pub fn mode_label(mode: SeasonMode) -> &'static str {
    match mode {
        SeasonMode::Archived => "ARCHIVED",
        SeasonMode::Live => "LIVE",
    }
}

#[derive(Debug, Clone)]
pub struct SeasonData {
    pub label: String,
    pub mode: SeasonMode,
    pub window: SeasonWindow,
    pub records: Vec<MatchResultRecord>,
    /// Console lines describing how the data was obtained.
    pub notes: Vec<String>,
    /// Set when live data could not be fetched at all.
    pub error: Option<String>,
    pub from_cache: bool,
}

impl SeasonData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `history_<label>.csv`, with path separators in the label replaced.
pub fn archive_file_name(label: &str) -> String {
    let safe = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>();
    format!("history_{safe}.csv")
}

pub fn archive_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(archive_file_name(label))
}

pub fn season_mode(dir: &Path, label: &str) -> SeasonMode {
    if archive_path(dir, label).is_file() {
        SeasonMode::Archived
    } else {
        SeasonMode::Live
    }
}

pub struct SeasonSource {
    archive_dir: PathBuf,
    results_url: String,
    cache: ResultCache<LiveFetch>,
}

impl SeasonSource {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            archive_dir: config.archive_dir.clone(),
            results_url: config.results_url.clone(),
            cache: ResultCache::new(config.cache_ttl),
        }
    }

    pub fn load(
        &mut self,
        label: &str,
        season: &SeasonConfig,
        registry: &PlayerRegistry,
        now: Instant,
    ) -> Result<SeasonData> {
        let url = self.results_url.clone();
        self.load_with(label, season, registry, now, |window| {
            results_fetch::fetch_and_extract(&url, registry, window)
        })
    }

    /// Archive first; otherwise a live extraction through the TTL cache.
    /// Failed fetches are not cached so the next load retries.
    pub fn load_with(
        &mut self,
        label: &str,
        season: &SeasonConfig,
        registry: &PlayerRegistry,
        now: Instant,
        fetch: impl FnOnce(&SeasonWindow) -> LiveFetch,
    ) -> Result<SeasonData> {
        let window = season.window()?;
        let path = archive_path(&self.archive_dir, label);

        if path.is_file() {
            let bytes =
                fs::read(&path).with_context(|| format!("read archive {}", path.display()))?;
            let report = archive::decode_with_report(&bytes, registry);
            let records = report
                .records
                .iter()
                .filter(|r| window.contains(&r.date))
                .cloned()
                .collect::<Vec<_>>();
            let mut notes = vec![format!(
                "[INFO] {label}: archive {} ({})",
                path.display(),
                report.summary()
            )];
            let dropped = report.records.len() - records.len();
            if dropped > 0 {
                notes.push(format!(
                    "[WARN] {label}: {dropped} archived records outside {window}"
                ));
            }
            return Ok(SeasonData {
                label: label.to_string(),
                mode: SeasonMode::Archived,
                window,
                records,
                notes,
                error: None,
                from_cache: false,
            });
        }

        let (live, from_cache) = match self.cache.get(&window, now) {
            Some(cached) => (cached, true),
            None => {
                let fetched = fetch(&window);
                if fetched.error.is_none() {
                    self.cache.insert(window.clone(), fetched.clone(), now);
                }
                (fetched, false)
            }
        };

        let mut notes = Vec::new();
        match &live.error {
            Some(err) => notes.push(format!("[WARN] {label}: fetch failed: {err}")),
            None => {
                let origin = match self.cache.age(&window, now).filter(|_| from_cache) {
                    Some(age) => format!("cached {}s ago,", age.as_secs()),
                    None => "fetched".to_string(),
                };
                notes.push(format!(
                    "[INFO] {label}: {origin} {}",
                    live.report.summary()
                ));
            }
        }
        for warning in &live.report.warnings {
            notes.push(format!("[WARN] {warning}"));
        }

        Ok(SeasonData {
            label: label.to_string(),
            mode: SeasonMode::Live,
            window,
            records: live.report.records,
            notes,
            error: live.error,
            from_cache,
        })
    }

    /// Drop the memoized extraction so the next load refetches.
    pub fn refresh(&mut self, season: &SeasonConfig) -> Result<()> {
        let window = season.window()?;
        self.cache.invalidate(&window);
        Ok(())
    }
}

/// Write the current live snapshot as an archive-format CSV into `dir`.
/// Archived seasons are already persisted and are refused.
pub fn export_snapshot(
    data: &SeasonData,
    registry: &PlayerRegistry,
    dir: &Path,
) -> Result<PathBuf> {
    if data.mode == SeasonMode::Archived {
        return Err(anyhow!("season {} is already archived", data.label));
    }
    if data.records.is_empty() {
        return Err(anyhow!("season {} has no records to export", data.label));
    }
    let bytes = archive::encode(&data.records, registry)?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = archive_path(dir, &data.label);
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
    Ok(path)
}
