use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::record::SeasonWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub start_date: String,
    pub end_date: String,
    /// Owner name -> roster.
    #[serde(default)]
    pub teams: BTreeMap<String, TeamConfig>,
}

impl SeasonConfig {
    pub fn window(&self) -> Result<SeasonWindow> {
        SeasonWindow::new(&self.start_date, &self.end_date).ok_or_else(|| {
            anyhow!(
                "invalid season window {}..{}",
                self.start_date,
                self.end_date
            )
        })
    }
}

/// All configured seasons keyed by label (e.g. "2024-25").
#[derive(Debug, Clone, Default)]
pub struct SeasonRegistry {
    seasons: BTreeMap<String, SeasonConfig>,
}

impl SeasonRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("season config not found at {}", path.display()))?;
        Self::parse_str(&raw).with_context(|| format!("load season config {}", path.display()))
    }

    pub fn parse_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("season config is empty"));
        }
        let seasons: BTreeMap<String, SeasonConfig> =
            serde_json::from_str(trimmed).context("invalid season config json")?;
        if seasons.is_empty() {
            return Err(anyhow!("season config has no seasons"));
        }
        for (label, season) in &seasons {
            season.window().with_context(|| format!("season {label}"))?;
        }
        Ok(Self { seasons })
    }

    pub fn labels(&self) -> Vec<String> {
        self.seasons.keys().cloned().collect()
    }

    pub fn get(&self, label: &str) -> Option<&SeasonConfig> {
        self.seasons.get(label)
    }

    /// Labels sort chronologically ("2023-24" < "2024-25"), so the last one is current.
    pub fn latest_label(&self) -> Option<&str> {
        self.seasons.keys().next_back().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }
}
