use std::collections::VecDeque;
use std::time::Instant;

use crate::registry::PlayerRegistry;
use crate::source::{SeasonData, SeasonMode};
use crate::standings::{self, DayTotals, MatchGroup, OwnerStanding, PlayerStanding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Standings,
    Players,
    Matches,
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub done: bool,
    pub path: Option<String>,
    pub message: String,
    pub last_updated: Option<Instant>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self {
            done: false,
            path: None,
            message: String::new(),
            last_updated: None,
        }
    }

    pub fn finish(&mut self, path: Option<String>, message: impl Into<String>, now: Instant) {
        self.done = true;
        self.path = path;
        self.message = message.into();
        self.last_updated = Some(now);
    }

    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::new();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub seasons: Vec<String>,
    pub season_idx: usize,
    pub data: Option<SeasonData>,
    pub owners: Vec<OwnerStanding>,
    pub players: Vec<PlayerStanding>,
    pub matches: Vec<MatchGroup>,
    pub days: Vec<DayTotals>,
    /// Owner -> running total after each played date.
    pub trend: Vec<(String, Vec<(String, f64)>)>,
    pub selected: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

impl AppState {
    /// `seasons` must be sorted oldest first; `initial` falls back to the newest.
    pub fn new(seasons: Vec<String>, initial: Option<&str>) -> Self {
        let season_idx = initial
            .and_then(|label| seasons.iter().position(|s| s == label))
            .unwrap_or_else(|| seasons.len().saturating_sub(1));
        Self {
            screen: Screen::Standings,
            seasons,
            season_idx,
            data: None,
            owners: Vec::new(),
            players: Vec::new(),
            matches: Vec::new(),
            days: Vec::new(),
            trend: Vec::new(),
            selected: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            export: ExportState::new(),
        }
    }

    pub fn selected_season(&self) -> Option<&str> {
        self.seasons.get(self.season_idx).map(|s| s.as_str())
    }

    pub fn cycle_season_next(&mut self) {
        if self.seasons.is_empty() {
            return;
        }
        self.season_idx = (self.season_idx + 1) % self.seasons.len();
    }

    pub fn cycle_season_prev(&mut self) {
        if self.seasons.is_empty() {
            return;
        }
        self.season_idx = if self.season_idx == 0 {
            self.seasons.len() - 1
        } else {
            self.season_idx - 1
        };
    }

    pub fn set_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            self.screen = screen;
            self.selected = 0;
        }
    }

    /// Replace the shown season and recompute every view from its records.
    pub fn apply_season(&mut self, data: SeasonData, registry: &PlayerRegistry) {
        for note in &data.notes {
            self.push_log(note.clone());
        }
        if data.records.is_empty() {
            self.push_log(format!("[WARN] {}: no data available", data.label));
        }
        self.owners = standings::owner_standings(&data.records, registry);
        self.players = standings::player_standings(&data.records, registry);
        self.matches = standings::match_groups(&data.records);
        self.days = standings::daily_owner_totals(&data.records);
        self.trend = standings::cumulative_owner_series(&data.records, registry);
        self.data = Some(data);
        self.clamp_selection();
    }

    pub fn clear_season(&mut self) {
        self.data = None;
        self.owners.clear();
        self.players.clear();
        self.matches.clear();
        self.days.clear();
        self.trend.clear();
        self.selected = 0;
    }

    pub fn mode(&self) -> Option<SeasonMode> {
        self.data.as_ref().map(|d| d.mode)
    }

    pub fn has_records(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Snapshot download only makes sense for a live season with data.
    pub fn can_export(&self) -> bool {
        self.mode() == Some(SeasonMode::Live) && self.has_records()
    }

    pub fn row_count(&self) -> usize {
        match self.screen {
            Screen::Standings => self.owners.len(),
            Screen::Players => self.players.len(),
            Screen::Matches => self.matches.len(),
        }
    }

    pub fn select_next(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1).min(total - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clamp_selection(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }
}

pub fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Standings => "STANDINGS",
        Screen::Players => "PLAYERS",
        Screen::Matches => "MATCHES",
    }
}
