use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::record::{MatchResultRecord, match_uid, round_point};
use crate::registry::PlayerRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct OwnerStanding {
    pub rank: usize,
    pub owner: String,
    pub color: Option<String>,
    pub total: f64,
    /// Player-match appearances counted towards the total.
    pub appearances: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStanding {
    pub rank: usize,
    pub player: String,
    pub owner: String,
    pub total: f64,
    pub matches: usize,
    pub best: Option<f64>,
}

impl PlayerStanding {
    pub fn average(&self) -> Option<f64> {
        if self.matches == 0 {
            return None;
        }
        Some(round_point(self.total / self.matches as f64))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTotals {
    pub date: String,
    /// Owner -> points scored on this date; owners without games are absent.
    pub totals: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchGroup {
    pub date: String,
    pub match_index: u32,
    pub match_uid: String,
    /// (player, owner, point) in input order.
    pub results: Vec<(String, String, f64)>,
}

/// Every owner in the registry, best total first. Ties keep registry order.
pub fn owner_standings(
    records: &[MatchResultRecord],
    registry: &PlayerRegistry,
) -> Vec<OwnerStanding> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in records {
        let entry = totals.entry(record.owner.as_str()).or_insert((0.0, 0));
        entry.0 += record.point;
        entry.1 += 1;
    }

    let mut rows = registry
        .owners()
        .iter()
        .map(|owner| {
            let (total, appearances) = totals.get(owner.name.as_str()).copied().unwrap_or((0.0, 0));
            OwnerStanding {
                rank: 0,
                owner: owner.name.clone(),
                color: registry.color_of(&owner.name).map(|c| c.to_string()),
                total: round_point(total),
                appearances,
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| desc(a.total, b.total));
    assign_ranks(&mut rows, |r| r.total, |r, rank| r.rank = rank);
    rows
}

/// Every registered player, best total first, then by name.
pub fn player_standings(
    records: &[MatchResultRecord],
    registry: &PlayerRegistry,
) -> Vec<PlayerStanding> {
    let mut by_player: HashMap<&str, Vec<f64>> = HashMap::new();
    for record in records {
        by_player
            .entry(record.player.as_str())
            .or_default()
            .push(record.point);
    }

    let mut rows = registry
        .players_sorted()
        .iter()
        .map(|player| {
            let points = by_player.get(player.as_str()).cloned().unwrap_or_default();
            let best = points.iter().copied().fold(None, |acc: Option<f64>, p| {
                Some(acc.map_or(p, |a| a.max(p)))
            });
            PlayerStanding {
                rank: 0,
                player: player.clone(),
                owner: registry.owner_of(player).unwrap_or_default().to_string(),
                total: round_point(points.iter().sum()),
                matches: points.len(),
                best,
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| desc(a.total, b.total).then_with(|| a.player.cmp(&b.player)));
    assign_ranks(&mut rows, |r| r.total, |r, rank| r.rank = rank);
    rows
}

pub fn daily_owner_totals(records: &[MatchResultRecord]) -> Vec<DayTotals> {
    let mut by_date: BTreeMap<&str, BTreeMap<String, f64>> = BTreeMap::new();
    for record in records {
        *by_date
            .entry(record.date.as_str())
            .or_default()
            .entry(record.owner.clone())
            .or_insert(0.0) += record.point;
    }
    by_date
        .into_iter()
        .map(|(date, totals)| DayTotals {
            date: date.to_string(),
            totals: totals
                .into_iter()
                .map(|(owner, total)| (owner, round_point(total)))
                .collect(),
        })
        .collect()
}

/// Running total per owner after each played date, for the trend chart.
pub fn cumulative_owner_series(
    records: &[MatchResultRecord],
    registry: &PlayerRegistry,
) -> Vec<(String, Vec<(String, f64)>)> {
    let days = daily_owner_totals(records);
    registry
        .owners()
        .iter()
        .map(|owner| {
            let mut running = 0.0;
            let series = days
                .iter()
                .map(|day| {
                    running += day.totals.get(&owner.name).copied().unwrap_or(0.0);
                    (day.date.clone(), round_point(running))
                })
                .collect();
            (owner.name.clone(), series)
        })
        .collect()
}

/// Matches grouped by uid, newest date first, match index ascending.
pub fn match_groups(records: &[MatchResultRecord]) -> Vec<MatchGroup> {
    let mut groups: BTreeMap<(String, u32), Vec<(String, String, f64)>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.date.clone(), record.match_index))
            .or_default()
            .push((record.player.clone(), record.owner.clone(), record.point));
    }
    let mut out = groups
        .into_iter()
        .map(|((date, match_index), results)| MatchGroup {
            match_uid: match_uid(&date, match_index),
            date,
            match_index,
            results,
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.match_index.cmp(&b.match_index))
    });
    out
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// Competition ranking: equal totals share a rank (1, 2, 2, 4).
fn assign_ranks<T>(rows: &mut [T], total: impl Fn(&T) -> f64, set: impl Fn(&mut T, usize)) {
    let mut prev: Option<f64> = None;
    let mut rank = 0;
    for idx in 0..rows.len() {
        let value = total(&rows[idx]);
        if prev != Some(value) {
            rank = idx + 1;
            prev = Some(value);
        }
        set(&mut rows[idx], rank);
    }
}
