use std::collections::HashMap;

use anyhow::{Result, anyhow};

use crate::season_config::SeasonConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerInfo {
    pub name: String,
    pub color: String,
}

/// Player -> owner mapping for one season. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    owner_of: HashMap<String, String>,
    // Whitespace-free spelling -> canonical player name.
    compact: HashMap<String, String>,
    owners: Vec<OwnerInfo>,
    players_sorted: Vec<String>,
}

impl PlayerRegistry {
    pub fn from_season(season: &SeasonConfig) -> Result<Self> {
        let mut registry = Self::default();
        for (owner, team) in &season.teams {
            registry.owners.push(OwnerInfo {
                name: owner.clone(),
                color: team.color.clone(),
            });
            for player in &team.players {
                registry.insert(player, owner)?;
            }
        }
        registry.finish();
        Ok(registry)
    }

    /// Registry without colors, owners ordered by first appearance.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut registry = Self::default();
        for (player, owner) in pairs {
            if !registry.owners.iter().any(|o| o.name == owner) {
                registry.owners.push(OwnerInfo {
                    name: owner.to_string(),
                    color: String::new(),
                });
            }
            registry.insert(player, owner)?;
        }
        registry.finish();
        Ok(registry)
    }

    fn insert(&mut self, player: &str, owner: &str) -> Result<()> {
        let name = player.trim();
        if name.is_empty() {
            return Err(anyhow!("owner {owner} lists an empty player name"));
        }
        if let Some(existing) = self.owner_of.get(name) {
            if existing != owner {
                return Err(anyhow!(
                    "player {name} is listed under both {existing} and {owner}"
                ));
            }
            return Ok(());
        }
        let compact = compact_name(name);
        if let Some(other) = self.compact.get(&compact) {
            return Err(anyhow!(
                "players {other} and {name} differ only in spacing"
            ));
        }
        self.owner_of.insert(name.to_string(), owner.to_string());
        self.compact.insert(compact, name.to_string());
        Ok(())
    }

    fn finish(&mut self) {
        let mut players = self.owner_of.keys().cloned().collect::<Vec<_>>();
        players.sort();
        self.players_sorted = players;
    }

    /// Resolve page text to a canonical player name: exact first, then
    /// ignoring ASCII and ideographic whitespace.
    pub fn lookup(&self, text: &str) -> Option<&str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some((name, _)) = self.owner_of.get_key_value(trimmed) {
            return Some(name.as_str());
        }
        self.compact.get(&compact_name(trimmed)).map(|s| s.as_str())
    }

    /// "Alice+30.5" -> ("Alice", "+30.5"), preferring the longest
    /// registered name that prefixes `text`.
    pub fn split_name_prefix<'t>(&self, text: &'t str) -> Option<(&str, &'t str)> {
        self.players_sorted
            .iter()
            .filter(|name| text.len() > name.len() && text.starts_with(name.as_str()))
            .max_by_key(|name| name.len())
            .map(|name| (name.as_str(), &text[name.len()..]))
    }

    pub fn owner_of(&self, player: &str) -> Option<&str> {
        self.owner_of.get(player).map(|s| s.as_str())
    }

    pub fn contains(&self, player: &str) -> bool {
        self.owner_of.contains_key(player)
    }

    /// Every registered player, lexicographic.
    pub fn players_sorted(&self) -> &[String] {
        &self.players_sorted
    }

    pub fn owners(&self) -> &[OwnerInfo] {
        &self.owners
    }

    pub fn color_of(&self, owner: &str) -> Option<&str> {
        self.owners
            .iter()
            .find(|o| o.name == owner)
            .map(|o| o.color.as_str())
            .filter(|c| !c.is_empty())
    }

    pub fn players_of(&self, owner: &str) -> Vec<&str> {
        self.players_sorted
            .iter()
            .filter(|p| self.owner_of(p) == Some(owner))
            .map(|p| p.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owner_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner_of.is_empty()
    }
}

fn compact_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}
