//! Configuration
//!
//! Manager policy and the scenario file driving the simulation binary, both
//! read from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LoadError;
use crate::events::EventKind;
use crate::roster::PlayerRef;

/// Policy knobs for [`QuestManager`](crate::quest::QuestManager)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Assign a perk to every registered quest unless its template opts out.
    /// When false, only templates with `auto_perk = true` get one.
    pub auto_perks: bool,
    /// Grant a completed quest's perk to the completing player when the
    /// quest's scope resolves to nobody
    pub perk_target_fallback: bool,
    /// Seed for quest/perk selection; entropy when absent
    pub seed: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            auto_perks: true,
            perk_target_fallback: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    pub id: u64,
    pub team: Option<u32>,
    pub squad: Option<u32>,
}

impl RawPlayer {
    pub fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            id: crate::roster::PlayerId(self.id),
            team: self.team.map(crate::roster::TeamId),
            squad: self.squad.map(crate::roster::SquadId),
        }
    }
}

/// One event in the scenario script
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedEvent {
    /// Offset from the start of the run
    #[serde(default)]
    pub at_ms: u64,
    pub player: u64,
    pub kind: EventKind,
    pub other: Option<u64>,
    pub magnitude: Option<f64>,
}

/// Scenario for the simulation binary
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Directory holding `quests/` and `perks/`, relative to the scenario file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default, rename = "player")]
    pub players: Vec<RawPlayer>,
    #[serde(default, rename = "event")]
    pub events: Vec<ScriptedEvent>,
    /// Time to keep running after the last event so timed perks can expire
    #[serde(default)]
    pub linger_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl SimConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, LoadError> {
        let mut config: SimConfig = toml::from_str(content).map_err(|e| LoadError::parse(path, e))?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        config.events.sort_by_key(|e| e.at_ms);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Self::from_toml(&content, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_defaults() {
        let config: ManagerConfig = toml::from_str("").unwrap();
        assert!(config.auto_perks);
        assert!(config.perk_target_fallback);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_empty_scenario() {
        let config = SimConfig::from_toml("", Path::new("match.toml")).unwrap();
        assert_eq!(config.data_dir, Path::new("."));
        assert!(config.players.is_empty());
        assert!(config.events.is_empty());
        assert_eq!(config.linger_ms, 0);
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let src = "[[event]]\nplayer = 1\nkind = \"on_player_danced\"\n";
        let result = SimConfig::from_toml(src, Path::new("match.toml"));
        assert!(matches!(result, Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_scenario_parsing() {
        let src = r#"
data_dir = "data"
linger_ms = 2000

[manager]
auto_perks = false
seed = 42

[[player]]
id = 1
team = 1
squad = 10

[[player]]
id = 2
team = 2

[[event]]
at_ms = 500
player = 2
kind = "on_player_died"

[[event]]
player = 1
kind = "on_player_earned_kill"
other = 2
"#;
        let config = SimConfig::from_toml(src, Path::new("scenarios/match.toml")).unwrap();
        assert_eq!(config.data_dir, Path::new("scenarios/data"));
        assert_eq!(config.linger_ms, 2000);
        assert!(!config.manager.auto_perks);
        assert!(config.manager.perk_target_fallback);
        assert_eq!(config.manager.seed, Some(42));
        assert_eq!(config.players.len(), 2);
        assert_eq!(config.players[0].to_ref(), PlayerRef::new(1).on_team(1).in_squad(10));
        // Sorted by offset
        assert_eq!(config.events[0].kind, EventKind::OnPlayerEarnedKill);
        assert_eq!(config.events[1].at_ms, 500);
    }
}
