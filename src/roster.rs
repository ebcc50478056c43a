//! Player identities and the roster capability
//!
//! The roster is supplied by the engine side. It lists the players currently
//! tracked in the match and answers team/squad membership questions used to
//! resolve perk targets.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SquadId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "squad#{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team#{}", self.0)
    }
}

/// A player as seen by a single event.
///
/// The engine may hand out a different `PlayerRef` for the same player on
/// every event; only `id` identifies the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub team: Option<TeamId>,
    pub squad: Option<SquadId>,
}

impl PlayerRef {
    pub fn new(id: u64) -> Self {
        Self {
            id: PlayerId(id),
            team: None,
            squad: None,
        }
    }

    pub fn on_team(mut self, team: u32) -> Self {
        self.team = Some(TeamId(team));
        self
    }

    pub fn in_squad(mut self, squad: u32) -> Self {
        self.squad = Some(SquadId(squad));
        self
    }
}

/// Optional squad-membership capability
pub trait SquadLookup: Send + Sync {
    fn squad_of(&self, player: PlayerId) -> Option<SquadId>;
}

/// Read-only view of the players tracked in the match
pub trait Roster: Send + Sync {
    /// Every currently tracked active player
    fn players(&self) -> Vec<PlayerRef>;

    /// Current team of a player
    fn team_of(&self, player: PlayerId) -> Option<TeamId>;

    /// Squad lookup, if the engine exposes one
    fn squads(&self) -> Option<&dyn SquadLookup> {
        None
    }

    fn contains(&self, player: PlayerId) -> bool {
        self.players().iter().any(|p| p.id == player)
    }
}

/// In-memory roster used by the simulation driver and tests
#[derive(Debug, Default)]
pub struct MatchRoster {
    players: HashMap<PlayerId, PlayerRef>,
    /// Whether squad lookups are exposed through [`Roster::squads`]
    squad_lookup: bool,
}

impl MatchRoster {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            squad_lookup: true,
        }
    }

    /// A roster whose engine offers no squad lookup
    pub fn without_squads() -> Self {
        Self {
            players: HashMap::new(),
            squad_lookup: false,
        }
    }

    pub fn join(&mut self, player: PlayerRef) {
        self.players.insert(player.id, player);
    }

    pub fn leave(&mut self, player: PlayerId) -> Option<PlayerRef> {
        self.players.remove(&player)
    }

    pub fn move_to_team(&mut self, player: PlayerId, team: TeamId) {
        if let Some(p) = self.players.get_mut(&player) {
            p.team = Some(team);
        }
    }

    pub fn get(&self, player: PlayerId) -> Option<PlayerRef> {
        self.players.get(&player).copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl SquadLookup for MatchRoster {
    fn squad_of(&self, player: PlayerId) -> Option<SquadId> {
        self.players.get(&player).and_then(|p| p.squad)
    }
}

impl Roster for MatchRoster {
    fn players(&self) -> Vec<PlayerRef> {
        let mut players: Vec<PlayerRef> = self.players.values().copied().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    fn team_of(&self, player: PlayerId) -> Option<TeamId> {
        self.players.get(&player).and_then(|p| p.team)
    }

    fn squads(&self) -> Option<&dyn SquadLookup> {
        if self.squad_lookup {
            Some(self)
        } else {
            None
        }
    }

    fn contains(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_membership() {
        let mut roster = MatchRoster::new();
        roster.join(PlayerRef::new(1).on_team(1).in_squad(10));
        roster.join(PlayerRef::new(2).on_team(2));

        assert_eq!(roster.team_of(PlayerId(1)), Some(TeamId(1)));
        assert_eq!(roster.squads().and_then(|s| s.squad_of(PlayerId(1))), Some(SquadId(10)));

        roster.move_to_team(PlayerId(1), TeamId(2));
        assert_eq!(roster.team_of(PlayerId(1)), Some(TeamId(2)));

        roster.leave(PlayerId(2));
        assert!(!roster.contains(PlayerId(2)));
        assert_eq!(roster.players().len(), 1);
    }

    #[test]
    fn test_roster_without_squad_lookup() {
        let mut roster = MatchRoster::without_squads();
        roster.join(PlayerRef::new(1).in_squad(3));
        assert!(roster.squads().is_none());
    }
}
