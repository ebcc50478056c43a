//! Quest Event Types
//!
//! Normalized gameplay events that can advance quest progress.

use serde::{Deserialize, Serialize};

use crate::roster::{PlayerRef, SquadId, TeamId};

/// Kinds of events the engine hooks forward to the quest manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OnPlayerEarnedKill,
    OnPlayerEarnedKillAssist,
    OnPlayerDied,
    OnPlayerDeployed,
    OnPlayerDamaged,
    OnRevived,
    OnCapturePointCaptured,
    OnVehicleDestroyed,
    OnPlayerInteract,
    /// Periodic match tick
    OngoingTick,
}

impl EventKind {
    /// Event name as used in data files (for logging/debugging)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OnPlayerEarnedKill => "on_player_earned_kill",
            EventKind::OnPlayerEarnedKillAssist => "on_player_earned_kill_assist",
            EventKind::OnPlayerDied => "on_player_died",
            EventKind::OnPlayerDeployed => "on_player_deployed",
            EventKind::OnPlayerDamaged => "on_player_damaged",
            EventKind::OnRevived => "on_revived",
            EventKind::OnCapturePointCaptured => "on_capture_point_captured",
            EventKind::OnVehicleDestroyed => "on_vehicle_destroyed",
            EventKind::OnPlayerInteract => "on_player_interact",
            EventKind::OngoingTick => "ongoing_tick",
        }
    }
}

/// Normalized event record handed in by the engine hooks.
///
/// The manager fills `event_player` and `event_kind` from the arguments of
/// [`QuestManager::update_player`](crate::quest::QuestManager::update_player)
/// when they are absent.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub event_player: Option<PlayerRef>,
    /// Secondary actor (victim, reviver, ...)
    pub other_player: Option<PlayerRef>,
    pub squad: Option<SquadId>,
    pub team: Option<TeamId>,
    pub event_kind: Option<EventKind>,
    /// Optional amount carried by the event (damage dealt, ...)
    pub magnitude: Option<f64>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for an event performed by `player`, inheriting its team and squad
    pub fn for_player(player: PlayerRef) -> Self {
        Self {
            event_player: Some(player),
            squad: player.squad,
            team: player.team,
            ..Self::default()
        }
    }

    pub fn with_other(mut self, other: PlayerRef) -> Self {
        self.other_player = Some(other);
        self
    }

    pub fn with_squad(mut self, squad: SquadId) -> Self {
        self.squad = Some(squad);
        self
    }

    pub fn with_team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.event_kind = Some(kind);
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names_match_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: EventKind,
        }

        for kind in [
            EventKind::OnPlayerEarnedKill,
            EventKind::OnCapturePointCaptured,
            EventKind::OngoingTick,
        ] {
            let parsed: Wrapper = toml::from_str(&format!("kind = \"{}\"", kind.as_str())).unwrap();
            assert_eq!(parsed.kind, kind);
        }
    }

    #[test]
    fn test_for_player_inherits_membership() {
        let player = PlayerRef::new(7).on_team(2).in_squad(4);
        let ctx = EventContext::for_player(player);
        assert_eq!(ctx.team, Some(TeamId(2)));
        assert_eq!(ctx.squad, Some(SquadId(4)));
        assert!(ctx.event_kind.is_none());
    }
}
