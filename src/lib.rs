//! Match Quests
//!
//! Quest and perk progression for team-based matches. Quests are scoped to a
//! player, a squad, a team or the whole match; gameplay events advance them,
//! and completing one grants a perk to the players in its scope.

pub mod config;
pub mod error;
pub mod events;
pub mod perk;
pub mod quest;
pub mod roster;
pub mod selection;

pub use config::{ManagerConfig, SimConfig};
pub use error::{LoadError, QuestError};
pub use events::{EventContext, EventKind};
pub use perk::{PerkTemplate, PlayerEffects, Stat, StatBoosts};
pub use quest::{QuestManager, QuestObserver, QuestRegistry, QuestTemplate, Scope};
pub use roster::{MatchRoster, PlayerId, PlayerRef, Roster, SquadId, TeamId};
