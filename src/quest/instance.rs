//! Quest Instances
//!
//! A live binding of a template to one scope-holder, with its own progress
//! and optionally a perk chosen when the quest was registered.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::EventContext;
use crate::perk::PerkInstance;
use crate::roster::{PlayerId, SquadId, TeamId};

use super::definition::{QuestTemplate, Scope};
use super::progress::{Progress, QuestState};

/// Instance identity; assigned in increasing order, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QuestId(pub u64);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quest#{}", self.0)
    }
}

/// The entity a non-match quest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeHolder {
    Player(PlayerId),
    Squad(SquadId),
    Team(TeamId),
}

impl fmt::Display for ScopeHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeHolder::Player(id) => id.fmt(f),
            ScopeHolder::Squad(id) => id.fmt(f),
            ScopeHolder::Team(id) => id.fmt(f),
        }
    }
}

pub struct QuestInstance {
    pub(crate) id: QuestId,
    pub(crate) template: Arc<QuestTemplate>,
    pub(crate) scope: Scope,
    /// `None` for match-wide quests, or when the registering context lacked
    /// the entity this scope needs
    pub(crate) holder: Option<ScopeHolder>,
    pub(crate) progress: Progress,
    pub(crate) perk: Option<PerkInstance>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    /// Bind `template` to the holder `ctx` names for `scope`
    pub fn new(
        id: QuestId,
        template: Arc<QuestTemplate>,
        scope: Scope,
        ctx: &EventContext,
    ) -> Self {
        let player = ctx.event_player;
        let holder = match scope {
            Scope::Player => player.map(|p| ScopeHolder::Player(p.id)),
            Scope::Squad => ctx
                .squad
                .or_else(|| player.and_then(|p| p.squad))
                .map(ScopeHolder::Squad),
            Scope::Team => ctx
                .team
                .or_else(|| player.and_then(|p| p.team))
                .map(ScopeHolder::Team),
            Scope::Game => None,
        };

        let progress = Progress::new(template.default_target);

        Self {
            id,
            template,
            scope,
            holder,
            progress,
            perk: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> QuestId {
        self.id
    }

    pub fn template(&self) -> &Arc<QuestTemplate> {
        &self.template
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn holder(&self) -> Option<ScopeHolder> {
        self.holder
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn perk(&self) -> Option<&PerkInstance> {
        self.perk.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_for_player(&self, player: PlayerId) -> bool {
        self.scope == Scope::Player && self.holder == Some(ScopeHolder::Player(player))
    }

    pub fn is_for_squad(&self, squad: SquadId) -> bool {
        self.scope == Scope::Squad && self.holder == Some(ScopeHolder::Squad(squad))
    }

    pub fn is_for_team(&self, team: TeamId) -> bool {
        self.scope == Scope::Team && self.holder == Some(ScopeHolder::Team(team))
    }

    pub fn snapshot(&self) -> QuestSnapshot {
        QuestSnapshot {
            id: self.id,
            quest: self.template.name.clone(),
            description: self.template.description.clone(),
            scope: self.scope,
            holder: self.holder,
            current: self.progress.current,
            target: self.progress.target,
            percent: self.progress.percent(),
            state: self.progress.state,
            perk: self.perk.as_ref().map(|p| p.definition().name.clone()),
        }
    }
}

impl fmt::Debug for QuestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestInstance")
            .field("id", &self.id)
            .field("quest", &self.template.name)
            .field("scope", &self.scope)
            .field("holder", &self.holder)
            .field("progress", &self.progress)
            .field("perk", &self.perk.as_ref().map(|p| &p.definition().name))
            .finish()
    }
}

/// Read-only view handed to UI collaborators
#[derive(Debug, Clone, Serialize)]
pub struct QuestSnapshot {
    pub id: QuestId,
    pub quest: String,
    pub description: String,
    pub scope: Scope,
    pub holder: Option<ScopeHolder>,
    pub current: f64,
    pub target: f64,
    pub percent: u8,
    pub state: QuestState,
    pub perk: Option<String>,
}

/// What a template callback sees for one instance and one event
pub struct QuestContext<'a> {
    pub instance: &'a QuestInstance,
    pub progress: &'a Progress,
    pub event: &'a EventContext,
}

impl<'a> QuestContext<'a> {
    pub fn new(instance: &'a QuestInstance, event: &'a EventContext) -> Self {
        Self {
            instance,
            progress: &instance.progress,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::progress::ProgressUpdate;
    use crate::roster::PlayerRef;

    fn template() -> Arc<QuestTemplate> {
        Arc::new(QuestTemplate::new("Test", "A test quest", 4.0, |ctx: &QuestContext<'_>| {
            Ok(ProgressUpdate::advance(ctx.progress, 1.0))
        }))
    }

    #[test]
    fn test_holder_binding_per_scope() {
        let ctx = EventContext::for_player(PlayerRef::new(9).on_team(1).in_squad(5));

        let player = QuestInstance::new(QuestId(1), template(), Scope::Player, &ctx);
        assert!(player.is_for_player(PlayerId(9)));

        let squad = QuestInstance::new(QuestId(2), template(), Scope::Squad, &ctx);
        assert!(squad.is_for_squad(SquadId(5)));

        let team = QuestInstance::new(QuestId(3), template(), Scope::Team, &ctx);
        assert!(team.is_for_team(TeamId(1)));

        let game = QuestInstance::new(QuestId(4), template(), Scope::Game, &ctx);
        assert_eq!(game.holder(), None);
    }

    #[test]
    fn test_missing_holder_is_unbound() {
        let ctx = EventContext::for_player(PlayerRef::new(9));
        let squad = QuestInstance::new(QuestId(1), template(), Scope::Squad, &ctx);
        assert_eq!(squad.holder(), None);
    }

    #[test]
    fn test_fresh_progress_from_default_target() {
        let ctx = EventContext::new();
        let instance = QuestInstance::new(QuestId(1), template(), Scope::Game, &ctx);
        assert_eq!(instance.progress().target, 4.0);
        assert_eq!(instance.progress().current, 0.0);
        assert_eq!(instance.progress().state, QuestState::NotStarted);

        let snapshot = instance.snapshot();
        assert_eq!(snapshot.quest, "Test");
        assert_eq!(snapshot.percent, 0);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"state\":\"not_started\""));
    }
}
