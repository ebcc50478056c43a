//! Quest Manager
//!
//! Owns every live quest instance, routes gameplay events to the instances
//! they concern, and drives the update -> completion pipeline.
//!
//! Player, squad and team quests live in one list and are found by linear
//! scan; the single match-wide quest has its own slot. Completed and failed
//! instances move to an archive that the event path never reads.
//!
//! All methods run to completion on the caller's thread. The only deferred
//! work is the revert of timed perk effects, which is guarded by tokens in
//! [`StatBoosts`](crate::perk::StatBoosts) and never touches manager state.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::events::{EventContext, EventKind};
use crate::perk::{PerkContext, PerkInstance, PerkTemplate};
use crate::roster::{PlayerId, PlayerRef, Roster, SquadId, TeamId};
use crate::selection::{pick_eligible, weighted_pick};

use super::definition::{QuestTemplate, Scope};
use super::instance::{QuestContext, QuestId, QuestInstance, QuestSnapshot, ScopeHolder};
use super::observer::{FaultStage, QuestFault, QuestObserver};
use super::progress::{ProgressUpdate, QuestState};
use super::registry::QuestRegistry;

pub struct QuestManager {
    registry: QuestRegistry,
    config: ManagerConfig,
    roster: Arc<dyn Roster>,
    observer: Arc<dyn QuestObserver>,
    /// Player, squad and team quests
    active: Vec<QuestInstance>,
    /// The match-wide quest
    global: Option<QuestInstance>,
    /// Finished instances, kept for the lifetime of the manager
    history: Vec<QuestInstance>,
    next_id: u64,
    rng: StdRng,
}

impl QuestManager {
    pub fn new(
        registry: QuestRegistry,
        config: ManagerConfig,
        roster: Arc<dyn Roster>,
        observer: Arc<dyn QuestObserver>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            registry,
            config,
            roster,
            observer,
            active: Vec::new(),
            global: None,
            history: Vec::new(),
            next_id: 0,
            rng,
        }
    }

    pub fn registry(&self) -> &QuestRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut QuestRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn next_quest_id(&mut self) -> QuestId {
        self.next_id += 1;
        QuestId(self.next_id)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Start `template` for the holder `ctx` names at `scope`.
    ///
    /// A match-wide quest replaces the previous one. Failures in `on_start`
    /// are reported; the quest stays registered.
    pub fn register_quest(
        &mut self,
        template: Arc<QuestTemplate>,
        scope: Scope,
        ctx: &EventContext,
    ) -> &QuestInstance {
        let id = self.next_quest_id();
        let mut instance = QuestInstance::new(id, template, scope, ctx);

        if instance.template.auto_perk.unwrap_or(self.config.auto_perks) {
            instance.perk = self.select_perk(&instance);
        }

        if let Some(on_start) = instance.template.on_start.clone() {
            let qctx = QuestContext::new(&instance, ctx);
            if let Err(e) = on_start(&qctx) {
                self.observer.report(&QuestFault::new(&instance, FaultStage::Start, e));
            }
        }

        debug!(
            "Registered quest {} ({}) at {} scope with perk {:?}",
            id,
            instance.name(),
            scope.as_str(),
            instance.perk.as_ref().map(|p| p.definition().name.as_str())
        );
        self.observer.quest_started(&instance, ctx);

        match scope {
            Scope::Game => {
                if let Some(previous) = self.global.take() {
                    info!("Quest {} replaces match quest {}", id, previous.id);
                }
                &*self.global.insert(instance)
            }
            _ => {
                let index = self.active.len();
                self.active.push(instance);
                &self.active[index]
            }
        }
    }

    /// Weighted-pick a registered template eligible for `scope` and start it
    pub fn assign_quest(&mut self, scope: Scope, ctx: &EventContext) -> Option<&QuestInstance> {
        let candidates = self.registry.quests_for(scope);
        let template = match weighted_pick(&candidates, &mut self.rng) {
            Some(template) => Arc::clone(template),
            None => {
                debug!("No quest template available for {} scope", scope.as_str());
                return None;
            }
        };
        Some(self.register_quest(template, scope, ctx))
    }

    /// Remove an active instance without archiving it. Unknown ids are ignored.
    pub fn unregister_quest(&mut self, id: QuestId) -> Option<QuestInstance> {
        let removed = self.take(id);
        if removed.is_some() {
            debug!("Unregistered quest {}", id);
        }
        removed
    }

    /// Drop every player-scoped quest held by `player` (player left the match)
    pub fn remove_player_quests(&mut self, player: PlayerId) -> usize {
        let before = self.active.len();
        self.active.retain(|q| !q.is_for_player(player));
        before - self.active.len()
    }

    fn take(&mut self, id: QuestId) -> Option<QuestInstance> {
        if self.global.as_ref().is_some_and(|g| g.id == id) {
            return self.global.take();
        }
        let index = self.active.iter().position(|q| q.id == id)?;
        Some(self.active.remove(index))
    }

    fn select_perk(&mut self, instance: &QuestInstance) -> Option<PerkInstance> {
        let scope = instance.scope;
        let perk: Arc<PerkTemplate> = match &instance.template.perks {
            Some(pool) => Arc::clone(pick_eligible(pool, &mut self.rng, |p| p.accepts(scope))?),
            None => {
                let pool = self.registry.perks_for(scope);
                Arc::clone(weighted_pick(&pool, &mut self.rng)?)
            }
        };
        Some(perk.instantiate(instance))
    }

    // ========================================================================
    // Event routing
    // ========================================================================

    /// Route one event performed by `player` to every quest it concerns.
    ///
    /// Concerned quests are the player's own, their squad's, their team's and
    /// the match quest, restricted to templates listening to `kind`.
    pub fn update_player(&mut self, player: PlayerRef, kind: EventKind, ctx: &EventContext) {
        let mut event = ctx.clone();
        if event.event_player.is_none() {
            event.event_player = Some(player);
        }
        event.event_kind = Some(kind);
        if event.squad.is_none() {
            event.squad = player
                .squad
                .or_else(|| self.roster.squads().and_then(|s| s.squad_of(player.id)));
        }
        if event.team.is_none() {
            event.team = player.team.or_else(|| self.roster.team_of(player.id));
        }

        let mut targets: Vec<QuestId> = Vec::new();
        targets.extend(self.active.iter().filter(|q| q.is_for_player(player.id)).map(|q| q.id));
        if let Some(squad) = event.squad {
            targets.extend(self.active.iter().filter(|q| q.is_for_squad(squad)).map(|q| q.id));
        }
        if let Some(team) = event.team {
            targets.extend(self.active.iter().filter(|q| q.is_for_team(team)).map(|q| q.id));
        }
        if let Some(global) = &self.global {
            targets.push(global.id);
        }

        for id in targets {
            let listens = self
                .find(id)
                .is_some_and(|q| q.template.listens_to(kind));
            if listens {
                self.run_update(id, &event);
            }
        }
    }

    /// Update pipeline for one instance and one event
    fn run_update(&mut self, id: QuestId, event: &EventContext) {
        let observer = Arc::clone(&self.observer);
        let Some(instance) = self.find_mut(id) else {
            return;
        };

        let original = instance.progress;
        if instance.progress.state == QuestState::NotStarted {
            instance.progress.state = QuestState::InProgress;
        }
        let before = instance.progress;

        let update = Arc::clone(&instance.template.update);
        let result = {
            let qctx = QuestContext::new(instance, event);
            update(&qctx)
        };

        let result: ProgressUpdate = match result {
            Ok(result) => result,
            Err(e) => {
                instance.progress = original;
                observer.report(&QuestFault::new(instance, FaultStage::Update, e));
                return;
            }
        };

        instance.progress.apply(&result);
        let after = instance.progress;
        if after.differs_from(&before) && after.percent() != before.percent() {
            observer.quest_progressed(instance, before.percent(), after.percent(), event);
        }

        if result.completes() || after.state == QuestState::Completed {
            instance.progress.state = QuestState::Completed;
            self.complete(id, event);
        } else if result.fails() {
            instance.progress.state = QuestState::Failed;
            self.fail(id, event);
        }
    }

    /// Completion handling; runs once because the instance leaves the active set
    fn complete(&mut self, id: QuestId, event: &EventContext) {
        let Some(mut instance) = self.take(id) else {
            return;
        };
        instance.finished_at = Some(Utc::now());
        self.observer.quest_completed(&instance, event);

        if let Some(mut perk) = instance.perk.take() {
            let mut targets = self.resolve_targets(&instance);
            if targets.is_empty() && self.config.perk_target_fallback {
                targets.extend(event.event_player.map(|p| p.id));
            }

            if targets.is_empty() {
                warn!("Quest {} completed with no perk targets", instance.id);
            }
            let pctx = PerkContext {
                instance: &instance,
                targets: &targets,
                event,
            };
            if let Err(e) = perk.apply(&pctx) {
                self.observer.report(&QuestFault::new(&instance, FaultStage::PerkApply, e));
            } else {
                info!(
                    "Granted perk {} to {} player(s) for quest {}",
                    perk.definition().name,
                    targets.len(),
                    instance.id
                );
            }
            instance.perk = Some(perk);
        }

        self.history.push(instance);

        if let Some(archived) = self.history.last() {
            if let Some(on_complete) = archived.template.on_complete.clone() {
                let qctx = QuestContext::new(archived, event);
                if let Err(e) = on_complete(&qctx) {
                    self.observer.report(&QuestFault::new(archived, FaultStage::Complete, e));
                }
            }
        }
    }

    fn fail(&mut self, id: QuestId, event: &EventContext) {
        let Some(mut instance) = self.take(id) else {
            return;
        };
        instance.finished_at = Some(Utc::now());
        self.observer.quest_failed(&instance, event);
        self.history.push(instance);
    }

    /// Players a completed quest's perk is granted to
    pub fn resolve_targets(&self, instance: &QuestInstance) -> Vec<PlayerId> {
        match (instance.scope, instance.holder) {
            (Scope::Game, _) => self.roster.players().iter().map(|p| p.id).collect(),
            (Scope::Player, Some(ScopeHolder::Player(player))) => {
                if self.roster.contains(player) {
                    vec![player]
                } else {
                    Vec::new()
                }
            }
            (Scope::Team, Some(ScopeHolder::Team(team))) => self
                .roster
                .players()
                .iter()
                .filter(|p| self.roster.team_of(p.id) == Some(team))
                .map(|p| p.id)
                .collect(),
            (Scope::Squad, Some(ScopeHolder::Squad(squad))) => match self.roster.squads() {
                Some(lookup) => self
                    .roster
                    .players()
                    .iter()
                    .filter(|p| lookup.squad_of(p.id) == Some(squad))
                    .map(|p| p.id)
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn find(&self, id: QuestId) -> Option<&QuestInstance> {
        match &self.global {
            Some(global) if global.id == id => Some(global),
            _ => self.active.iter().find(|q| q.id == id),
        }
    }

    fn find_mut(&mut self, id: QuestId) -> Option<&mut QuestInstance> {
        match &mut self.global {
            Some(global) if global.id == id => Some(global),
            _ => self.active.iter_mut().find(|q| q.id == id),
        }
    }

    pub fn quest(&self, id: QuestId) -> Option<&QuestInstance> {
        self.find(id)
    }

    pub fn player_quest(&self, player: PlayerId) -> Option<&QuestInstance> {
        self.active.iter().find(|q| q.is_for_player(player))
    }

    pub fn squad_quest(&self, squad: SquadId) -> Option<&QuestInstance> {
        self.active.iter().find(|q| q.is_for_squad(squad))
    }

    pub fn team_quest(&self, team: TeamId) -> Option<&QuestInstance> {
        self.active.iter().find(|q| q.is_for_team(team))
    }

    pub fn global_quest(&self) -> Option<&QuestInstance> {
        self.global.as_ref()
    }

    pub fn has_player_quest(&self, player: PlayerId) -> bool {
        self.player_quest(player).is_some()
    }

    /// The quest most relevant to `player`: their own, then squad, team, match
    pub fn relevant_quest(&self, player: PlayerRef) -> Option<&QuestInstance> {
        let squad = player
            .squad
            .or_else(|| self.roster.squads().and_then(|s| s.squad_of(player.id)));
        let team = player.team.or_else(|| self.roster.team_of(player.id));

        self.player_quest(player.id)
            .or_else(|| squad.and_then(|s| self.squad_quest(s)))
            .or_else(|| team.and_then(|t| self.team_quest(t)))
            .or_else(|| self.global_quest())
    }

    /// Every active instance, match quest last
    pub fn active(&self) -> impl Iterator<Item = &QuestInstance> {
        self.active.iter().chain(self.global.iter())
    }

    pub fn active_count(&self) -> usize {
        self.active.len() + usize::from(self.global.is_some())
    }

    pub fn history(&self) -> &[QuestInstance] {
        &self.history
    }

    pub fn snapshot(&self, id: QuestId) -> Option<QuestSnapshot> {
        self.find(id).map(QuestInstance::snapshot)
    }

    pub fn snapshots(&self) -> Vec<QuestSnapshot> {
        self.active().map(QuestInstance::snapshot).collect()
    }
}
