//! Perk Definition Structures
//!
//! A [`PerkTemplate`] describes a reward; its factory produces the one-shot
//! effect bound to a quest instance when that quest is registered.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::QuestError;
use crate::events::EventContext;
use crate::quest::{QuestInstance, Scope};
use crate::roster::PlayerId;
use crate::selection::Weighted;

use super::effects::{Stat, StatBoosts};

/// What a perk effect is applied with on completion
pub struct PerkContext<'a> {
    pub instance: &'a QuestInstance,
    /// Players resolved from the quest's scope
    pub targets: &'a [PlayerId],
    pub event: &'a EventContext,
}

/// One-shot effect bound to a quest instance
pub type PerkEffect = Box<dyn FnOnce(&PerkContext<'_>) -> Result<(), QuestError> + Send + Sync>;

/// Builds the effect for a freshly registered quest instance
pub type PerkFactory = Arc<dyn Fn(&QuestInstance) -> PerkEffect + Send + Sync>;

/// Box a closure as a [`PerkEffect`]
pub fn perk_effect<F>(effect: F) -> PerkEffect
where
    F: FnOnce(&PerkContext<'_>) -> Result<(), QuestError> + Send + Sync + 'static,
{
    Box::new(effect)
}

pub struct PerkTemplate {
    pub name: String,
    pub description: String,
    pub scopes: Vec<Scope>,
    pub weight: Option<f64>,
    pub factory: PerkFactory,
}

impl PerkTemplate {
    pub fn new<F>(name: &str, description: &str, factory: F) -> Self
    where
        F: Fn(&QuestInstance) -> PerkEffect + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            scopes: Vec::new(),
            weight: None,
            factory: Arc::new(factory),
        }
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn accepts(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Create the perk instance bound to `quest`
    pub fn instantiate(self: &Arc<Self>, quest: &QuestInstance) -> PerkInstance {
        PerkInstance {
            definition: Arc::clone(self),
            effect: Some((self.factory)(quest)),
        }
    }

    /// Resolve a TOML definition into a perk acting through `boosts`
    pub fn from_raw(raw: &RawPerkDefinition, boosts: &StatBoosts) -> Result<Self, QuestError> {
        if raw.scopes.is_empty() {
            return Err(QuestError::invalid(&raw.name, "no scopes"));
        }
        if raw.weight.is_some_and(|w| !(w >= 0.0)) {
            return Err(QuestError::invalid(&raw.name, "negative weight"));
        }

        let boosts = boosts.clone();
        let factory: PerkFactory = match raw.effect {
            RawPerkEffect::StatMultiplier {
                stat,
                multiplier,
                duration_secs,
            } => {
                if !(multiplier > 0.0) {
                    return Err(QuestError::invalid(&raw.name, "multiplier must be positive"));
                }
                Arc::new(move |_: &QuestInstance| {
                    let boosts = boosts.clone();
                    perk_effect(move |ctx: &PerkContext<'_>| {
                        boosts.apply(ctx.targets, stat, multiplier, duration_secs)
                    })
                })
            }
            RawPerkEffect::Heal { amount } => Arc::new(move |_: &QuestInstance| {
                let effects = Arc::clone(boosts.effects());
                perk_effect(move |ctx: &PerkContext<'_>| {
                    for &player in ctx.targets {
                        effects.heal(player, amount);
                    }
                    Ok(())
                })
            }),
            RawPerkEffect::Resupply => Arc::new(move |_: &QuestInstance| {
                let effects = Arc::clone(boosts.effects());
                perk_effect(move |ctx: &PerkContext<'_>| {
                    for &player in ctx.targets {
                        effects.resupply(player);
                    }
                    Ok(())
                })
            }),
        };

        Ok(Self {
            name: raw.name.clone(),
            description: raw.description.clone(),
            scopes: raw.scopes.clone(),
            weight: raw.weight,
            factory,
        })
    }
}

impl Weighted for PerkTemplate {
    fn weight(&self) -> Option<f64> {
        self.weight
    }
}

impl fmt::Debug for PerkTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerkTemplate")
            .field("name", &self.name)
            .field("scopes", &self.scopes)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// A perk bound to one quest instance
pub struct PerkInstance {
    definition: Arc<PerkTemplate>,
    effect: Option<PerkEffect>,
}

impl PerkInstance {
    pub fn definition(&self) -> &Arc<PerkTemplate> {
        &self.definition
    }

    /// Whether the effect has already run
    pub fn is_spent(&self) -> bool {
        self.effect.is_none()
    }

    /// Run the effect. Later calls are no-ops.
    pub fn apply(&mut self, ctx: &PerkContext<'_>) -> Result<(), QuestError> {
        match self.effect.take() {
            Some(effect) => effect(ctx),
            None => Ok(()),
        }
    }
}

/// A perk file: any number of `[[perk]]` tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPerkFile {
    #[serde(default)]
    pub perk: Vec<RawPerkDefinition>,
}

/// Perk data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawPerkDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scopes: Vec<Scope>,
    pub weight: Option<f64>,
    pub effect: RawPerkEffect,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPerkEffect {
    /// Multiply a stat for `duration_secs` (never reverted when <= 0)
    StatMultiplier {
        stat: Stat,
        multiplier: f64,
        #[serde(default)]
        duration_secs: f64,
    },
    Heal {
        amount: f64,
    },
    Resupply,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perk::effects::PlayerEffects;
    use crate::quest::{ProgressUpdate, QuestContext, QuestId, QuestTemplate};
    use crate::roster::PlayerRef;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl PlayerEffects for Recorder {
        fn set_stat_multiplier(&self, player: PlayerId, stat: Stat, multiplier: f64) {
            self.calls.lock().unwrap().push(format!("{player} {stat:?} x{multiplier}"));
        }

        fn heal(&self, player: PlayerId, amount: f64) {
            self.calls.lock().unwrap().push(format!("{player} heal {amount}"));
        }

        fn resupply(&self, player: PlayerId) {
            self.calls.lock().unwrap().push(format!("{player} resupply"));
        }
    }

    fn quest() -> QuestInstance {
        let template = Arc::new(QuestTemplate::new("Q", "", 1.0, |ctx: &QuestContext<'_>| {
            Ok(ProgressUpdate::advance(ctx.progress, 1.0))
        }));
        QuestInstance::new(
            QuestId(1),
            template,
            Scope::Player,
            &EventContext::for_player(PlayerRef::new(1)),
        )
    }

    #[test]
    fn test_effect_runs_once() {
        let recorder = Arc::new(Recorder::default());
        let boosts = StatBoosts::new(recorder.clone());
        let file: RawPerkFile = toml::from_str(
            r#"
[[perk]]
name = "Field Medic"
scopes = ["player", "squad"]
effect = { kind = "heal", amount = 50 }
"#,
        )
        .unwrap();
        let perk = Arc::new(PerkTemplate::from_raw(&file.perk[0], &boosts).unwrap());
        assert!(perk.accepts(Scope::Squad));
        assert!(!perk.accepts(Scope::Game));

        let quest = quest();
        let mut instance = perk.instantiate(&quest);
        let targets = [PlayerId(1), PlayerId(2)];
        let event = EventContext::new();
        let ctx = PerkContext {
            instance: &quest,
            targets: &targets,
            event: &event,
        };

        instance.apply(&ctx).unwrap();
        assert!(instance.is_spent());
        instance.apply(&ctx).unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(*calls, vec!["player#1 heal 50", "player#2 heal 50"]);
    }

    #[test]
    fn test_permanent_multiplier_needs_no_runtime() {
        let recorder = Arc::new(Recorder::default());
        let boosts = StatBoosts::new(recorder.clone());
        let file: RawPerkFile = toml::from_str(
            r#"
[[perk]]
name = "Veteran"
scopes = ["team"]
[perk.effect]
kind = "stat_multiplier"
stat = "damage"
multiplier = 1.1
"#,
        )
        .unwrap();
        let perk = Arc::new(PerkTemplate::from_raw(&file.perk[0], &boosts).unwrap());
        let quest = quest();
        let targets = [PlayerId(3)];
        let event = EventContext::new();
        let ctx = PerkContext {
            instance: &quest,
            targets: &targets,
            event: &event,
        };
        perk.instantiate(&quest).apply(&ctx).unwrap();
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["player#3 Damage x1.1"]);
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let boosts = StatBoosts::new(Arc::new(Recorder::default()));
        let file: RawPerkFile = toml::from_str(
            r#"
[[perk]]
name = "Cursed"
scopes = ["player"]
effect = { kind = "stat_multiplier", stat = "move_speed", multiplier = 0.0 }
"#,
        )
        .unwrap();
        assert!(PerkTemplate::from_raw(&file.perk[0], &boosts).is_err());
    }
}
