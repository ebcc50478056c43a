//! Quest Definition Structures
//!
//! A [`QuestTemplate`] is a flat record whose behavior lives in callable
//! fields. Templates are built in code or resolved from TOML definitions and
//! are shared behind `Arc` by every instance created from them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::QuestError;
use crate::events::EventKind;
use crate::perk::PerkTemplate;
use crate::selection::Weighted;

use super::instance::QuestContext;
use super::progress::ProgressUpdate;

/// Granularity at which a quest is tracked and won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Player,
    Squad,
    Team,
    /// The whole match
    Game,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Player => "player",
            Scope::Squad => "squad",
            Scope::Team => "team",
            Scope::Game => "game",
        }
    }
}

/// Computes the next progress of an instance for one event
pub type UpdateFn =
    Arc<dyn Fn(&QuestContext<'_>) -> Result<ProgressUpdate, QuestError> + Send + Sync>;

/// Lifecycle callback (start / complete)
pub type HookFn = Arc<dyn Fn(&QuestContext<'_>) -> Result<(), QuestError> + Send + Sync>;

/// Immutable quest blueprint
#[derive(Clone)]
pub struct QuestTemplate {
    pub name: String,
    pub description: String,
    /// Scopes this quest can be assigned to
    pub scopes: Vec<Scope>,
    /// Event kinds that run `update`
    pub events: Vec<EventKind>,
    pub default_target: f64,
    /// Selection weight, 1 when absent
    pub weight: Option<f64>,
    /// Dedicated perk pool; the registry's perks are used when absent
    pub perks: Option<Vec<Arc<PerkTemplate>>>,
    /// `Some(false)` skips automatic perk assignment, `Some(true)` forces it,
    /// `None` follows the manager policy
    pub auto_perk: Option<bool>,
    pub update: UpdateFn,
    pub on_start: Option<HookFn>,
    pub on_complete: Option<HookFn>,
}

impl QuestTemplate {
    pub fn new<F>(name: &str, description: &str, default_target: f64, update: F) -> Self
    where
        F: Fn(&QuestContext<'_>) -> Result<ProgressUpdate, QuestError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            scopes: Vec::new(),
            events: Vec::new(),
            default_target,
            weight: None,
            perks: None,
            auto_perk: None,
            update: Arc::new(update),
            on_start: None,
            on_complete: None,
        }
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = EventKind>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_perks(mut self, perks: Vec<Arc<PerkTemplate>>) -> Self {
        self.perks = Some(perks);
        self
    }

    pub fn without_auto_perk(mut self) -> Self {
        self.auto_perk = Some(false);
        self
    }

    pub fn with_auto_perk(mut self) -> Self {
        self.auto_perk = Some(true);
        self
    }

    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QuestContext<'_>) -> Result<(), QuestError> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QuestContext<'_>) -> Result<(), QuestError> + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Whether this quest can be assigned at `scope`
    pub fn accepts(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Whether `kind` drives this quest's update function
    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.events.contains(&kind)
    }

    /// Resolve a TOML definition. `perk_lookup` maps perk names to registered perks.
    pub fn from_raw<F>(raw: &RawQuestDefinition, perk_lookup: F) -> Result<Self, QuestError>
    where
        F: Fn(&str) -> Option<Arc<PerkTemplate>>,
    {
        if raw.scopes.is_empty() {
            return Err(QuestError::invalid(&raw.name, "no scopes"));
        }
        if raw.events.is_empty() {
            return Err(QuestError::invalid(&raw.name, "no events"));
        }
        if !(raw.target >= 1.0) {
            return Err(QuestError::invalid(&raw.name, format!("target {} below 1", raw.target)));
        }
        if raw.weight.is_some_and(|w| !(w >= 0.0)) {
            return Err(QuestError::invalid(&raw.name, "negative weight"));
        }
        if raw.rule == QuestRule::Streak && raw.reset_on.is_empty() {
            return Err(QuestError::invalid(&raw.name, "streak rule needs reset_on events"));
        }

        let perks = match &raw.perks {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| {
                        perk_lookup(name).ok_or_else(|| QuestError::UnknownPerk(name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        let mut events = raw.events.clone();
        for kind in &raw.reset_on {
            if !events.contains(kind) {
                events.push(*kind);
            }
        }

        let update: UpdateFn = match raw.rule {
            QuestRule::Count => Arc::new(count_rule),
            QuestRule::Accumulate => Arc::new(accumulate_rule),
            QuestRule::Streak => {
                let reset_on = raw.reset_on.clone();
                Arc::new(move |ctx: &QuestContext<'_>| match ctx.event.event_kind {
                    Some(kind) if reset_on.contains(&kind) => {
                        Ok(ProgressUpdate::reset(ctx.progress))
                    }
                    _ => count_rule(ctx),
                })
            }
        };

        Ok(Self {
            name: raw.name.clone(),
            description: raw.description.clone(),
            scopes: raw.scopes.clone(),
            events,
            default_target: raw.target,
            weight: raw.weight,
            perks,
            auto_perk: raw.auto_perk,
            update,
            on_start: None,
            on_complete: None,
        })
    }
}

fn count_rule(ctx: &QuestContext<'_>) -> Result<ProgressUpdate, QuestError> {
    Ok(ProgressUpdate::advance(ctx.progress, 1.0))
}

fn accumulate_rule(ctx: &QuestContext<'_>) -> Result<ProgressUpdate, QuestError> {
    let amount = ctx.event.magnitude.unwrap_or(1.0);
    if !amount.is_finite() {
        return Err(QuestError::callback(format!("non-finite magnitude {}", amount)));
    }
    Ok(ProgressUpdate::advance(ctx.progress, amount))
}

impl Weighted for QuestTemplate {
    fn weight(&self) -> Option<f64> {
        self.weight
    }
}

impl fmt::Debug for QuestTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestTemplate")
            .field("name", &self.name)
            .field("scopes", &self.scopes)
            .field("events", &self.events)
            .field("default_target", &self.default_target)
            .field("weight", &self.weight)
            .field("perks", &self.perks.as_ref().map(|p| p.len()))
            .field("auto_perk", &self.auto_perk)
            .finish_non_exhaustive()
    }
}

/// Built-in progress rules available to data-driven quests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestRule {
    /// +1 per matching event
    #[default]
    Count,
    /// + event magnitude per matching event
    Accumulate,
    /// +1 per matching event, back to 0 on any `reset_on` event
    Streak,
}

/// A quest file: any number of `[[quest]]` tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestFile {
    #[serde(default)]
    pub quest: Vec<RawQuestDefinition>,
}

/// Quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scopes: Vec<Scope>,
    pub events: Vec<EventKind>,
    #[serde(default = "default_target")]
    pub target: f64,
    pub weight: Option<f64>,
    #[serde(default)]
    pub rule: QuestRule,
    #[serde(default)]
    pub reset_on: Vec<EventKind>,
    /// Names of perks forming a dedicated pool
    pub perks: Option<Vec<String>>,
    pub auto_perk: Option<bool>,
}

fn default_target() -> f64 {
    1.0
}
