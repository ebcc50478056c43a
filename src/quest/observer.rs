//! Quest notifications
//!
//! The manager reports lifecycle changes and caught failures to a
//! [`QuestObserver`]. Every method returns `()`: the UI side has no way to
//! push an error back into the quest pipeline.

use std::fmt;

use tracing::{debug, error, info};

use crate::error::QuestError;
use crate::events::EventContext;

use super::instance::{QuestId, QuestInstance};

/// Pipeline stage a failure was caught in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
    Start,
    Update,
    PerkApply,
    Complete,
}

impl FaultStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultStage::Start => "on_start",
            FaultStage::Update => "update",
            FaultStage::PerkApply => "perk_apply",
            FaultStage::Complete => "on_complete",
        }
    }
}

/// A failure caught while driving one quest instance
#[derive(Debug)]
pub struct QuestFault {
    pub template: String,
    pub instance: QuestId,
    pub stage: FaultStage,
    pub error: QuestError,
}

impl QuestFault {
    pub fn new(instance: &QuestInstance, stage: FaultStage, error: QuestError) -> Self {
        Self {
            template: instance.name().to_string(),
            instance: instance.id(),
            stage,
            error,
        }
    }
}

impl fmt::Display for QuestFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quest '{}' ({}) failed in {}: {}",
            self.template,
            self.instance,
            self.stage.as_str(),
            self.error
        )
    }
}

/// Notification sink supplied by the UI side
pub trait QuestObserver: Send + Sync {
    fn quest_started(&self, instance: &QuestInstance, ctx: &EventContext);

    fn quest_progressed(
        &self,
        instance: &QuestInstance,
        old_percent: u8,
        new_percent: u8,
        ctx: &EventContext,
    );

    fn quest_completed(&self, instance: &QuestInstance, ctx: &EventContext);

    fn quest_failed(&self, _instance: &QuestInstance, _ctx: &EventContext) {}

    /// Operator-visible diagnostics for a caught failure
    fn report(&self, fault: &QuestFault);
}

/// Observer that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl QuestObserver for TracingObserver {
    fn quest_started(&self, instance: &QuestInstance, _ctx: &EventContext) {
        info!(
            "Quest {} started: {} [{}{}]",
            instance.id(),
            instance.name(),
            instance.scope().as_str(),
            instance
                .holder()
                .map(|h| format!(" {}", h))
                .unwrap_or_default()
        );
    }

    fn quest_progressed(
        &self,
        instance: &QuestInstance,
        old_percent: u8,
        new_percent: u8,
        _ctx: &EventContext,
    ) {
        debug!(
            "Quest {} ({}) progress {}% -> {}%",
            instance.id(),
            instance.name(),
            old_percent,
            new_percent
        );
    }

    fn quest_completed(&self, instance: &QuestInstance, ctx: &EventContext) {
        info!(
            "Quest {} completed: {}{}",
            instance.id(),
            instance.name(),
            ctx.event_player
                .map(|p| format!(" (by {})", p.id))
                .unwrap_or_default()
        );
    }

    fn quest_failed(&self, instance: &QuestInstance, _ctx: &EventContext) {
        info!("Quest {} failed: {}", instance.id(), instance.name());
    }

    fn report(&self, fault: &QuestFault) {
        error!("{}", fault);
    }
}
