//! Quest System Module
//!
//! Scoped quests (player, squad, team, match) advanced by gameplay events.
//! Templates describe a quest and how events move it; the manager owns the
//! live instances and completes them, granting their perks.

pub mod definition;
pub mod instance;
pub mod manager;
pub mod observer;
pub mod progress;
pub mod registry;

pub use definition::{
    HookFn, QuestRule, QuestTemplate, RawQuestDefinition, RawQuestFile, Scope, UpdateFn,
};
pub use instance::{QuestContext, QuestId, QuestInstance, QuestSnapshot, ScopeHolder};
pub use manager::QuestManager;
pub use observer::{FaultStage, QuestFault, QuestObserver, TracingObserver};
pub use progress::{percent_of, Progress, ProgressUpdate, QuestState};
pub use registry::QuestRegistry;
