//! Perk System Module
//!
//! Rewards granted to the members of a quest's scope on completion, including
//! timed stat multipliers that revert on their own.

pub mod definition;
pub mod effects;

pub use definition::{
    perk_effect, PerkContext, PerkEffect, PerkFactory, PerkInstance, PerkTemplate,
    RawPerkDefinition, RawPerkEffect, RawPerkFile,
};
pub use effects::{PlayerEffects, Stat, StatBoosts};
