//! Quest Registry
//!
//! Holds the quest and perk templates available for assignment. Templates
//! are registered from code or loaded from TOML files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::LoadError;
use crate::perk::{PerkTemplate, RawPerkFile, StatBoosts};

use super::definition::{QuestTemplate, RawQuestFile, Scope};

/// Registry for quest and perk templates.
///
/// Registration order is kept so seeded selection is reproducible.
#[derive(Debug, Default)]
pub struct QuestRegistry {
    quests: Vec<Arc<QuestTemplate>>,
    perks: Vec<Arc<PerkTemplate>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quest template, replacing any template with the same name
    pub fn register_quest(&mut self, template: QuestTemplate) -> Arc<QuestTemplate> {
        let template = Arc::new(template);
        if let Some(existing) = self.quests.iter_mut().find(|q| q.name == template.name) {
            warn!("Duplicate quest '{}', overwriting", template.name);
            *existing = Arc::clone(&template);
        } else {
            self.quests.push(Arc::clone(&template));
        }
        template
    }

    pub fn unregister_quest(&mut self, name: &str) -> Option<Arc<QuestTemplate>> {
        let index = self.quests.iter().position(|q| q.name == name)?;
        Some(self.quests.remove(index))
    }

    /// Register a perk template, replacing any perk with the same name
    pub fn register_perk(&mut self, perk: PerkTemplate) -> Arc<PerkTemplate> {
        let perk = Arc::new(perk);
        if let Some(existing) = self.perks.iter_mut().find(|p| p.name == perk.name) {
            warn!("Duplicate perk '{}', overwriting", perk.name);
            *existing = Arc::clone(&perk);
        } else {
            self.perks.push(Arc::clone(&perk));
        }
        perk
    }

    pub fn unregister_perk(&mut self, name: &str) -> Option<Arc<PerkTemplate>> {
        let index = self.perks.iter().position(|p| p.name == name)?;
        Some(self.perks.remove(index))
    }

    pub fn quest(&self, name: &str) -> Option<Arc<QuestTemplate>> {
        self.quests.iter().find(|q| q.name == name).cloned()
    }

    pub fn perk(&self, name: &str) -> Option<Arc<PerkTemplate>> {
        self.perks.iter().find(|p| p.name == name).cloned()
    }

    pub fn quests(&self) -> &[Arc<QuestTemplate>] {
        &self.quests
    }

    pub fn perks(&self) -> &[Arc<PerkTemplate>] {
        &self.perks
    }

    /// Quest templates assignable at `scope`
    pub fn quests_for(&self, scope: Scope) -> Vec<Arc<QuestTemplate>> {
        self.quests.iter().filter(|q| q.accepts(scope)).cloned().collect()
    }

    /// Perk templates grantable at `scope`
    pub fn perks_for(&self, scope: Scope) -> Vec<Arc<PerkTemplate>> {
        self.perks.iter().filter(|p| p.accepts(scope)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    /// Load `perks/*.toml` then `quests/*.toml` under `data_dir`.
    ///
    /// Perks load first so quest files can name them in their `perks` pools.
    /// A file that fails to parse or validate is skipped with a warning.
    pub fn load_from_directory(
        &mut self,
        data_dir: &Path,
        boosts: &StatBoosts,
    ) -> Result<(), LoadError> {
        let perks_dir = data_dir.join("perks");
        let mut perk_count = 0;
        for path in toml_files(&perks_dir)? {
            match self.load_perk_file(&path, boosts) {
                Ok(count) => perk_count += count,
                Err(e) => warn!("Failed to load perks {:?}: {}", path, e),
            }
        }

        let quests_dir = data_dir.join("quests");
        let mut quest_count = 0;
        for path in toml_files(&quests_dir)? {
            match self.load_quest_file(&path) {
                Ok(count) => quest_count += count,
                Err(e) => warn!("Failed to load quests {:?}: {}", path, e),
            }
        }

        info!("Loaded {} quest and {} perk definitions", quest_count, perk_count);
        Ok(())
    }

    fn load_perk_file(&mut self, path: &Path, boosts: &StatBoosts) -> Result<usize, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let raw: RawPerkFile = toml::from_str(&content).map_err(|e| LoadError::parse(path, e))?;

        // Resolve the whole file before registering any of it
        let perks = raw
            .perk
            .iter()
            .map(|p| PerkTemplate::from_raw(p, boosts))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| LoadError::Definition {
                path: path.to_path_buf(),
                source,
            })?;

        let count = perks.len();
        for perk in perks {
            info!("Loaded perk: {}", perk.name);
            self.register_perk(perk);
        }
        Ok(count)
    }

    fn load_quest_file(&mut self, path: &Path) -> Result<usize, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let raw: RawQuestFile = toml::from_str(&content).map_err(|e| LoadError::parse(path, e))?;

        let quests = raw
            .quest
            .iter()
            .map(|q| QuestTemplate::from_raw(q, |name| self.perk(name)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| LoadError::Definition {
                path: path.to_path_buf(),
                source,
            })?;

        let count = quests.len();
        for quest in quests {
            info!(
                "Loaded quest: {} ({} scopes, target {})",
                quest.name,
                quest.scopes.len(),
                quest.default_target
            );
            self.register_quest(quest);
        }
        Ok(count)
    }
}

/// Sorted `*.toml` paths directly inside `dir`; empty when `dir` is missing
fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.exists() {
        warn!("Directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::io(dir, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::perk::{PlayerEffects, Stat};
    use crate::roster::PlayerId;
    use tempfile::TempDir;

    struct NoEffects;

    impl PlayerEffects for NoEffects {
        fn set_stat_multiplier(&self, _: PlayerId, _: Stat, _: f64) {}
        fn heal(&self, _: PlayerId, _: f64) {}
        fn resupply(&self, _: PlayerId) {}
    }

    const PERKS: &str = r#"
[[perk]]
name = "Adrenaline"
description = "Move faster for a while"
scopes = ["player", "squad"]
weight = 2
effect = { kind = "stat_multiplier", stat = "move_speed", multiplier = 1.25, duration_secs = 30 }

[[perk]]
name = "Resupply"
scopes = ["team", "game"]
effect = { kind = "resupply" }
"#;

    const QUESTS: &str = r#"
[[quest]]
name = "First Blood"
description = "Earn kills"
scopes = ["player"]
events = ["on_player_earned_kill"]
target = 10
perks = ["Adrenaline"]

[[quest]]
name = "Hold the Line"
scopes = ["team", "game"]
events = ["on_capture_point_captured"]
target = 3
weight = 0.5
"#;

    fn write_data(dir: &Path) {
        std::fs::create_dir_all(dir.join("perks")).unwrap();
        std::fs::create_dir_all(dir.join("quests")).unwrap();
        std::fs::write(dir.join("perks").join("core.toml"), PERKS).unwrap();
        std::fs::write(dir.join("quests").join("core.toml"), QUESTS).unwrap();
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        write_data(temp_dir.path());

        let mut registry = QuestRegistry::new();
        let boosts = StatBoosts::new(Arc::new(NoEffects));
        registry.load_from_directory(temp_dir.path(), &boosts).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.perks().len(), 2);

        let first_blood = registry.quest("First Blood").unwrap();
        assert_eq!(first_blood.default_target, 10.0);
        assert!(first_blood.listens_to(EventKind::OnPlayerEarnedKill));
        let pool = first_blood.perks.as_ref().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].name, "Adrenaline");

        assert_eq!(registry.quests_for(Scope::Team).len(), 1);
        assert_eq!(registry.quests_for(Scope::Squad).len(), 0);
        assert_eq!(registry.perks_for(Scope::Game)[0].name, "Resupply");
    }

    #[test]
    fn test_bad_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write_data(temp_dir.path());
        let quests_dir = temp_dir.path().join("quests");
        std::fs::write(quests_dir.join("broken.toml"), "[[quest]]\nname = 3").unwrap();
        std::fs::write(
            temp_dir.path().join("quests").join("unknown_perk.toml"),
            r#"
[[quest]]
name = "Lonely"
scopes = ["player"]
events = ["on_revived"]
perks = ["Missing"]
"#,
        )
        .unwrap();

        let mut registry = QuestRegistry::new();
        let boosts = StatBoosts::new(Arc::new(NoEffects));
        registry.load_from_directory(temp_dir.path(), &boosts).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.quest("Lonely").is_none());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = QuestRegistry::new();
        let boosts = StatBoosts::new(Arc::new(NoEffects));
        registry.load_from_directory(temp_dir.path(), &boosts).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_replaces_by_name() {
        let boosts = StatBoosts::new(Arc::new(NoEffects));
        let mut registry = QuestRegistry::new();
        let temp_dir = TempDir::new().unwrap();
        write_data(temp_dir.path());
        registry.load_from_directory(temp_dir.path(), &boosts).unwrap();

        let replacement = QuestTemplate::new("First Blood", "", 5.0, |ctx| {
            Ok(crate::quest::ProgressUpdate::advance(ctx.progress, 1.0))
        });
        registry.register_quest(replacement);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.quest("First Blood").unwrap().default_target, 5.0);

        assert!(registry.unregister_quest("First Blood").is_some());
        assert!(registry.unregister_quest("First Blood").is_none());
        assert_eq!(registry.len(), 1);
    }
}
