use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use match_quests::config::SimConfig;
use match_quests::events::EventContext;
use match_quests::perk::{PlayerEffects, Stat, StatBoosts};
use match_quests::quest::{QuestManager, QuestRegistry, Scope, TracingObserver};
use match_quests::roster::{MatchRoster, PlayerId, PlayerRef, Roster, SquadId, TeamId};

// ============================================================================
// Engine Stand-in
// ============================================================================

/// Player effects that only log what a game engine would do
struct LoggedEffects;

impl PlayerEffects for LoggedEffects {
    fn set_stat_multiplier(&self, player: PlayerId, stat: Stat, multiplier: f64) {
        info!("[engine] {} {:?} multiplier -> {}", player, stat, multiplier);
    }

    fn heal(&self, player: PlayerId, amount: f64) {
        info!("[engine] {} healed for {}", player, amount);
    }

    fn resupply(&self, player: PlayerId) {
        info!("[engine] {} resupplied", player);
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// One quest per player, per squad, per team, and one for the match
fn assign_initial_quests(manager: &mut QuestManager, roster: &MatchRoster) {
    let players = roster.players();

    // First member seen stands in for the squad/team when binding the holder
    let mut squads: BTreeMap<u32, PlayerRef> = BTreeMap::new();
    let mut teams: BTreeMap<u32, PlayerRef> = BTreeMap::new();
    for player in &players {
        if let Some(SquadId(squad)) = player.squad {
            squads.entry(squad).or_insert(*player);
        }
        if let Some(TeamId(team)) = player.team {
            teams.entry(team).or_insert(*player);
        }
    }

    let assignments = players
        .iter()
        .map(|p| (Scope::Player, *p))
        .chain(squads.values().map(|p| (Scope::Squad, *p)))
        .chain(teams.values().map(|p| (Scope::Team, *p)));

    for (scope, player) in assignments {
        if manager.assign_quest(scope, &EventContext::for_player(player)).is_none() {
            warn!("No {} quest available for {}", scope.as_str(), player.id);
        }
    }

    if manager.assign_quest(Scope::Game, &EventContext::new()).is_none() {
        warn!("No match quest available");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("match_quests=info")),
        )
        .init();

    let scenario = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/match.toml"));

    let config = match SimConfig::load(&scenario) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Scenario {:?}: {} players, {} events",
        scenario,
        config.players.len(),
        config.events.len()
    );

    let mut roster = MatchRoster::new();
    for player in &config.players {
        roster.join(player.to_ref());
    }
    let roster = Arc::new(roster);

    let boosts = StatBoosts::new(Arc::new(LoggedEffects));
    let mut registry = QuestRegistry::new();
    if let Err(e) = registry.load_from_directory(&config.data_dir, &boosts) {
        error!("Failed to load quest data: {}", e);
        std::process::exit(1);
    }

    let mut manager = QuestManager::new(
        registry,
        config.manager.clone(),
        roster.clone(),
        Arc::new(TracingObserver),
    );
    assign_initial_quests(&mut manager, &roster);

    // Replay the script against the wall clock
    let start = Instant::now();
    for event in &config.events {
        tokio::time::sleep_until(start + Duration::from_millis(event.at_ms)).await;

        let Some(player) = roster.get(PlayerId(event.player)) else {
            warn!("Skipping {} for unknown player {}", event.kind.as_str(), event.player);
            continue;
        };

        let mut ctx = EventContext::new();
        if let Some(other) = event.other.and_then(|id| roster.get(PlayerId(id))) {
            ctx = ctx.with_other(other);
        }
        if let Some(magnitude) = event.magnitude {
            ctx = ctx.with_magnitude(magnitude);
        }
        manager.update_player(player, event.kind, &ctx);
    }

    for snapshot in manager.snapshots() {
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!("Active: {}", json),
            Err(e) => warn!("Failed to serialize {}: {}", snapshot.id, e),
        }
    }
    info!(
        "{} quests active, {} finished",
        manager.active_count(),
        manager.history().len()
    );

    if config.linger_ms > 0 {
        info!("Waiting {}ms for timed perks to expire", config.linger_ms);
        tokio::time::sleep(Duration::from_millis(config.linger_ms)).await;
    }
}
