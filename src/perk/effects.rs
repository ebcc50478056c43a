//! Perk effects
//!
//! Perks act on players through [`PlayerEffects`], the engine-side capability.
//! [`StatBoosts`] layers timed multipliers on top of it: every application
//! records a fresh token for the `(player, stat)` pair, and the scheduled
//! revert only fires if that token is still the latest one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QuestError;
use crate::roster::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Damage,
    MoveSpeed,
    FireRate,
    DamageResistance,
}

/// Engine hooks perks act through
pub trait PlayerEffects: Send + Sync {
    /// Set the multiplier for `stat`; 1.0 is the neutral value
    fn set_stat_multiplier(&self, player: PlayerId, stat: Stat, multiplier: f64);

    fn heal(&self, player: PlayerId, amount: f64);

    fn resupply(&self, player: PlayerId);
}

/// Token-guarded timed stat multipliers
#[derive(Clone)]
pub struct StatBoosts {
    effects: Arc<dyn PlayerEffects>,
    tokens: Arc<DashMap<(PlayerId, Stat), u64>>,
    next_token: Arc<AtomicU64>,
}

impl StatBoosts {
    pub fn new(effects: Arc<dyn PlayerEffects>) -> Self {
        Self {
            effects,
            tokens: Arc::new(DashMap::new()),
            next_token: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn effects(&self) -> &Arc<dyn PlayerEffects> {
        &self.effects
    }

    /// Apply `multiplier` to every target, reverting after `duration_secs`.
    ///
    /// A non-positive or non-finite duration is never reverted. Timed
    /// applications need a tokio runtime to schedule the revert; without one
    /// nothing is applied and [`QuestError::NoTimer`] is returned.
    pub fn apply(
        &self,
        targets: &[PlayerId],
        stat: Stat,
        multiplier: f64,
        duration_secs: f64,
    ) -> Result<(), QuestError> {
        let timer = if duration_secs > 0.0 && duration_secs.is_finite() {
            let handle = tokio::runtime::Handle::try_current().map_err(|_| QuestError::NoTimer)?;
            Some((handle, Duration::from_secs_f64(duration_secs)))
        } else {
            None
        };

        for &player in targets {
            let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
            self.tokens.insert((player, stat), token);
            self.effects.set_stat_multiplier(player, stat, multiplier);
            debug!("Boost {:?} x{} for {} (token {})", stat, multiplier, player, token);

            if let Some((handle, duration)) = &timer {
                let boosts = self.clone();
                let duration = *duration;
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    boosts.revert(player, stat, token);
                });
            }
        }

        Ok(())
    }

    /// Revert the boost started with `token`, unless a newer one replaced it
    pub fn revert(&self, player: PlayerId, stat: Stat, token: u64) -> bool {
        let removed = self
            .tokens
            .remove_if(&(player, stat), |_, current| *current == token)
            .is_some();

        if removed {
            self.effects.set_stat_multiplier(player, stat, 1.0);
            debug!("Boost {:?} for {} expired (token {})", stat, player, token);
        } else {
            debug!("Skipping stale revert of {:?} for {} (token {})", stat, player, token);
        }
        removed
    }

    /// Token of the boost currently in effect, if any
    pub fn active_token(&self, player: PlayerId, stat: Stat) -> Option<u64> {
        self.tokens.get(&(player, stat)).map(|t| *t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Multipliers {
        current: Mutex<HashMap<(PlayerId, Stat), f64>>,
    }

    impl Multipliers {
        fn get(&self, player: PlayerId, stat: Stat) -> f64 {
            *self.current.lock().unwrap().get(&(player, stat)).unwrap_or(&1.0)
        }
    }

    impl PlayerEffects for Multipliers {
        fn set_stat_multiplier(&self, player: PlayerId, stat: Stat, multiplier: f64) {
            self.current.lock().unwrap().insert((player, stat), multiplier);
        }

        fn heal(&self, _player: PlayerId, _amount: f64) {}

        fn resupply(&self, _player: PlayerId) {}
    }

    const P: PlayerId = PlayerId(1);

    #[tokio::test(start_paused = true)]
    async fn test_single_boost_reverts() {
        let sink = Arc::new(Multipliers::default());
        let boosts = StatBoosts::new(sink.clone());

        boosts.apply(&[P], Stat::Damage, 1.5, 5.0).unwrap();
        assert_eq!(sink.get(P, Stat::Damage), 1.5);

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(sink.get(P, Stat::Damage), 1.0);
        assert_eq!(boosts.active_token(P, Stat::Damage), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_boost_survives_first_expiry() {
        let sink = Arc::new(Multipliers::default());
        let boosts = StatBoosts::new(sink.clone());

        boosts.apply(&[P], Stat::Damage, 1.5, 5.0).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        boosts.apply(&[P], Stat::Damage, 1.5, 5.0).unwrap();

        // First expiry at t=5s must not clear the second boost
        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(sink.get(P, Stat::Damage), 1.5);
        assert_eq!(boosts.active_token(P, Stat::Damage), Some(2));

        // Second expiry at t=6s
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.get(P, Stat::Damage), 1.0);
        assert_eq!(boosts.active_token(P, Stat::Damage), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_permanent() {
        let sink = Arc::new(Multipliers::default());
        let boosts = StatBoosts::new(sink.clone());

        boosts.apply(&[P], Stat::MoveSpeed, 1.2, 0.0).unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(sink.get(P, Stat::MoveSpeed), 1.2);
    }

    #[test]
    fn test_timed_boost_without_runtime_fails() {
        let sink = Arc::new(Multipliers::default());
        let boosts = StatBoosts::new(sink.clone());

        let result = boosts.apply(&[P], Stat::FireRate, 2.0, 10.0);
        assert!(matches!(result, Err(QuestError::NoTimer)));
        assert_eq!(sink.get(P, Stat::FireRate), 1.0);
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let sink = Arc::new(Multipliers::default());
        let boosts = StatBoosts::new(sink.clone());

        boosts.apply(&[P], Stat::Damage, 1.5, 0.0).unwrap();
        boosts.apply(&[P], Stat::Damage, 1.7, 0.0).unwrap();
        assert!(!boosts.revert(P, Stat::Damage, 1));
        assert_eq!(sink.get(P, Stat::Damage), 1.7);
        assert!(boosts.revert(P, Stat::Damage, 2));
        assert_eq!(sink.get(P, Stat::Damage), 1.0);
    }
}
