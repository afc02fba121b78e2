//! Host-facing snapshots and callbacks
//!
//! The host receives stats every tick, HUD state only when it changes in a
//! way a player could see, and a single game-over notification.

use serde::Serialize;

use super::boss::boss_health;
use super::state::WorldState;
use crate::upgrades::Upgrades;

/// Charge changes smaller than this are not pushed
const CHARGE_EPSILON: f32 = 0.01;
/// Boss health changes smaller than this are not pushed
const BOSS_HEALTH_EPSILON: f32 = 0.5;

/// Per-tick stats for the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSnapshot {
    pub health: f32,
    pub max_health: f32,
    pub score: u64,
    /// Horizontal distance in meters
    pub distance: u32,
    pub multiplier: u32,
}

impl StatSnapshot {
    pub fn capture(state: &WorldState) -> Self {
        Self {
            health: state.player.health,
            max_health: state.player.max_health,
            score: state.score,
            distance: state.distance_m(),
            multiplier: state.combo.multiplier,
        }
    }
}

/// Ability bar, timer and boss bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub ability_unlocked: bool,
    pub ability_charge: f32,
    pub ability_active: bool,
    /// Whole seconds survived
    pub elapsed_secs: u32,
    pub boss_health: f32,
    pub boss_max_health: f32,
}

impl HudSnapshot {
    pub fn capture(state: &WorldState, upgrades: &Upgrades) -> Self {
        let (boss_health, boss_max_health) = boss_health(state);
        Self {
            ability_unlocked: upgrades.auto_bounce_unlocked,
            ability_charge: state.ability.charge,
            ability_active: state.ability.is_active(),
            elapsed_secs: state.elapsed as u32,
            boss_health,
            boss_max_health,
        }
    }

    /// True if `self` differs from `last` enough to be worth a push
    pub fn differs_from(&self, last: &HudSnapshot) -> bool {
        self.ability_unlocked != last.ability_unlocked
            || self.ability_active != last.ability_active
            || self.elapsed_secs != last.elapsed_secs
            || (self.ability_charge - last.ability_charge).abs() >= CHARGE_EPSILON
            || (self.boss_health - last.boss_health).abs() >= BOSS_HEALTH_EPSILON
            || self.boss_max_health != last.boss_max_health
    }
}

/// Host notifications. Each is called at most once per tick.
pub trait GameCallbacks {
    fn on_game_over(&mut self, score: u64);
    fn on_update_stats(&mut self, stats: &StatSnapshot);
    fn on_hud_update(&mut self, hud: &HudSnapshot);
}

/// Ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl GameCallbacks for NoopCallbacks {
    fn on_game_over(&mut self, _score: u64) {}
    fn on_update_stats(&mut self, _stats: &StatSnapshot) {}
    fn on_hud_update(&mut self, _hud: &HudSnapshot) {}
}

/// Keeps every notification (tests and replays)
#[derive(Debug, Default, Clone)]
pub struct RecordingCallbacks {
    pub game_overs: Vec<u64>,
    pub stats: Vec<StatSnapshot>,
    pub huds: Vec<HudSnapshot>,
}

impl GameCallbacks for RecordingCallbacks {
    fn on_game_over(&mut self, score: u64) {
        self.game_overs.push(score);
    }

    fn on_update_stats(&mut self, stats: &StatSnapshot) {
        self.stats.push(stats.clone());
    }

    fn on_hud_update(&mut self, hud: &HudSnapshot) {
        self.huds.push(hud.clone());
    }
}
