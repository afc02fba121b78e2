//! Player abilities
//!
//! Combo decay, the rate-based passive procs (auto missile, bomb, fireball)
//! and the charge-activated auto-bounce, which steers the player between
//! targets on its own while gravity is suspended.

use glam::Vec2;
use serde::Serialize;

use super::arena::Handle;
use super::entity::{Entity, EntityKind, ProjectileStyle};
use super::spawn::{spawn_bomb, spawn_friendly};
use super::state::WorldState;
use crate::audio::AudioCue;
use crate::consts::GRAVITY;
use crate::upgrades::Upgrades;
use crate::{cap_speed, exp_blend};

/// Real seconds between auto-bounce target searches
pub const RETARGET_INTERVAL: f32 = 0.25;
/// Targets further than this are ignored by auto-bounce
pub const AUTO_TARGET_RANGE: f32 = 1500.0;
/// Distance at which a target's priority halves
const PRIORITY_FALLOFF: f32 = 400.0;
const BOSS_PRIORITY: f32 = 3.0;
const RARE_PRIORITY: f32 = 2.0;
/// Steering rate toward the target (1/s)
const STEER_RATE: f32 = 8.0;
/// Upward speed while no target is in range
const IDLE_RISE_SPEED: f32 = 500.0;
/// Speed cap applied when the ability ends
const EXIT_SPEED: f32 = 900.0;

const MISSILE_RANGE: f32 = 1200.0;
const MISSILE_LAUNCH_SPEED: f32 = 380.0;
const FIREBALL_RANGE: f32 = 1000.0;
const FIREBALL_SPEED: f32 = 700.0;
/// Bomb flight time to its target
const BOMB_FLIGHT: f32 = 0.6;
const BOMB_BLAST: f32 = 140.0;
/// Bombs fall at this fraction of player gravity
pub const BOMB_GRAVITY: f32 = GRAVITY * 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbilityState {
    Off,
    Active,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoBounce {
    pub state: AbilityState,
    /// Charge in `[0, 1]`; activation needs a full bar
    pub charge: f32,
    /// Game seconds left while active
    pub remaining: f32,
    /// Real seconds until the next target search
    pub retarget_timer: f32,
    pub target: Option<Handle>,
}

impl Default for AutoBounce {
    fn default() -> Self {
        Self {
            state: AbilityState::Off,
            charge: 0.0,
            remaining: 0.0,
            retarget_timer: 0.0,
            target: None,
        }
    }
}

impl AutoBounce {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == AbilityState::Active
    }
}

/// Accumulators for the rate-based passive procs
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassiveProcs {
    pub missile: f32,
    pub bomb: f32,
    pub fireball: f32,
}

/// Add auto-bounce charge, clamped to a full bar
pub fn add_charge(state: &mut WorldState, amount: f32) {
    state.ability.charge = (state.ability.charge + amount).clamp(0.0, 1.0);
}

/// Start auto-bounce if unlocked and fully charged
pub fn try_activate(state: &mut WorldState, upgrades: &Upgrades) -> bool {
    let ability = &mut state.ability;
    if !upgrades.auto_bounce_unlocked || ability.is_active() || ability.charge < 1.0 {
        return false;
    }
    ability.state = AbilityState::Active;
    ability.remaining = upgrades.auto_bounce_duration();
    ability.retarget_timer = 0.0;
    ability.target = None;
    state.play(AudioCue::AbilityStart, None);
    log::debug!("Auto-bounce active for {:.1}s", state.ability.remaining);
    true
}

impl WorldState {
    /// Player-facing activation entry point
    pub fn try_activate_auto_bounce(&mut self, upgrades: &Upgrades) -> bool {
        try_activate(self, upgrades)
    }
}

/// Decay the combo timer; the multiplier resets once it runs out
pub fn update_combo(state: &mut WorldState, dt: f32) {
    let combo = &mut state.combo;
    if combo.multiplier <= 1 {
        combo.timer = 0.0;
        return;
    }
    combo.timer -= dt;
    if combo.timer <= 0.0 {
        combo.multiplier = 1;
        combo.timer = 0.0;
    }
}

/// Advance an accumulator; true when a proc is due
fn proc_due(acc: &mut f32, rate: f32, dt: f32) -> bool {
    if rate <= 0.0 {
        *acc = 0.0;
        return false;
    }
    *acc += dt;
    let period = 1.0 / rate;
    if *acc >= period {
        *acc -= period;
        // Don't bank procs across long stalls
        *acc = acc.min(period);
        return true;
    }
    false
}

pub fn update_passive_procs(state: &mut WorldState, dt: f32, upgrades: &Upgrades) {
    let origin = state.player.pos;

    if proc_due(&mut state.procs.missile, upgrades.auto_missile_rate, dt)
        && state.count_friendly(ProjectileStyle::Missile) < upgrades.auto_missile_max as usize
    {
        let target = state.nearest_target(origin, MISSILE_RANGE, &[]);
        let vel = Vec2::new(state.player.vel.x * 0.3, MISSILE_LAUNCH_SPEED);
        if spawn_friendly(state, origin, vel, ProjectileStyle::Missile, target).is_some() {
            state.play(AudioCue::MissileLaunch, Some(0.5));
        }
    }

    if proc_due(&mut state.procs.bomb, upgrades.auto_bomb_rate, dt) {
        if let Some(pos) = state
            .nearest_target(origin, upgrades.auto_bomb_range, &[])
            .and_then(|h| state.entities.get(h))
            .map(|e| e.pos)
        {
            // Ballistic lob that lands on the target after BOMB_FLIGHT
            let delta = pos - origin;
            let vel = delta / BOMB_FLIGHT + Vec2::Y * (0.5 * BOMB_GRAVITY * BOMB_FLIGHT);
            spawn_bomb(state, origin, vel, BOMB_FLIGHT + 0.1, BOMB_BLAST);
        }
    }

    if proc_due(&mut state.procs.fireball, upgrades.auto_fireball_rate, dt) {
        let target = state.nearest_target(origin, FIREBALL_RANGE, &[]);
        if let Some(pos) = target.and_then(|h| state.entities.get(h)).map(|e| e.pos) {
            let vel = (pos - origin).normalize_or(Vec2::Y) * FIREBALL_SPEED;
            spawn_friendly(state, origin, vel, ProjectileStyle::Fireball, target);
        }
    }
}

/// Highest-priority target: bosses first, then rare balls, discounted by distance
fn pick_target(state: &WorldState) -> Option<Handle> {
    let origin = state.player.pos;
    let range_sq = AUTO_TARGET_RANGE * AUTO_TARGET_RANGE;
    state
        .entities
        .iter()
        .filter_map(|(h, e)| priority(e).map(|p| (h, e, p)))
        .filter(|(_, e, _)| e.pos.distance_squared(origin) <= range_sq)
        .map(|(h, e, p)| (h, p / (1.0 + e.pos.distance(origin) / PRIORITY_FALLOFF)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h)
}

fn priority(e: &Entity) -> Option<f32> {
    match &e.kind {
        EntityKind::Boss(_) => Some(BOSS_PRIORITY),
        EntityKind::Ball(b) if b.def().is_target => {
            Some(if b.def().is_rare { RARE_PRIORITY } else { 1.0 })
        }
        _ => None,
    }
}

/// Steer the player while active; gravity is suspended by the caller
pub fn update_auto_bounce(state: &mut WorldState, dt: f32, dt_real: f32, upgrades: &Upgrades) {
    if !state.ability.is_active() {
        return;
    }

    state.ability.remaining -= dt;
    if state.ability.remaining <= 0.0 {
        end_auto_bounce(state);
        return;
    }

    state.ability.retarget_timer -= dt_real;
    let target_lost = state
        .ability
        .target
        .is_none_or(|h| !state.entities.contains(h));
    if state.ability.retarget_timer <= 0.0 || target_lost {
        state.ability.target = pick_target(state);
        state.ability.retarget_timer = RETARGET_INTERVAL;
    }

    let speed = upgrades.auto_bounce_speed();
    let target_pos = state
        .ability
        .target
        .and_then(|h| state.entities.get(h))
        .map(|e| e.pos);
    let player = &mut state.player;
    player.vel = match target_pos {
        Some(pos) => {
            let desired = (pos - player.pos).normalize_or(Vec2::Y) * speed;
            let rate = STEER_RATE * (1.0 + 0.1 * upgrades.auto_bounce_level as f32);
            player.vel.lerp(desired, exp_blend(rate, dt))
        }
        None => Vec2::new(0.0, IDLE_RISE_SPEED),
    };
}

/// Drop charge, cap speed and turn a steep dive into a rise
fn end_auto_bounce(state: &mut WorldState) {
    let ability = &mut state.ability;
    ability.state = AbilityState::Off;
    ability.charge = 0.0;
    ability.remaining = 0.0;
    ability.target = None;

    let mut vel = cap_speed(state.player.vel, EXIT_SPEED);
    if vel.y < 0.0 && -vel.y > vel.x.abs() {
        vel.y = -vel.y * 0.5;
    }
    state.player.vel = vel;
    state.play(AudioCue::AbilityEnd, None);
    log::debug!("Auto-bounce ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::catalog::BallType;

    fn unlocked() -> Upgrades {
        Upgrades {
            auto_bounce_unlocked: true,
            ..Upgrades::default()
        }
    }

    fn empty_state() -> WorldState {
        let mut state = WorldState::new(13);
        state.entities.clear();
        state
    }

    #[test]
    fn test_activation_needs_unlock_and_full_charge() {
        let mut state = empty_state();
        state.ability.charge = 1.0;
        assert!(!state.try_activate_auto_bounce(&Upgrades::default()));
        state.ability.charge = 0.5;
        assert!(!state.try_activate_auto_bounce(&unlocked()));
        state.ability.charge = 1.0;
        assert!(state.try_activate_auto_bounce(&unlocked()));
        assert!(!state.try_activate_auto_bounce(&unlocked()));
    }

    #[test]
    fn test_combo_resets_when_timer_expires() {
        let mut state = empty_state();
        state.combo.multiplier = 5;
        state.combo.timer = 0.1;
        update_combo(&mut state, 0.05);
        assert_eq!(state.combo.multiplier, 5);
        update_combo(&mut state, 0.05);
        assert_eq!(state.combo.multiplier, 1);
    }

    #[test]
    fn test_proc_due_period() {
        let mut acc = 0.0;
        assert!(!proc_due(&mut acc, 2.0, 0.3));
        assert!(proc_due(&mut acc, 2.0, 0.3));
        assert!(!proc_due(&mut acc, 0.0, 10.0));
        assert_eq!(acc, 0.0);
    }

    #[test]
    fn test_missile_proc_respects_cap() {
        let mut state = empty_state();
        let upgrades = Upgrades {
            auto_missile_rate: 100.0,
            auto_missile_max: 2,
            ..Upgrades::default()
        };
        for _ in 0..10 {
            update_passive_procs(&mut state, 0.05, &upgrades);
        }
        assert_eq!(state.count_friendly(ProjectileStyle::Missile), 2);
    }

    #[test]
    fn test_boss_outranks_nearer_ball() {
        use crate::sim::boss::{BossArchetype, spawn_boss};
        let mut state = empty_state();
        let ball = state
            .spawn(Entity::ball(BallType::Common, state.player.pos + Vec2::X * 100.0))
            .unwrap();
        assert_eq!(pick_target(&state), Some(ball));
        assert!(spawn_boss(&mut state, BossArchetype::Cube));
        let picked = pick_target(&state).unwrap();
        assert!(state.entities.get(picked).unwrap().boss().is_some());
    }

    #[test]
    fn test_active_steers_without_target_upward() {
        let mut state = empty_state();
        state.ability.charge = 1.0;
        assert!(try_activate(&mut state, &unlocked()));
        update_auto_bounce(&mut state, 0.016, 0.016, &unlocked());
        assert_eq!(state.player.vel, Vec2::new(0.0, IDLE_RISE_SPEED));
    }

    #[test]
    fn test_expiry_caps_speed_and_flips_dive() {
        let mut state = empty_state();
        state.ability.charge = 1.0;
        assert!(try_activate(&mut state, &unlocked()));
        state.ability.remaining = 0.01;
        state.player.vel = Vec2::new(100.0, -3000.0);
        update_auto_bounce(&mut state, 0.02, 0.02, &unlocked());
        assert_eq!(state.ability.state, AbilityState::Off);
        assert_eq!(state.ability.charge, 0.0);
        assert!(state.player.vel.y > 0.0);
        assert!(state.player.vel.length() <= EXIT_SPEED + 1e-3);
    }
}
