//! Boss encounters
//!
//! Three archetypes rotate through fights: `Cube`, `Worm` and `Triangle`.
//! Each boss is an arena entity carrying a `BossMeta`; the worm is a chain of
//! segment entities linked by handle. This module owns the director that
//! schedules fights and the logic every archetype shares: player contact,
//! damage, rubber-banding and the death cinematic.

pub mod cube;
pub mod triangle;
pub mod worm;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::arena::Handle;
use super::dispatch::ENEMY_KILL_SPEED;
use super::entity::{Entity, EntityKind, ParticleStyle};
use super::physics::{circle_circle, static_bounce};
use super::spawn::{SPARK_COLOR, TEXT_COLOR, spawn_burst, spawn_shockwave, spawn_text};
use super::state::WorldState;
use crate::audio::AudioCue;
use crate::consts::*;
use crate::upgrades::Upgrades;

/// Boss kinds, in fight rotation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossArchetype {
    Cube,
    Worm,
    Triangle,
}

impl BossArchetype {
    /// Next boss in the rotation
    pub fn following(self) -> Self {
        match self {
            BossArchetype::Cube => BossArchetype::Worm,
            BossArchetype::Worm => BossArchetype::Triangle,
            BossArchetype::Triangle => BossArchetype::Cube,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BossArchetype::Cube => "Cube",
            BossArchetype::Worm => "Worm",
            BossArchetype::Triangle => "Triangle",
        }
    }
}

/// Boss behavior states (each archetype uses a subset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BossState {
    // Shared
    Spawning,
    Aligning,
    IdleVulnerable,
    Dying,
    // Cube attacks
    Shooting,
    Dashing,
    LightningStorm,
    FireNova,
    // Triangle
    PreFight,
    ClosingWalls,
    ArcBarrage,
    SpiralLances,
    MissileStorm,
    MineField,
    // Worm head
    WormChase,
    WormRetreat,
    WormCharge,
}

impl BossState {
    /// Stationary attacks the rubber band may cut short
    pub fn is_preemptable(self) -> bool {
        matches!(
            self,
            BossState::Shooting
                | BossState::LightningStorm
                | BossState::FireNova
                | BossState::ClosingWalls
                | BossState::ArcBarrage
                | BossState::SpiralLances
                | BossState::MissileStorm
                | BossState::MineField
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentRole {
    Head,
    Body,
    Tail,
}

/// Worm chain link; `prev` is toward the head
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentLink {
    pub role: SegmentRole,
    pub prev: Option<Handle>,
    pub next: Option<Handle>,
}

/// Per-boss-entity state
#[derive(Debug, Clone, Serialize)]
pub struct BossMeta {
    pub archetype: BossArchetype,
    pub state: BossState,
    pub state_timer: f32,
    pub health: f32,
    pub max_health: f32,
    /// Damage immunity after a hit
    pub invincibility: f32,
    /// Attacks since the last vulnerable window (cube) or rotation index (triangle)
    pub attack_counter: u32,
    /// Cooldown between shots within an attack
    pub fire_timer: f32,
    /// Shots or volleys fired in the current attack; also phase flags
    pub sub_counter: u32,
    /// Direction locked when a dash or charge starts
    pub locked_dir: Vec2,
    /// Free-running angle for spirals and wobble
    pub clock: f32,
    /// Death cinematic render offset
    pub jitter: Vec2,
    pub segment: Option<SegmentLink>,
}

impl BossMeta {
    pub fn new(archetype: BossArchetype, state: BossState, state_timer: f32, health: f32) -> Self {
        Self {
            archetype,
            state,
            state_timer,
            health,
            max_health: health,
            invincibility: 0.0,
            attack_counter: 0,
            fire_timer: 0.0,
            sub_counter: 0,
            locked_dir: Vec2::Y,
            clock: 0.0,
            jitter: Vec2::ZERO,
            segment: None,
        }
    }

    /// Switch state and reset per-state counters
    pub fn enter(&mut self, state: BossState, duration: f32) {
        self.state = state;
        self.state_timer = duration;
        self.fire_timer = 0.0;
        self.sub_counter = 0;
    }

    /// Whether player contact damages the boss right now
    pub fn is_vulnerable(&self) -> bool {
        if self.invincibility > 0.0 {
            return false;
        }
        match self.archetype {
            BossArchetype::Worm => self.state != BossState::Dying,
            BossArchetype::Cube | BossArchetype::Triangle => self.state == BossState::IdleVulnerable,
        }
    }
}

/// Schedules fights and tracks the active one
#[derive(Debug, Clone, Serialize)]
pub struct BossDirector {
    /// Game seconds until the next boss may spawn
    pub spawn_timer: f32,
    pub next: BossArchetype,
    pub active: Option<BossArchetype>,
    /// Total health of the active boss at spawn (for the HUD bar)
    pub max_health: f32,
    pub defeated: u32,
}

impl Default for BossDirector {
    fn default() -> Self {
        Self {
            spawn_timer: BOSS_FIRST_DELAY,
            next: BossArchetype::Cube,
            active: None,
            max_health: 0.0,
            defeated: 0,
        }
    }
}

/// Retry delay when a boss can't fit under the population cap
const SPAWN_RETRY: f32 = 5.0;
/// Spawn offset from the player
const SPAWN_OFFSET: Vec2 = Vec2::new(520.0, 420.0);

/// Count down to the next fight and spawn it when no boss is alive
pub fn update_director(state: &mut WorldState, dt: f32) {
    if state.boss.active.is_some() {
        return;
    }
    state.boss.spawn_timer -= dt;
    if state.boss.spawn_timer > 0.0 {
        return;
    }
    let archetype = state.boss.next;
    if spawn_boss(state, archetype) {
        state.boss.next = archetype.following();
    } else {
        state.boss.spawn_timer = SPAWN_RETRY;
    }
}

/// Spawn a boss of the given archetype near the player
///
/// Fails (returns false) if a boss is already alive or the population cap
/// has no room for it.
pub fn spawn_boss(state: &mut WorldState, archetype: BossArchetype) -> bool {
    if state.boss.active.is_some() {
        return false;
    }
    let side = if state.rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let mut pos = state.player.pos + Vec2::new(SPAWN_OFFSET.x * side, SPAWN_OFFSET.y);
    pos.y = pos.y.clamp(SAFE_BAND_MIN_Y, SAFE_BAND_MAX_Y);
    let scale = state.tuning.health_scale(state.boss.defeated);

    let total = match archetype {
        BossArchetype::Cube => cube::spawn(state, pos, scale),
        BossArchetype::Worm => worm::spawn(state, pos, scale),
        BossArchetype::Triangle => triangle::spawn(state, pos, scale),
    };
    let Some(total) = total else {
        log::debug!("No room to spawn {} boss", archetype.name());
        return false;
    };

    state.boss.active = Some(archetype);
    state.boss.max_health = total;
    state.play(AudioCue::BossRoar, None);
    state.add_shake(0.5);
    log::info!("{} boss spawned (health {:.0})", archetype.name(), total);
    true
}

/// Per-tick update for one boss entity
pub fn update_boss(state: &mut WorldState, h: Handle, dt: f32, dt_real: f32, upgrades: &Upgrades) {
    let Some(meta) = state.entities.get_mut(h).and_then(Entity::boss_mut) else {
        return;
    };
    if meta.state == BossState::Dying {
        update_dying(state, h, dt_real);
        return;
    }
    meta.invincibility = (meta.invincibility - dt).max(0.0);
    let archetype = meta.archetype;

    match archetype {
        BossArchetype::Cube => cube::update(state, h, dt, upgrades),
        BossArchetype::Worm => worm::update(state, h, dt),
        BossArchetype::Triangle => triangle::update(state, h, dt),
    }

    resolve_player_contact(state, h, upgrades);
}

/// Rubber-band tier and multipliers for a boss at `pos`
pub(crate) fn rubber_band(state: &WorldState, pos: Vec2) -> (usize, f32, f32) {
    let rb = &state.tuning.rubber_band;
    let dist = pos.distance(state.player.pos);
    (rb.tier(dist), rb.speed(dist), rb.turn(dist))
}

/// Move `vel` toward `desired` at an exponential rate
#[inline]
pub(crate) fn steer(vel: Vec2, desired: Vec2, rate: f32, dt: f32) -> Vec2 {
    vel.lerp(desired, crate::exp_blend(rate, dt))
}

/// Player bounce plus either boss damage or player damage
fn resolve_player_contact(state: &mut WorldState, h: Handle, upgrades: &Upgrades) {
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let Some(meta) = e.boss() else {
        return;
    };
    let contact = circle_circle(state.player.pos, state.player.radius, e.pos, e.radius);
    if !contact.hit {
        return;
    }
    let archetype = meta.archetype;
    let boss_state = meta.state;
    let vulnerable = meta.is_vulnerable();
    let invincible = meta.invincibility > 0.0;
    let boss_pos = e.pos;
    // A charging worm head always bites; any segment bites a slow player
    let is_head = meta.segment.is_some_and(|s| s.role == SegmentRole::Head);
    let bites = archetype == BossArchetype::Worm
        && ((is_head && boss_state == BossState::WormCharge)
            || state.player.vel.length() < ENEMY_KILL_SPEED);

    state.player.pos += contact.normal * contact.penetration;
    state.player.vel = static_bounce(state.player.vel, contact.normal, 0.9) + contact.normal * 150.0;

    if boss_state == BossState::Spawning {
        return;
    }
    if bites {
        let damage = state.tuning.worm.contact_damage;
        state.hurt_player(damage, upgrades);
    } else if vulnerable {
        let tuning = &state.tuning;
        let (base, immunity) = match archetype {
            BossArchetype::Cube => (tuning.cube.hit_damage, tuning.cube.invincibility),
            BossArchetype::Worm => (tuning.worm.hit_damage, tuning.worm.invincibility),
            BossArchetype::Triangle => (tuning.triangle.hit_damage, tuning.triangle.invincibility),
        };
        // Worm segments take flat hits; the others scale with combo
        let amount = match archetype {
            BossArchetype::Worm => base,
            _ => base * state.combo.multiplier as f32,
        };
        if let Some(meta) = state.entities.get_mut(h).and_then(Entity::boss_mut) {
            meta.invincibility = immunity;
        }
        state.play(AudioCue::BossHit, None);
        state.add_shake(0.25);
        spawn_burst(state, boss_pos, 10, 300.0, SPARK_COLOR, ParticleStyle::Spark);
        damage_boss(state, h, amount);
    } else if !invincible {
        let damage = match archetype {
            BossArchetype::Cube => state.tuning.cube.contact_damage,
            BossArchetype::Worm => state.tuning.worm.contact_damage,
            BossArchetype::Triangle => state.tuning.triangle.contact_damage,
        };
        state.hurt_player(damage, upgrades);
    }
}

/// Apply damage; starts the death sequence when health runs out
pub fn damage_boss(state: &mut WorldState, h: Handle, amount: f32) {
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    let pos = e.pos;
    let Some(meta) = e.boss_mut() else {
        return;
    };
    if meta.state == BossState::Dying {
        return;
    }
    meta.health = (meta.health - amount).max(0.0);
    let dead = meta.health <= 0.0;
    let archetype = meta.archetype;
    spawn_text(state, pos + Vec2::Y * 40.0, format!("-{}", amount.round() as i64), TEXT_COLOR);

    if !dead {
        return;
    }
    match archetype {
        BossArchetype::Worm => worm::kill_segment(state, h),
        _ => begin_dying(state, h),
    }
}

/// Enter the death cinematic
pub(crate) fn begin_dying(state: &mut WorldState, h: Handle) {
    let duration = state.tuning.death.duration;
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    e.vel = Vec2::ZERO;
    let Some(meta) = e.boss_mut() else {
        return;
    };
    meta.enter(BossState::Dying, duration);
    meta.invincibility = 0.0;
    let name = meta.archetype.name();
    state.death_time_scale = Some(DEATH_TIME_SCALE);
    state.play(AudioCue::BossDying, None);
    state.add_shake(0.6);
    log::info!("{} boss dying", name);
}

/// Death cinematic runs on real time so slow motion doesn't stretch it
fn update_dying(state: &mut WorldState, h: Handle, dt_real: f32) {
    let jitter = state.tuning.death.jitter.max(0.0);
    let jx = state.rng.random_range(-jitter..=jitter);
    let jy = state.rng.random_range(-jitter..=jitter);
    let spark = state.rng.random_bool(0.3);
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    let pos = e.pos;
    e.rotation += dt_real * 8.0;
    let Some(meta) = e.boss_mut() else {
        return;
    };
    meta.state_timer -= dt_real;
    meta.jitter = Vec2::new(jx, jy);
    let finished = meta.state_timer <= 0.0;

    if spark {
        spawn_burst(state, pos, 3, 400.0, SPARK_COLOR, ParticleStyle::Spark);
    }
    if finished {
        finish_boss(state, Some(pos));
    }
}

/// Rewards and cleanup once the cinematic ends (or the last worm segment is gone)
pub(crate) fn finish_boss(state: &mut WorldState, pos: Option<Vec2>) {
    let name = state.boss.active.map_or("Unknown", BossArchetype::name);
    let pos = pos.unwrap_or(state.player.pos);

    spawn_shockwave(state, pos, 600.0, 0xff_ff_ff);
    spawn_burst(state, pos, 40, 700.0, SPARK_COLOR, ParticleStyle::Debris);
    state.score += BOSS_DEFEAT_BONUS;
    state.player.health = state.player.max_health;
    spawn_text(state, pos, format!("+{}", BOSS_DEFEAT_BONUS), TEXT_COLOR);

    purge_boss_spawns(state);
    let mut handles = std::mem::take(&mut state.scratch);
    handles.clear();
    handles.extend(
        state
            .entities
            .iter()
            .filter(|(_, e)| matches!(e.kind, EntityKind::Boss(_)))
            .map(|(h, _)| h),
    );
    for &h in &handles {
        state.remove(h);
    }
    handles.clear();
    state.scratch = handles;

    state.boss.active = None;
    state.boss.max_health = 0.0;
    state.boss.defeated += 1;
    state.boss.spawn_timer = BOSS_INTERVAL;
    state.death_time_scale = None;
    state.play(AudioCue::BossDefeated, None);
    state.add_shake(1.0);
    log::info!("{} boss defeated ({} total)", name, state.boss.defeated);
}

/// Remove every wall a boss created and every projectile a boss fired
pub(crate) fn purge_boss_spawns(state: &mut WorldState) {
    let doomed: Vec<Handle> = state
        .entities
        .iter()
        .filter(|(_, e)| match &e.kind {
            EntityKind::Wall(w) => w.boss.is_some(),
            EntityKind::Projectile(p) => p.from_boss,
            _ => false,
        })
        .map(|(h, _)| h)
        .collect();
    for h in doomed {
        state.remove(h);
    }
}

/// Remove the walls owned by one boss
pub(crate) fn purge_walls(state: &mut WorldState, boss: Handle) {
    let doomed: Vec<Handle> = state
        .entities
        .iter()
        .filter(|(_, e)| matches!(&e.kind, EntityKind::Wall(w) if w.boss == Some(boss)))
        .map(|(h, _)| h)
        .collect();
    for h in doomed {
        state.remove(h);
    }
}

/// Current and spawn-time total health of the active boss
pub fn boss_health(state: &WorldState) -> (f32, f32) {
    if state.boss.active.is_none() {
        return (0.0, 0.0);
    }
    let current: f32 = state
        .entities
        .iter()
        .filter_map(|(_, e)| e.boss())
        .map(|m| m.health)
        .sum();
    (current, state.boss.max_health)
}

/// Evenly spaced directions starting at `offset`
pub(crate) fn ring_directions(count: u32, offset: f32) -> impl Iterator<Item = Vec2> {
    (0..count).map(move |i| crate::unit_from_angle(offset + TAU * i as f32 / count.max(1) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn arena_state() -> WorldState {
        let mut state = WorldState::new(21);
        state.entities.clear();
        state
    }

    fn find_boss(state: &WorldState) -> Handle {
        state
            .entities
            .iter()
            .find(|(_, e)| e.boss().is_some())
            .map(|(h, _)| h)
            .unwrap()
    }

    #[test]
    fn test_rotation_order() {
        assert_eq!(BossArchetype::Cube.following(), BossArchetype::Worm);
        assert_eq!(BossArchetype::Worm.following(), BossArchetype::Triangle);
        assert_eq!(BossArchetype::Triangle.following(), BossArchetype::Cube);
    }

    #[test]
    fn test_director_spawns_after_delay_and_only_one() {
        let mut state = arena_state();
        update_director(&mut state, BOSS_FIRST_DELAY - 1.0);
        assert!(state.boss.active.is_none());
        update_director(&mut state, 1.5);
        assert_eq!(state.boss.active, Some(BossArchetype::Cube));
        assert_eq!(state.boss.next, BossArchetype::Worm);
        assert!(!spawn_boss(&mut state, BossArchetype::Worm));
    }

    #[test]
    fn test_spawn_fails_at_cap() {
        let mut state = arena_state();
        while state.has_room(1) {
            state.spawn(Entity::ball(super::super::catalog::BallType::Common, Vec2::ZERO));
        }
        assert!(!spawn_boss(&mut state, BossArchetype::Cube));
        assert!(state.boss.active.is_none());
    }

    #[test]
    fn test_cube_invulnerable_outside_window() {
        let mut state = arena_state();
        assert!(spawn_boss(&mut state, BossArchetype::Cube));
        let h = find_boss(&state);
        let meta = state.entities.get_mut(h).unwrap().boss_mut().unwrap();
        meta.enter(BossState::Shooting, 2.0);
        assert!(!meta.is_vulnerable());
        meta.enter(BossState::IdleVulnerable, 2.0);
        assert!(meta.is_vulnerable());
        meta.invincibility = 0.2;
        assert!(!meta.is_vulnerable());
    }

    #[test]
    fn test_death_cinematic_pins_time_and_rewards() {
        let mut state = arena_state();
        assert!(spawn_boss(&mut state, BossArchetype::Cube));
        let h = find_boss(&state);
        state.player.health = 10.0;
        let score = state.score;

        damage_boss(&mut state, h, 1_000.0);
        assert_eq!(state.death_time_scale, Some(DEATH_TIME_SCALE));
        assert_eq!(state.entities.get(h).unwrap().boss().unwrap().state, BossState::Dying);

        // Real time drives the cinematic
        let steps = (state.tuning.death.duration / 0.05).ceil() as usize + 1;
        for _ in 0..steps {
            update_boss(&mut state, h, 0.0, 0.05, &Upgrades::default());
        }
        assert!(state.boss.active.is_none());
        assert_eq!(state.death_time_scale, None);
        assert_eq!(state.score, score + BOSS_DEFEAT_BONUS);
        assert_eq!(state.player.health, state.player.max_health);
        assert_eq!(state.boss.defeated, 1);
        assert!(state.entities.get(h).is_none());
    }

    #[test]
    fn test_purge_removes_boss_projectiles_and_walls() {
        use super::super::spawn::{EnemyShot, spawn_enemy, spawn_wall};
        use super::super::entity::ProjectileStyle;
        let mut state = arena_state();
        let boss_shot = spawn_enemy(
            &mut state,
            Vec2::ZERO,
            Vec2::X,
            EnemyShot { style: ProjectileStyle::Bullet, damage: 5.0, parent: None, from_boss: true, homing: 0.0 },
        )
        .unwrap();
        let turret_shot = spawn_enemy(
            &mut state,
            Vec2::ZERO,
            Vec2::X,
            EnemyShot { style: ProjectileStyle::Bullet, damage: 5.0, parent: None, from_boss: false, homing: 0.0 },
        )
        .unwrap();
        let wall = spawn_wall(&mut state, Vec2::ZERO, Vec2::splat(10.0), Some(Handle::DANGLING), 5.0).unwrap();
        purge_boss_spawns(&mut state);
        assert!(state.entities.get(boss_shot).is_none());
        assert!(state.entities.get(wall).is_none());
        assert!(state.entities.get(turret_shot).is_some());
    }

    fn worm_head(state: &WorldState) -> Handle {
        state
            .entities
            .iter()
            .find(|(_, e)| {
                e.boss()
                    .and_then(|m| m.segment)
                    .is_some_and(|s| s.role == SegmentRole::Head)
            })
            .map(|(h, _)| h)
            .unwrap()
    }

    #[test]
    fn test_charging_worm_head_hurts_player() {
        let mut state = arena_state();
        let upgrades = Upgrades::default();
        assert!(spawn_boss(&mut state, BossArchetype::Worm));
        let head = worm_head(&state);
        let e = state.entities.get_mut(head).unwrap();
        let at = e.pos;
        e.boss_mut().unwrap().enter(BossState::WormCharge, 1.0);
        let segment_health = e.boss().unwrap().health;

        // Fast enough that only the charge can bite
        state.player.pos = at + Vec2::X * 10.0;
        state.player.vel = Vec2::X * (ENEMY_KILL_SPEED * 3.0);
        resolve_player_contact(&mut state, head, &upgrades);

        assert!(state.player.health < state.player.max_health);
        let meta = state.entities.get(head).unwrap().boss().unwrap();
        assert_eq!(meta.health, segment_health);
    }

    #[test]
    fn test_fast_player_cuts_chasing_worm() {
        let mut state = arena_state();
        let upgrades = Upgrades::default();
        assert!(spawn_boss(&mut state, BossArchetype::Worm));
        let head = worm_head(&state);
        let at = state.entities.get(head).unwrap().pos;
        let segment_health = state.entities.get(head).unwrap().boss().unwrap().health;

        state.player.pos = at + Vec2::X * 10.0;
        state.player.vel = Vec2::NEG_X * (ENEMY_KILL_SPEED * 3.0);
        resolve_player_contact(&mut state, head, &upgrades);

        assert_eq!(state.player.health, state.player.max_health);
        let meta = state.entities.get(head).unwrap().boss().unwrap();
        assert!(meta.health < segment_health);
    }

    #[test]
    fn test_slow_player_is_bitten_by_any_segment() {
        let mut state = arena_state();
        let upgrades = Upgrades::default();
        assert!(spawn_boss(&mut state, BossArchetype::Worm));
        let head = worm_head(&state);
        let at = state.entities.get(head).unwrap().pos;
        state.player.pos = at + Vec2::X * 10.0;
        state.player.vel = Vec2::ZERO;
        resolve_player_contact(&mut state, head, &upgrades);
        assert!(state.player.health < state.player.max_health);
    }

    #[test]
    fn test_negative_jitter_config_does_not_panic() {
        let tuning = Tuning::from_json(r#"{ "death": { "jitter": -2.0 } }"#).unwrap();
        let upgrades = Upgrades::default();
        let mut state = WorldState::with_config(21, tuning, &upgrades);
        state.entities.clear();
        assert!(spawn_boss(&mut state, BossArchetype::Cube));
        let h = find_boss(&state);
        damage_boss(&mut state, h, 1_000.0);
        update_boss(&mut state, h, 0.0, 0.05, &upgrades);
        let meta = state.entities.get(h).unwrap().boss().unwrap();
        assert_eq!(meta.jitter, Vec2::ZERO);
    }
}
