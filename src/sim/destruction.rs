//! Ball destruction pipeline
//!
//! Every ball kill funnels through `destroy_ball`: scoring, combo, healing,
//! on-kill procs, special effects and cleanup happen here in a fixed order.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;
use std::f32::consts::TAU;

use super::ability::{AbilityState, add_charge};
use super::arena::Handle;
use super::catalog::SpecialEffect;
use super::entity::{Entity, EntityKind, ParticleStyle, ProjectileStyle};
use super::physics::circles_overlap;
use super::spawn::{SPARK_COLOR, TEXT_COLOR, spawn_burst, spawn_friendly, spawn_lightning, spawn_shockwave, spawn_text};
use super::state::WorldState;
use crate::audio::AudioCue;
use crate::consts::*;
use crate::unit_from_angle;
use crate::upgrades::Upgrades;

/// What destroyed a ball. Only `Player` kills roll the on-kill procs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KillCause {
    Player,
    Missile,
    Chain,
    Bomb,
    Fireball,
    Shard,
}

/// Fragments are this fraction of the parent radius
const FRAGMENT_SCALE: f32 = 0.6;
const FRAGMENT_SPEED: f32 = 260.0;
const SHARD_COUNT: u32 = 8;
const SHARD_SPEED: f32 = 650.0;
const MISSILE_SPEED: f32 = 420.0;
/// Range a bounce missile searches for its target
const MISSILE_RANGE: f32 = 1200.0;

/// Destroy a ball and apply every consequence of the kill
///
/// Returns false if the handle no longer refers to a live ball.
pub fn destroy_ball(state: &mut WorldState, h: Handle, cause: KillCause, upgrades: &Upgrades) -> bool {
    let Some(e) = state.entities.get(h) else {
        return false;
    };
    let Some(ball) = e.as_ball() else {
        return false;
    };
    let pos = e.pos;
    let radius = e.radius;
    let color = e.color;
    let ball_type = ball.ball_type;
    let fragment = ball.fragment;
    let def = ball.def();

    // Hide it from every query below (chain targets, missile retargets)
    state.remove(h);
    state.kills += 1;

    let points = def.points * state.combo.multiplier as u64;
    state.score += points;
    state.coins_earned += def.coins;

    if def.is_target {
        state.combo.multiplier = (state.combo.multiplier + 1).min(MAX_COMBO);
        state.combo.timer = upgrades.combo_duration;
    }
    if def.heal_fraction > 0.0 {
        let amount = state.player.max_health * def.heal_fraction;
        state.player.heal(amount);
        state.play(AudioCue::Heal, None);
    }

    if cause == KillCause::Player {
        roll_player_procs(state, h, pos, upgrades);
        if def.splittable && !fragment && roll(state, upgrades.split_chance) {
            split_ball(state, ball_type, pos, radius, upgrades.split_count);
        }
        if def.is_target && state.ability.state == AbilityState::Off {
            add_charge(state, CHARGE_PER_KILL * upgrades.charge_rate);
        }
    }

    if def.effect == SpecialEffect::ShardBurst {
        shard_burst(state, pos);
    }
    orphan_projectiles(state, h);

    let debris = if def.is_rare { 24 } else { 12 };
    spawn_burst(state, pos, debris, 380.0, color, ParticleStyle::Debris);
    if points > 0 {
        spawn_text(state, pos, format!("+{}", points), TEXT_COLOR);
    }
    let cue = if def.is_rare {
        AudioCue::BreakRare
    } else {
        AudioCue::Break
    };
    state.play(cue, Some((state.combo.multiplier as f32 / 10.0).min(1.0)));
    state.add_shake(if def.is_rare { 0.2 } else { 0.05 });
    true
}

#[inline]
fn roll(state: &mut WorldState, chance: f32) -> bool {
    chance > 0.0 && state.rng.random::<f32>() < chance
}

/// Launch impulse, chain lightning and bounce missile, in that order
fn roll_player_procs(state: &mut WorldState, origin: Handle, pos: Vec2, upgrades: &Upgrades) {
    if roll(state, upgrades.launch_impulse_chance) {
        state.player.vel.y = state.player.vel.y.max(upgrades.launch_impulse_strength);
        state.play(AudioCue::Launch, Some(0.5));
    }
    if roll(state, upgrades.chain_lightning_chance) {
        chain_lightning(
            state,
            origin,
            pos,
            upgrades.chain_lightning_jumps,
            upgrades.chain_lightning_range,
            upgrades,
        );
    }
    if roll(state, upgrades.bounce_missile_chance) {
        let target = state.nearest_target(pos, MISSILE_RANGE, &[]);
        spawn_friendly(state, pos, Vec2::Y * MISSILE_SPEED, ProjectileStyle::Missile, target);
        state.play(AudioCue::MissileLaunch, None);
    }
}

/// Jump from `pos` to the nearest unvisited target, up to `jumps` times
pub fn chain_lightning(
    state: &mut WorldState,
    origin: Handle,
    pos: Vec2,
    jumps: u32,
    range: f32,
    upgrades: &Upgrades,
) -> u32 {
    let mut visited = vec![origin];
    let mut from = pos;
    let mut hits = 0;
    for _ in 0..jumps {
        let Some(next) = state.nearest_target(from, range, &visited) else {
            break;
        };
        let Some(to) = state.entities.get(next).map(|e| e.pos) else {
            break;
        };
        visited.push(next);
        spawn_lightning(state, from, to);
        if destroy_ball(state, next, KillCause::Chain, upgrades) {
            hits += 1;
        }
        from = to;
    }
    if hits > 0 {
        state.play(AudioCue::Zap, None);
    }
    hits
}

/// Smaller copies flung outward; they never split again
fn split_ball(state: &mut WorldState, ball_type: super::catalog::BallType, pos: Vec2, radius: f32, count: u32) {
    let offset = state.rng.random_range(0.0..TAU);
    for i in 0..count {
        let dir = unit_from_angle(offset + TAU * i as f32 / count.max(1) as f32);
        let mut piece = Entity::ball(ball_type, pos + dir * radius * 0.5).with_vel(dir * FRAGMENT_SPEED);
        piece.radius = radius * FRAGMENT_SCALE;
        if let EntityKind::Ball(data) = &mut piece.kind {
            data.fragment = true;
        }
        if state.spawn(piece).is_none() {
            break;
        }
    }
}

/// Radial burst of friendly shards
fn shard_burst(state: &mut WorldState, pos: Vec2) {
    for i in 0..SHARD_COUNT {
        let dir = unit_from_angle(TAU * i as f32 / SHARD_COUNT as f32);
        spawn_friendly(state, pos, dir * SHARD_SPEED, ProjectileStyle::Shard, None);
    }
    spawn_shockwave(state, pos, 120.0, 0xe1_f5_fe);
}

/// Projectiles fired by a dead entity stop homing and fly straight
pub fn orphan_projectiles(state: &mut WorldState, parent: Handle) {
    for (_, e) in state.entities.iter_mut() {
        if let EntityKind::Projectile(p) = &mut e.kind {
            if p.parent == Some(parent) {
                p.parent = None;
                p.homing = 0.0;
            }
        }
    }
}

/// Destroy every ball in the blast radius
pub fn explode(state: &mut WorldState, pos: Vec2, blast_radius: f32, cause: KillCause, upgrades: &Upgrades) {
    let caught: Vec<Handle> = state
        .entities
        .iter()
        .filter(|(_, e)| e.as_ball().is_some() && circles_overlap(pos, blast_radius, e.pos, e.radius))
        .map(|(h, _)| h)
        .collect();
    for h in caught {
        destroy_ball(state, h, cause, upgrades);
    }
    spawn_shockwave(state, pos, blast_radius, 0xff_91_00);
    spawn_burst(state, pos, 16, 500.0, SPARK_COLOR, ParticleStyle::Spark);
    state.play(AudioCue::Explosion, None);
    state.add_shake(0.35);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::catalog::BallType;

    fn empty_state() -> WorldState {
        let mut state = WorldState::new(11);
        state.entities.clear();
        state
    }

    fn live_balls(state: &WorldState) -> usize {
        state.entities.iter().filter(|(_, e)| e.as_ball().is_some()).count()
    }

    #[test]
    fn test_score_uses_multiplier_then_increments() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        state.combo.multiplier = 3;
        let h = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        assert!(destroy_ball(&mut state, h, KillCause::Player, &upgrades));
        assert_eq!(state.score, 300);
        assert_eq!(state.combo.multiplier, 4);
        assert_eq!(state.combo.timer, upgrades.combo_duration);
        assert!(!destroy_ball(&mut state, h, KillCause::Player, &upgrades));
    }

    #[test]
    fn test_combo_capped() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        state.combo.multiplier = MAX_COMBO;
        let h = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, h, KillCause::Missile, &upgrades);
        assert_eq!(state.combo.multiplier, MAX_COMBO);
    }

    #[test]
    fn test_refill_heals_regardless_of_cause() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        state.player.health = 10.0;
        let h = state.spawn(Entity::ball(BallType::Refill, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, h, KillCause::Bomb, &upgrades);
        let expected = 10.0 + state.player.max_health * BallType::Refill.def().heal_fraction;
        assert!((state.player.health - expected).abs() < 1e-3);
    }

    #[test]
    fn test_charge_only_from_player_kills() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let a = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, a, KillCause::Missile, &upgrades);
        assert_eq!(state.ability.charge, 0.0);
        let b = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, b, KillCause::Player, &upgrades);
        assert!(state.ability.charge > 0.0);
    }

    #[test]
    fn test_split_only_on_player_kill_and_not_fragments() {
        let mut state = empty_state();
        let upgrades = Upgrades {
            split_chance: 1.0,
            split_count: 3,
            ..Upgrades::default()
        };
        let h = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, h, KillCause::Player, &upgrades);
        let fragments: Vec<Handle> = state
            .entities
            .iter()
            .filter(|(_, e)| e.as_ball().is_some_and(|b| b.fragment))
            .map(|(h, _)| h)
            .collect();
        assert_eq!(fragments.len(), 3);

        destroy_ball(&mut state, fragments[0], KillCause::Player, &upgrades);
        assert_eq!(live_balls(&state), 2);

        let other = state.spawn(Entity::ball(BallType::Common, Vec2::new(5000.0, 0.0))).unwrap();
        destroy_ball(&mut state, other, KillCause::Missile, &upgrades);
        assert_eq!(live_balls(&state), 2);
    }

    #[test]
    fn test_chain_lightning_visits_each_target_once() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let origin = state.spawn(Entity::ball(BallType::Common, Vec2::ZERO)).unwrap();
        for i in 1..=5 {
            state.spawn(Entity::ball(BallType::Common, Vec2::new(i as f32 * 100.0, 0.0)));
        }
        state.remove(origin);
        let hits = chain_lightning(&mut state, origin, Vec2::ZERO, 3, 150.0, &upgrades);
        assert_eq!(hits, 3);
        assert_eq!(live_balls(&state), 2);
    }

    #[test]
    fn test_chain_stops_out_of_range() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        state.spawn(Entity::ball(BallType::Common, Vec2::new(1000.0, 0.0)));
        let hits = chain_lightning(&mut state, Handle::DANGLING, Vec2::ZERO, 3, 150.0, &upgrades);
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_dead_parent_orphans_projectiles() {
        use crate::sim::spawn::{EnemyShot, spawn_enemy};
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let turret = state.spawn(Entity::ball(BallType::Turret, Vec2::ZERO)).unwrap();
        let shot = spawn_enemy(
            &mut state,
            Vec2::ZERO,
            Vec2::X,
            EnemyShot {
                style: ProjectileStyle::Bullet,
                damage: 5.0,
                parent: Some(turret),
                from_boss: false,
                homing: 2.0,
            },
        )
        .unwrap();
        destroy_ball(&mut state, turret, KillCause::Bomb, &upgrades);
        match &state.entities.get(shot).unwrap().kind {
            EntityKind::Projectile(p) => {
                assert!(p.parent.is_none());
                assert_eq!(p.homing, 0.0);
            }
            _ => panic!("expected projectile"),
        }
    }

    #[test]
    fn test_prism_bursts_shards() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let h = state.spawn(Entity::ball(BallType::Prism, Vec2::ZERO)).unwrap();
        destroy_ball(&mut state, h, KillCause::Fireball, &upgrades);
        assert_eq!(state.count_friendly(ProjectileStyle::Shard), SHARD_COUNT as usize);
    }

    #[test]
    fn test_explode_catches_hazards_too() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        state.spawn(Entity::ball(BallType::Spike, Vec2::new(30.0, 0.0)));
        state.spawn(Entity::ball(BallType::Common, Vec2::new(-30.0, 0.0)));
        state.spawn(Entity::ball(BallType::Common, Vec2::new(900.0, 0.0)));
        explode(&mut state, Vec2::ZERO, 120.0, KillCause::Bomb, &upgrades);
        assert_eq!(live_balls(&state), 1);
    }
}
