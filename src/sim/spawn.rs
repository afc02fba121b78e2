//! Entity factories
//!
//! Every helper goes through `WorldState::spawn`, so all of them silently
//! do nothing once the population cap is reached.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::arena::Handle;
use super::entity::{
    BombData, Entity, EntityKind, ParticleData, ParticleStyle, ProjectileData, ProjectileStyle,
    Trail, WallData,
};
use super::state::WorldState;
use crate::unit_from_angle;

pub const SPARK_COLOR: u32 = 0xff_c1_07;
pub const LIGHTNING_COLOR: u32 = 0x80_d8_ff;
pub const TEXT_COLOR: u32 = 0xff_ff_ff;

/// Radial burst of short-lived particles
pub fn spawn_burst(state: &mut WorldState, pos: Vec2, count: usize, speed: f32, color: u32, style: ParticleStyle) {
    let falls = matches!(style, ParticleStyle::Debris);
    for _ in 0..count {
        if !state.has_room(1) {
            return;
        }
        let angle = state.rng.random_range(0.0..TAU);
        let s = speed * state.rng.random_range(0.3..1.0);
        let life = state.rng.random_range(0.3..0.8);
        let radius = state.rng.random_range(2.0..5.0);
        let particle = Entity::new(
            pos,
            radius,
            EntityKind::Particle(ParticleData {
                style: style.clone(),
                falls,
            }),
        )
        .with_vel(unit_from_angle(angle) * s)
        .with_color(color)
        .with_life(life);
        state.spawn(particle);
    }
}

/// Expanding ring
pub fn spawn_shockwave(state: &mut WorldState, pos: Vec2, max_radius: f32, color: u32) {
    let ring = Entity::new(
        pos,
        0.0,
        EntityKind::Particle(ParticleData {
            style: ParticleStyle::Shockwave { max_radius },
            falls: false,
        }),
    )
    .with_color(color)
    .with_life(0.5);
    state.spawn(ring);
}

/// Rising score/status text
pub fn spawn_text(state: &mut WorldState, pos: Vec2, text: String, color: u32) {
    let label = Entity::new(
        pos,
        0.0,
        EntityKind::Particle(ParticleData {
            style: ParticleStyle::FloatingText { text },
            falls: false,
        }),
    )
    .with_color(color)
    .with_life(0.9);
    state.spawn(label);
}

/// Instant bolt between two points (visual only)
pub fn spawn_lightning(state: &mut WorldState, from: Vec2, to: Vec2) {
    let bolt = Entity::new(
        from,
        0.0,
        EntityKind::Particle(ParticleData {
            style: ParticleStyle::Lightning { to },
            falls: false,
        }),
    )
    .with_color(LIGHTNING_COLOR)
    .with_life(0.25);
    state.spawn(bolt);
}

/// Player-owned projectile
pub fn spawn_friendly(
    state: &mut WorldState,
    pos: Vec2,
    vel: Vec2,
    style: ProjectileStyle,
    target: Option<Handle>,
) -> Option<Handle> {
    let (radius, color, life, homing) = match style {
        ProjectileStyle::Missile => (8.0, 0xff_ee_58, 4.0, 6.0),
        ProjectileStyle::Fireball => (12.0, 0xff_6d_00, 3.0, 1.5),
        _ => (6.0, 0xe1_f5_fe, 1.2, 0.0),
    };
    let projectile = Entity::new(
        pos,
        radius,
        EntityKind::Projectile(ProjectileData {
            friendly: true,
            style,
            damage: 1.0,
            target,
            parent: None,
            from_boss: false,
            homing,
            trail: Trail::default(),
        }),
    )
    .with_vel(vel)
    .with_color(color)
    .with_life(life);
    state.spawn(projectile)
}

/// Hostile projectile aimed at the player
pub struct EnemyShot {
    pub style: ProjectileStyle,
    pub damage: f32,
    pub parent: Option<Handle>,
    pub from_boss: bool,
    pub homing: f32,
}

pub fn spawn_enemy(state: &mut WorldState, pos: Vec2, vel: Vec2, shot: EnemyShot) -> Option<Handle> {
    let (radius, color, life) = match shot.style {
        ProjectileStyle::Lance => (6.0, 0xf4_43_36, 2.5),
        ProjectileStyle::Mine => (14.0, 0xd5_00_f9, 7.0),
        ProjectileStyle::EnemyMissile => (10.0, 0xff_17_44, 5.0),
        _ => (8.0, 0xff_52_52, 4.0),
    };
    let projectile = Entity::new(
        pos,
        radius,
        EntityKind::Projectile(ProjectileData {
            friendly: false,
            style: shot.style,
            damage: shot.damage,
            target: None,
            parent: shot.parent,
            from_boss: shot.from_boss,
            homing: shot.homing,
            trail: Trail::default(),
        }),
    )
    .with_vel(vel)
    .with_color(color)
    .with_life(life);
    state.spawn(projectile)
}

pub fn spawn_bomb(state: &mut WorldState, pos: Vec2, vel: Vec2, fuse: f32, blast_radius: f32) -> Option<Handle> {
    let bomb = Entity::new(pos, 10.0, EntityKind::Bomb(BombData { fuse, blast_radius }))
        .with_vel(vel)
        .with_color(0x42_42_42);
    state.spawn(bomb)
}

/// Axis-aligned wall centered on `center`
pub fn spawn_wall(
    state: &mut WorldState,
    center: Vec2,
    half_size: Vec2,
    boss: Option<Handle>,
    damage: f32,
) -> Option<Handle> {
    let wall = Entity::new(
        center,
        half_size.length(),
        EntityKind::Wall(WallData {
            half_size,
            boss,
            armed: false,
            damage,
        }),
    )
    .with_color(0xb7_1c_1c);
    state.spawn(wall)
}
