//! Triangle boss
//!
//! Runs a fixed attack rotation with a vulnerable window after every attack:
//! closing walls, arc barrage, spiral lances, missile storm, mine field.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::{FRAC_PI_6, PI, TAU};

use super::{BossArchetype, BossMeta, BossState, purge_walls, ring_directions, rubber_band, steer};
use crate::audio::AudioCue;
use crate::consts::{VIEW_HALF_HEIGHT, VIEW_HALF_WIDTH};
use crate::sim::arena::Handle;
use crate::sim::entity::{Entity, EntityKind, ProjectileStyle};
use crate::sim::spawn::{EnemyShot, spawn_enemy, spawn_wall};
use crate::sim::state::WorldState;
use crate::unit_from_angle;

const COLOR: u32 = 0xff_40_81;
/// Attack order, indexed by `attack_counter % 5`
pub const ROTATION: [BossState; 5] = [
    BossState::ClosingWalls,
    BossState::ArcBarrage,
    BossState::SpiralLances,
    BossState::MissileStorm,
    BossState::MineField,
];
/// Hover offset above the player between attacks
const HOVER_OFFSET: f32 = 300.0;
/// Fraction of the half-view each wall sweeps across
const WALL_TRAVEL: f32 = 0.75;
const MINE_RING_MIN: f32 = 260.0;
const MINE_RING_MAX: f32 = 380.0;
const MISSILE_HOMING: f32 = 2.0;

enum TriangleAction {
    SpawnWalls(Vec2),
    ArmWalls,
    PurgeWalls,
    Arc(Vec2),
    Spiral(f32),
    Missiles,
    Mines,
}

pub(super) fn spawn(state: &mut WorldState, pos: Vec2, scale: f32) -> Option<f32> {
    let t = &state.tuning.triangle;
    let health = t.health * scale;
    let meta = BossMeta::new(BossArchetype::Triangle, BossState::PreFight, t.pre_fight_time, health);
    let entity = Entity::new(pos, t.radius, EntityKind::Boss(meta)).with_color(COLOR);
    state.spawn(entity).map(|_| health)
}

pub(super) fn update(state: &mut WorldState, h: Handle, dt: f32) {
    let player_pos = state.player.pos;
    let Some(pos) = state.entities.get(h).map(|e| e.pos) else {
        return;
    };
    let (tier, speed_mult, turn_mult) = rubber_band(state, pos);

    let mut telegraph = false;
    let mut action = None;
    {
        let WorldState {
            entities, tuning, ..
        } = &mut *state;
        let t = &tuning.triangle;
        let Some(e) = entities.get_mut(h) else {
            return;
        };
        let EntityKind::Boss(meta) = &mut e.kind else {
            return;
        };
        meta.state_timer -= dt;
        let to_player = (player_pos - e.pos).normalize_or(Vec2::NEG_Y);

        if tier > 0 && meta.state.is_preemptable() {
            log::trace!("Triangle preempted from {:?} (tier {})", meta.state, tier);
            if meta.state == BossState::ClosingWalls {
                action = Some(TriangleAction::PurgeWalls);
            }
            meta.enter(BossState::Aligning, 1.0);
        }

        let damping = (1.0 - 3.0 * dt).max(0.0);
        let mut finished = false;
        match meta.state {
            BossState::PreFight | BossState::Aligning | BossState::IdleVulnerable => {
                let desired = if meta.state == BossState::IdleVulnerable {
                    Vec2::new(0.0, -40.0)
                } else {
                    let hover = player_pos + Vec2::Y * HOVER_OFFSET;
                    ((hover - e.pos) * 2.0).clamp_length_max(t.speed * speed_mult)
                };
                e.vel = steer(e.vel, desired, t.turn_rate * turn_mult, dt);
                if meta.state_timer <= 0.0 {
                    let next = ROTATION[meta.attack_counter as usize % ROTATION.len()];
                    let duration = match next {
                        BossState::ClosingWalls => t.wall_telegraph_time + t.wall_sweep_time,
                        BossState::ArcBarrage => t.arc_interval * t.arc_volleys as f32,
                        BossState::SpiralLances => t.spiral_time,
                        BossState::MissileStorm => t.missile_time,
                        _ => t.mine_time,
                    };
                    meta.enter(next, duration);
                    telegraph = true;
                    action = match next {
                        BossState::ClosingWalls => Some(TriangleAction::SpawnWalls(player_pos)),
                        BossState::MissileStorm => Some(TriangleAction::Missiles),
                        BossState::MineField => Some(TriangleAction::Mines),
                        _ => None,
                    };
                }
            }
            BossState::ClosingWalls => {
                e.vel *= damping;
                if meta.sub_counter == 0 && meta.state_timer <= t.wall_sweep_time {
                    meta.sub_counter = 1;
                    action = Some(TriangleAction::ArmWalls);
                }
                if meta.state_timer <= 0.0 {
                    action = Some(TriangleAction::PurgeWalls);
                    finished = true;
                }
            }
            BossState::ArcBarrage => {
                e.vel *= damping;
                meta.fire_timer -= dt;
                if meta.fire_timer <= 0.0 && meta.sub_counter < t.arc_volleys {
                    meta.fire_timer = t.arc_interval;
                    meta.sub_counter += 1;
                    action = Some(TriangleAction::Arc(to_player));
                }
                finished = meta.state_timer <= 0.0;
            }
            BossState::SpiralLances => {
                e.vel *= damping;
                meta.clock += t.spiral_turn_rate * dt;
                meta.fire_timer -= dt;
                if meta.fire_timer <= 0.0 {
                    meta.fire_timer = t.spiral_interval;
                    action = Some(TriangleAction::Spiral(meta.clock));
                }
                finished = meta.state_timer <= 0.0;
            }
            BossState::MissileStorm | BossState::MineField => {
                e.vel *= damping;
                finished = meta.state_timer <= 0.0;
            }
            _ => meta.enter(BossState::Aligning, 1.0),
        }

        if finished {
            meta.attack_counter += 1;
            meta.enter(BossState::IdleVulnerable, t.vulnerable_time);
        }

        e.pos += e.vel * dt;
        e.rotation += dt * 0.8;
    }

    if telegraph {
        state.play(AudioCue::BossTelegraph, None);
    }
    if let Some(action) = action {
        apply(state, h, pos, action);
    }
}

fn apply(state: &mut WorldState, h: Handle, pos: Vec2, action: TriangleAction) {
    let t = state.tuning.triangle.clone();
    let shot = |style| EnemyShot {
        style,
        damage: t.projectile_damage,
        parent: Some(h),
        from_boss: true,
        homing: 0.0,
    };

    match action {
        TriangleAction::SpawnWalls(center) => spawn_closing_walls(state, h, center),
        TriangleAction::ArmWalls => {
            for (_, e) in state.entities.iter_mut() {
                if let EntityKind::Wall(w) = &mut e.kind {
                    if w.boss == Some(h) {
                        w.armed = true;
                    }
                }
            }
            state.add_shake(0.3);
        }
        TriangleAction::PurgeWalls => purge_walls(state, h),
        TriangleAction::Arc(aim) => {
            let base = aim.y.atan2(aim.x);
            let n = t.arc_bullets.max(1);
            for i in 0..n {
                let frac = if n > 1 { i as f32 / (n - 1) as f32 - 0.5 } else { 0.0 };
                let dir = unit_from_angle(base + t.arc_spread * frac);
                spawn_enemy(state, pos + dir * t.radius, dir * t.bullet_speed, shot(ProjectileStyle::Bullet));
            }
            state.play(AudioCue::EnemyShot, None);
        }
        TriangleAction::Spiral(angle) => {
            for dir in ring_directions(t.spiral_arms, angle) {
                spawn_enemy(state, pos + dir * t.radius, dir * t.lance_speed, shot(ProjectileStyle::Lance));
            }
        }
        TriangleAction::Missiles => {
            let n = t.missile_count.max(1);
            for i in 0..n {
                // Fan upward, then home in
                let frac = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
                let dir = unit_from_angle(FRAC_PI_6 + (PI - 2.0 * FRAC_PI_6) * frac);
                let missile = EnemyShot {
                    homing: MISSILE_HOMING,
                    ..shot(ProjectileStyle::EnemyMissile)
                };
                spawn_enemy(state, pos + dir * t.radius, dir * t.missile_speed, missile);
            }
            state.play(AudioCue::MissileLaunch, None);
        }
        TriangleAction::Mines => {
            let center = state.player.pos;
            let n = t.mine_count.max(1);
            for i in 0..n {
                let angle = TAU * i as f32 / n as f32 + state.rng.random_range(-0.2..0.2);
                let dist = state.rng.random_range(MINE_RING_MIN..MINE_RING_MAX);
                let at = center + unit_from_angle(angle) * dist;
                if let Some(mine) = spawn_enemy(state, at, Vec2::ZERO, shot(ProjectileStyle::Mine)) {
                    if let Some(e) = state.entities.get_mut(mine) {
                        e.life = t.mine_life;
                        e.max_life = t.mine_life;
                    }
                }
            }
        }
    }
}

/// Split a wall along its long axis, leaving a gap at `offset` from its center
fn split_wall(center: Vec2, half: Vec2, gap: f32, offset: f32) -> [(Vec2, Vec2); 2] {
    let along_x = half.x >= half.y;
    let (axis, long) = if along_x { (Vec2::X, half.x) } else { (Vec2::Y, half.y) };
    let lo_end = offset - gap * 0.5;
    let hi_start = offset + gap * 0.5;
    let lo_half = (lo_end + long) * 0.5;
    let hi_half = (long - hi_start) * 0.5;
    let piece = |mid: f32, half_len: f32| {
        let h = if along_x {
            Vec2::new(half_len, half.y)
        } else {
            Vec2::new(half.x, half_len)
        };
        (center + axis * mid, h)
    };
    [
        piece(-long + lo_half, lo_half),
        piece(hi_start + hi_half, hi_half),
    ]
}

/// Four walls at the view edges that sweep inward; one has an escape gap
fn spawn_closing_walls(state: &mut WorldState, h: Handle, center: Vec2) {
    let t = &state.tuning.triangle;
    let (thick, gap, damage, sweep) = (t.wall_thickness * 0.5, t.wall_gap, t.wall_damage, t.wall_sweep_time.max(0.1));
    let speed_x = VIEW_HALF_WIDTH * WALL_TRAVEL / sweep;
    let speed_y = VIEW_HALF_HEIGHT * WALL_TRAVEL / sweep;

    let walls = [
        (Vec2::new(center.x - VIEW_HALF_WIDTH, center.y), Vec2::new(thick, VIEW_HALF_HEIGHT), Vec2::X * speed_x),
        (Vec2::new(center.x + VIEW_HALF_WIDTH, center.y), Vec2::new(thick, VIEW_HALF_HEIGHT), Vec2::NEG_X * speed_x),
        (Vec2::new(center.x, center.y - VIEW_HALF_HEIGHT), Vec2::new(VIEW_HALF_WIDTH, thick), Vec2::Y * speed_y),
        (Vec2::new(center.x, center.y + VIEW_HALF_HEIGHT), Vec2::new(VIEW_HALF_WIDTH, thick), Vec2::NEG_Y * speed_y),
    ];
    let gap_side = state.rng.random_range(0..walls.len());

    for (i, (wall_center, half, vel)) in walls.into_iter().enumerate() {
        let pieces = if i == gap_side {
            let long = half.x.max(half.y);
            let limit = (long - gap).max(0.0);
            let offset = if limit > 0.0 {
                state.rng.random_range(-limit..limit)
            } else {
                0.0
            };
            split_wall(wall_center, half, gap, offset).to_vec()
        } else {
            vec![(wall_center, half)]
        };
        for (c, hs) in pieces {
            if let Some(wall) = spawn_wall(state, c, hs, Some(h), damage) {
                if let Some(e) = state.entities.get_mut(wall) {
                    e.vel = vel;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::spawn_boss;

    fn triangle_state() -> (WorldState, Handle) {
        let mut state = WorldState::new(8);
        state.entities.clear();
        assert!(spawn_boss(&mut state, BossArchetype::Triangle));
        let h = state
            .entities
            .iter()
            .find(|(_, e)| e.boss().is_some())
            .map(|(h, _)| h)
            .unwrap();
        // Stay close so the rubber band never interferes
        state.player.pos = state.entities.get(h).unwrap().pos + Vec2::new(200.0, 0.0);
        (state, h)
    }

    fn boss_state(state: &WorldState, h: Handle) -> BossState {
        state.entities.get(h).unwrap().boss().unwrap().state
    }

    fn walls(state: &WorldState) -> Vec<(Vec2, Vec2, bool)> {
        state
            .entities
            .iter()
            .filter_map(|(_, e)| match &e.kind {
                EntityKind::Wall(w) => Some((e.pos, w.half_size, w.armed)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_split_wall_leaves_gap() {
        let [a, b] = split_wall(Vec2::ZERO, Vec2::new(100.0, 10.0), 40.0, 20.0);
        // Pieces span [-100, 0] and [40, 100]
        assert!((a.0.x - (-50.0)).abs() < 1e-4 && (a.1.x - 50.0).abs() < 1e-4);
        assert!((b.0.x - 70.0).abs() < 1e-4 && (b.1.x - 30.0).abs() < 1e-4);
        assert_eq!(a.1.y, 10.0);
    }

    #[test]
    fn test_prefight_opens_with_walls() {
        let (mut state, h) = triangle_state();
        let pre = state.tuning.triangle.pre_fight_time;
        update(&mut state, h, pre + 0.01);
        assert_eq!(boss_state(&state, h), BossState::ClosingWalls);
        let spawned = walls(&state);
        assert_eq!(spawned.len(), 5);
        assert!(spawned.iter().all(|w| !w.2));
    }

    #[test]
    fn test_walls_arm_then_purge_into_vulnerable() {
        let (mut state, h) = triangle_state();
        let t = state.tuning.triangle.clone();
        update(&mut state, h, t.pre_fight_time + 0.01);
        update(&mut state, h, t.wall_telegraph_time + 0.01);
        assert!(walls(&state).iter().all(|w| w.2));
        update(&mut state, h, t.wall_sweep_time);
        assert!(walls(&state).is_empty());
        assert_eq!(boss_state(&state, h), BossState::IdleVulnerable);
    }

    #[test]
    fn test_rotation_after_vulnerable_window() {
        let (mut state, h) = triangle_state();
        let t = state.tuning.triangle.clone();
        {
            let meta = state.entities.get_mut(h).unwrap().boss_mut().unwrap();
            meta.attack_counter = 1;
            meta.enter(BossState::IdleVulnerable, 0.0);
        }
        update(&mut state, h, 0.01);
        assert_eq!(boss_state(&state, h), BossState::ArcBarrage);

        // Every volley fires before the barrage ends
        let mut elapsed = 0.0;
        while boss_state(&state, h) == BossState::ArcBarrage && elapsed < 10.0 {
            update(&mut state, h, 0.02);
            elapsed += 0.02;
        }
        let bullets = state
            .entities
            .iter()
            .filter(|(_, e)| matches!(&e.kind, EntityKind::Projectile(p) if p.style == ProjectileStyle::Bullet))
            .count();
        assert_eq!(bullets, (t.arc_volleys * t.arc_bullets) as usize);
        assert_eq!(boss_state(&state, h), BossState::IdleVulnerable);
    }

    #[test]
    fn test_mine_field_surrounds_player() {
        let (mut state, h) = triangle_state();
        {
            let meta = state.entities.get_mut(h).unwrap().boss_mut().unwrap();
            meta.attack_counter = 4;
            meta.enter(BossState::IdleVulnerable, 0.0);
        }
        update(&mut state, h, 0.01);
        let player = state.player.pos;
        let mines: Vec<f32> = state
            .entities
            .iter()
            .filter(|(_, e)| matches!(&e.kind, EntityKind::Projectile(p) if p.style == ProjectileStyle::Mine))
            .map(|(_, e)| e.pos.distance(player))
            .collect();
        assert_eq!(mines.len(), state.tuning.triangle.mine_count as usize);
        assert!(mines.iter().all(|&d| (MINE_RING_MIN..MINE_RING_MAX).contains(&d)));
    }
}
