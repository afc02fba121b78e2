//! Cube boss
//!
//! Hovers above the player and cycles weighted attacks. After a fixed number
//! of attacks it drops its guard for a short vulnerable window.

use glam::Vec2;
use rand::Rng;

use super::{BossArchetype, BossMeta, BossState, ring_directions, rubber_band, steer};
use crate::audio::AudioCue;
use crate::consts::LAVA_SURFACE_Y;
use crate::sim::arena::Handle;
use crate::sim::entity::{Entity, EntityKind, ProjectileStyle};
use crate::sim::physics::line_circle;
use crate::sim::spawn::{EnemyShot, spawn_enemy, spawn_lightning};
use crate::sim::state::WorldState;
use crate::upgrades::Upgrades;

const COLOR: u32 = 0x00_e5_ff;
/// Attack states in `attack_weights` order
const ATTACKS: [BossState; 4] = [
    BossState::Shooting,
    BossState::Dashing,
    BossState::LightningStorm,
    BossState::FireNova,
];
/// Lightning bolts start this far above the player
const STRIKE_HEIGHT: f32 = 600.0;
const STRIKE_SPREAD: f32 = 220.0;

enum CubeAction {
    Fire(Vec2),
    Strike(f32),
    Nova(f32),
}

/// Returns the boss health, or `None` without room to spawn
pub(super) fn spawn(state: &mut WorldState, pos: Vec2, scale: f32) -> Option<f32> {
    let t = &state.tuning.cube;
    let health = t.health * scale;
    let meta = BossMeta::new(BossArchetype::Cube, BossState::Spawning, t.spawn_time, health);
    let entity = Entity::new(pos, t.radius, EntityKind::Boss(meta)).with_color(COLOR);
    state.spawn(entity).map(|_| health)
}

/// Index into `weights` chosen proportionally to weight
pub(crate) fn weighted_index(rng: &mut impl Rng, weights: &[f32]) -> usize {
    let total: f32 = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 {
        return 0;
    }
    let mut roll = rng.random_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        let w = w.max(0.0);
        if roll < w {
            return i;
        }
        roll -= w;
    }
    weights.len().saturating_sub(1)
}

pub(super) fn update(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let player_pos = state.player.pos;
    let Some(pos) = state.entities.get(h).map(|e| e.pos) else {
        return;
    };
    let (tier, speed_mult, turn_mult) = rubber_band(state, pos);

    let mut telegraph = false;
    let mut action = None;
    {
        let WorldState {
            entities, tuning, rng, ..
        } = &mut *state;
        let t = &tuning.cube;
        let Some(e) = entities.get_mut(h) else {
            return;
        };
        let EntityKind::Boss(meta) = &mut e.kind else {
            return;
        };
        meta.state_timer -= dt;
        let to_player = (player_pos - e.pos).normalize_or(Vec2::NEG_Y);

        if tier > 0 && meta.state.is_preemptable() {
            log::trace!("Cube preempted from {:?} (tier {})", meta.state, tier);
            meta.enter(BossState::Aligning, t.align_time);
        }

        let damping = (1.0 - 4.0 * dt).max(0.0);
        match meta.state {
            BossState::Spawning => {
                e.vel = steer(e.vel, Vec2::ZERO, t.settle_rate, dt);
                if meta.state_timer <= 0.0 {
                    meta.enter(BossState::Aligning, t.align_time);
                }
            }
            BossState::Aligning => {
                let hover = player_pos + Vec2::Y * t.hover_height;
                let desired = ((hover - e.pos) * 2.0).clamp_length_max(t.speed * speed_mult);
                e.vel = steer(e.vel, desired, t.turn_rate * turn_mult, dt);
                if meta.state_timer <= 0.0 {
                    if meta.attack_counter >= t.attacks_per_vulnerable {
                        meta.attack_counter = 0;
                        meta.enter(BossState::IdleVulnerable, t.vulnerable_time);
                    } else {
                        let next = ATTACKS[weighted_index(rng, &t.attack_weights)];
                        let duration = match next {
                            BossState::Shooting => t.shooting_time,
                            BossState::Dashing => t.dash_time,
                            BossState::LightningStorm => t.storm_time,
                            _ => t.nova_time,
                        };
                        meta.enter(next, duration);
                        telegraph = true;
                    }
                }
            }
            BossState::Shooting => {
                e.vel *= damping;
                meta.fire_timer -= dt;
                if meta.fire_timer <= 0.0 {
                    meta.fire_timer = t.shot_interval;
                    action = Some(CubeAction::Fire(to_player));
                }
            }
            BossState::Dashing => {
                if meta.sub_counter == 0 {
                    meta.locked_dir = to_player;
                    meta.sub_counter = 1;
                }
                e.vel = meta.locked_dir * t.dash_speed * speed_mult;
            }
            BossState::LightningStorm => {
                e.vel *= damping;
                meta.fire_timer -= dt;
                if meta.fire_timer <= 0.0 {
                    meta.fire_timer = t.storm_strike_interval;
                    let x = player_pos.x + rng.random_range(-STRIKE_SPREAD..STRIKE_SPREAD);
                    action = Some(CubeAction::Strike(x));
                }
            }
            BossState::FireNova => {
                e.vel *= damping;
                if meta.sub_counter == 0 {
                    meta.sub_counter = 1;
                    action = Some(CubeAction::Nova(rng.random_range(0.0..std::f32::consts::TAU)));
                }
            }
            BossState::IdleVulnerable => {
                e.vel = steer(e.vel, Vec2::new(0.0, -60.0), t.settle_rate * 0.5, dt);
                if meta.state_timer <= 0.0 {
                    meta.enter(BossState::Aligning, t.align_time);
                }
            }
            _ => meta.enter(BossState::Aligning, t.align_time),
        }

        // Attack finished: count it and realign
        if meta.state.is_preemptable() || meta.state == BossState::Dashing {
            if meta.state_timer <= 0.0 {
                if meta.state == BossState::Dashing {
                    e.vel *= 0.3;
                }
                meta.attack_counter += 1;
                meta.enter(BossState::Aligning, t.align_time);
            }
        }

        e.pos += e.vel * dt;
        let spin = if meta.state == BossState::Dashing { 6.0 } else { 1.0 };
        e.rotation += dt * spin;
    }

    if telegraph {
        state.play(AudioCue::BossTelegraph, None);
    }
    let Some(action) = action else {
        return;
    };
    let (bullet_speed, bullet_damage) = (state.tuning.cube.bullet_speed, state.tuning.cube.bullet_damage);
    let radius = state.tuning.cube.radius;
    let shot = |style| EnemyShot {
        style,
        damage: bullet_damage,
        parent: Some(h),
        from_boss: true,
        homing: 0.0,
    };

    match action {
        CubeAction::Fire(dir) => {
            spawn_enemy(state, pos + dir * radius, dir * bullet_speed, shot(ProjectileStyle::Bullet));
            state.play(AudioCue::EnemyShot, None);
        }
        CubeAction::Strike(x) => {
            let top = Vec2::new(x, player_pos.y + STRIKE_HEIGHT);
            let bottom = Vec2::new(x, LAVA_SURFACE_Y);
            spawn_lightning(state, top, bottom);
            state.play(AudioCue::Zap, None);
            let reach = state.player.radius + state.tuning.cube.storm_strike_width * 0.5;
            if line_circle(top, bottom, state.player.pos, reach).is_some() {
                let damage = state.tuning.cube.storm_damage;
                state.hurt_player(damage, upgrades);
            }
        }
        CubeAction::Nova(offset) => {
            let t = &state.tuning.cube;
            let (count, speed) = (t.nova_count, t.nova_speed);
            for dir in ring_directions(count, offset) {
                spawn_enemy(state, pos + dir * radius, dir * speed, shot(ProjectileStyle::Bullet));
            }
            state.play(AudioCue::Explosion, Some(0.6));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::spawn_boss;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn cube_state() -> (WorldState, Handle) {
        let mut state = WorldState::new(5);
        state.entities.clear();
        assert!(spawn_boss(&mut state, BossArchetype::Cube));
        let h = state
            .entities
            .iter()
            .find(|(_, e)| e.boss().is_some())
            .map(|(h, _)| h)
            .unwrap();
        (state, h)
    }

    fn meta(state: &WorldState, h: Handle) -> &BossMeta {
        state.entities.get(h).unwrap().boss().unwrap()
    }

    #[test]
    fn test_weighted_index_respects_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..200 {
            let i = weighted_index(&mut rng, &[0.0, 1.0, 0.0, 2.0]);
            assert!(i == 1 || i == 3);
        }
        assert_eq!(weighted_index(&mut rng, &[0.0, 0.0]), 0);
    }

    #[test]
    fn test_spawning_then_aligning() {
        let (mut state, h) = cube_state();
        let upgrades = Upgrades::default();
        let spawn_time = state.tuning.cube.spawn_time;
        update(&mut state, h, spawn_time + 0.01, &upgrades);
        assert_eq!(meta(&state, h).state, BossState::Aligning);
    }

    #[test]
    fn test_vulnerable_after_attack_quota() {
        let (mut state, h) = cube_state();
        let upgrades = Upgrades::default();
        let quota = state.tuning.cube.attacks_per_vulnerable;
        {
            let m = state.entities.get_mut(h).unwrap().boss_mut().unwrap();
            m.attack_counter = quota;
            m.enter(BossState::Aligning, 0.0);
        }
        // Keep the player close so the rubber band stays out of the way
        state.player.pos = state.entities.get(h).unwrap().pos;
        update(&mut state, h, 0.01, &upgrades);
        assert_eq!(meta(&state, h).state, BossState::IdleVulnerable);
        assert_eq!(meta(&state, h).attack_counter, 0);
    }

    #[test]
    fn test_rubber_band_preempts_stationary_attack() {
        let (mut state, h) = cube_state();
        let upgrades = Upgrades::default();
        state
            .entities
            .get_mut(h)
            .unwrap()
            .boss_mut()
            .unwrap()
            .enter(BossState::Shooting, 5.0);
        let far = state.tuning.rubber_band.thresholds[0] + 100.0;
        state.player.pos = state.entities.get(h).unwrap().pos + Vec2::X * far;
        update(&mut state, h, 0.01, &upgrades);
        assert_eq!(meta(&state, h).state, BossState::Aligning);
    }

    #[test]
    fn test_nova_fires_ring_once() {
        let (mut state, h) = cube_state();
        let upgrades = Upgrades::default();
        state.player.pos = state.entities.get(h).unwrap().pos + Vec2::X * 50.0;
        state
            .entities
            .get_mut(h)
            .unwrap()
            .boss_mut()
            .unwrap()
            .enter(BossState::FireNova, 1.0);
        update(&mut state, h, 0.01, &upgrades);
        update(&mut state, h, 0.01, &upgrades);
        let bullets = state
            .entities
            .iter()
            .filter(|(_, e)| matches!(&e.kind, EntityKind::Projectile(p) if p.from_boss))
            .count();
        assert_eq!(bullets, state.tuning.cube.nova_count as usize);
    }

    #[test]
    fn test_rubber_band_sharpens_turning() {
        let upgrades = Upgrades::default();
        let aligning_speed = |offset_x: f32| {
            let (mut state, h) = cube_state();
            state.tuning.rubber_band.speed_mult = [1.0; 4];
            let hover = state.tuning.cube.hover_height;
            let e = state.entities.get_mut(h).unwrap();
            e.vel = Vec2::ZERO;
            e.boss_mut().unwrap().enter(BossState::Aligning, 10.0);
            state.player.pos = state.entities.get(h).unwrap().pos - Vec2::new(offset_x, hover);
            update(&mut state, h, 0.05, &upgrades);
            state.entities.get(h).unwrap().vel.length()
        };
        let near = aligning_speed(500.0);
        let far = aligning_speed(3000.0);
        assert!(far > near * 1.5, "near {near} far {far}");
    }
}
