//! Entity update pass
//!
//! One walk over a snapshot of live handles, dispatching on entity kind.
//! Entities spawned during the pass wait until the next tick; entities
//! removed during the pass are skipped when their turn comes.

use glam::Vec2;

use super::arena::Handle;
use super::boss::update_boss;
use super::catalog::BallType;
use super::destruction::{KillCause, chain_lightning, destroy_ball, explode};
use super::entity::{EntityKind, ParticleStyle, ProjectileStyle};
use super::physics::{circle_circle, circle_rect, circles_overlap, elastic_impulse, line_circle, static_bounce};
use super::spawn::{EnemyShot, SPARK_COLOR, spawn_burst, spawn_enemy, spawn_shockwave};
use super::state::WorldState;
use super::ability::BOMB_GRAVITY;
use crate::audio::AudioCue;
use crate::consts::*;
use crate::exp_blend;
use crate::upgrades::Upgrades;

/// Player slower than this gets bitten by contact-damage enemies
pub const ENEMY_KILL_SPEED: f32 = 300.0;
const TURRET_RANGE: f32 = 750.0;
const TURRET_COOLDOWN: f32 = 2.2;
const TURRET_SHOT_SPEED: f32 = 360.0;
const TURRET_SHOT_DAMAGE: f32 = 10.0;
const DRIFTER_RANGE: f32 = 900.0;
const DRIFTER_ACCEL: f32 = 220.0;
const DRIFTER_MAX_SPEED: f32 = 160.0;
const BOUNCER_PATROL: f32 = 180.0;
const BOUNCER_RATE: f32 = 1.2;
/// Per-second velocity loss for free-moving balls (fragments)
const BALL_DRAG: f32 = 2.0;
/// Friendly homing projectiles look this far for a new target
const RETARGET_RANGE: f32 = 900.0;
const MINE_TRIGGER: f32 = 60.0;
const MINE_BLAST: f32 = 110.0;

#[derive(Clone, Copy)]
enum Kind {
    Ball,
    Projectile,
    Bomb,
    Particle,
    Wall,
    Boss,
}

/// Update every entity alive at the start of the pass, culling far-off ones
pub fn update_entities(state: &mut WorldState, dt: f32, dt_real: f32, upgrades: &Upgrades) {
    let mut handles = std::mem::take(&mut state.scratch);
    state.entities.collect_handles(&mut handles);
    let cull_sq = CULL_RADIUS * CULL_RADIUS;

    for &h in &handles {
        let Some(e) = state.entities.get(h) else {
            continue;
        };
        if !e.is_structural() && e.pos.distance_squared(state.player.pos) > cull_sq {
            state.remove(h);
            continue;
        }
        let kind = match e.kind {
            EntityKind::Ball(_) => Kind::Ball,
            EntityKind::Projectile(_) => Kind::Projectile,
            EntityKind::Bomb(_) => Kind::Bomb,
            EntityKind::Particle(_) => Kind::Particle,
            EntityKind::Wall(_) => Kind::Wall,
            EntityKind::Boss(_) => Kind::Boss,
        };
        match kind {
            Kind::Ball => update_ball(state, h, dt, upgrades),
            Kind::Projectile => update_projectile(state, h, dt, upgrades),
            Kind::Bomb => update_bomb(state, h, dt, upgrades),
            Kind::Particle => update_particle(state, h, dt),
            Kind::Wall => update_wall(state, h, dt, upgrades),
            Kind::Boss => update_boss(state, h, dt, dt_real, upgrades),
        }
    }

    handles.clear();
    state.scratch = handles;
}

/// Movement, enemy behavior and player contact for one ball
fn update_ball(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let player_pos = state.player.pos;
    let mut fire = None;
    {
        let Some(e) = state.entities.get_mut(h) else {
            return;
        };
        let pos = e.pos;
        let Some(ball) = e.as_ball_mut() else {
            return;
        };
        let ball_type = ball.ball_type;
        ball.phase += dt;
        let mut vel = e.vel;

        match ball_type {
            BallType::Turret => {
                let Some(ball) = e.as_ball_mut() else {
                    return;
                };
                ball.fire_timer -= dt;
                if ball.fire_timer <= 0.0 && pos.distance(player_pos) < TURRET_RANGE {
                    ball.fire_timer = TURRET_COOLDOWN;
                    fire = Some((player_pos - pos).normalize_or(Vec2::NEG_Y));
                }
            }
            BallType::Drifter => {
                let to_player = player_pos - pos;
                if to_player.length_squared() < DRIFTER_RANGE * DRIFTER_RANGE {
                    vel += to_player.normalize_or_zero() * DRIFTER_ACCEL * dt;
                    vel = crate::cap_speed(vel, DRIFTER_MAX_SPEED);
                } else {
                    vel *= (1.0 - BALL_DRAG * dt).max(0.0);
                }
            }
            BallType::Bouncer => {
                let Some(ball) = e.as_ball_mut() else {
                    return;
                };
                let target_x = ball.anchor.x + (ball.phase * BOUNCER_RATE).sin() * BOUNCER_PATROL;
                vel = Vec2::new((target_x - pos.x) * 4.0, (ball.anchor.y - pos.y) * 4.0);
            }
            _ => vel *= (1.0 - BALL_DRAG * dt).max(0.0),
        }

        e.vel = vel;
        e.pos += vel * dt;
        e.rotation += dt;
    }

    if let Some(dir) = fire {
        let Some(pos) = state.entities.get(h).map(|e| e.pos) else {
            return;
        };
        spawn_enemy(
            state,
            pos,
            dir * TURRET_SHOT_SPEED,
            EnemyShot {
                style: ProjectileStyle::Bullet,
                damage: TURRET_SHOT_DAMAGE,
                parent: Some(h),
                from_boss: false,
                homing: 1.0,
            },
        );
        state.play(AudioCue::EnemyShot, Some(0.4));
    }

    resolve_ball_contact(state, h, upgrades);
}

fn resolve_ball_contact(state: &mut WorldState, h: Handle, upgrades: &Upgrades) {
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let Some(def) = e.ball_def() else {
        return;
    };
    let (ball_pos, ball_vel, ball_radius) = (e.pos, e.vel, e.radius);
    let player = &state.player;
    if !circles_overlap(player.pos, player.radius, ball_pos, ball_radius) {
        return;
    }

    let slow_bite = def.is_enemy && def.damage > 0.0 && player.vel.length() < ENEMY_KILL_SPEED;
    if def.is_hazard || slow_bite {
        let contact = circle_circle(player.pos, player.radius, ball_pos, ball_radius);
        let impact = -state.player.vel.dot(contact.normal);
        state.player.pos += contact.normal * contact.penetration;
        state.player.vel = static_bounce(state.player.vel, contact.normal, def.bounciness) + contact.normal * 120.0;
        state.hurt_player(def.damage, upgrades);
        state.play(AudioCue::Impact, Some((impact / 1000.0).clamp(0.1, 1.0)));
        return;
    }

    if let Some((player_vel, _)) = elastic_impulse(
        state.player.pos,
        state.player.vel,
        state.player.mass,
        ball_pos,
        ball_vel,
        def.mass,
        def.bounciness,
    ) {
        state.player.vel = player_vel;
    }
    destroy_ball(state, h, KillCause::Player, upgrades);
}

fn update_projectile(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let EntityKind::Projectile(p) = &e.kind else {
        return;
    };
    if p.friendly {
        update_friendly(state, h, dt, upgrades);
    } else {
        update_hostile(state, h, dt, upgrades);
    }
}

fn update_friendly(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let EntityKind::Projectile(p) = &e.kind else {
        return;
    };
    let pos = e.pos;
    let (homing, style) = (p.homing, p.style);

    // Keep a live homing target, reacquiring when the old one is gone
    let mut target = p.target.filter(|&t| state.entities.contains(t));
    if homing > 0.0 && target.is_none() {
        target = state.nearest_target(pos, RETARGET_RANGE, &[]);
    }
    let target_pos = target.and_then(|t| state.entities.get(t)).map(|t| t.pos);

    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    e.life -= dt;
    if let EntityKind::Projectile(p) = &mut e.kind {
        p.target = target;
        p.trail.record(e.pos);
    }
    if let Some(tp) = target_pos.filter(|_| homing > 0.0) {
        let speed = e.vel.length().max(200.0);
        let desired = (tp - e.pos).normalize_or(e.vel.normalize_or(Vec2::Y)) * speed;
        e.vel = e.vel.lerp(desired, exp_blend(homing, dt));
    }
    e.pos += e.vel * dt;
    let (new_pos, radius, expired) = (e.pos, e.radius, e.life <= 0.0);

    if expired {
        state.remove(h);
        return;
    }

    let Some(hit) = state.target_hit(new_pos, radius) else {
        return;
    };
    state.remove(h);
    let cause = match style {
        ProjectileStyle::Fireball => KillCause::Fireball,
        ProjectileStyle::Shard => KillCause::Shard,
        _ => KillCause::Missile,
    };
    destroy_ball(state, hit, cause, upgrades);
    match style {
        ProjectileStyle::Fireball => {
            chain_lightning(
                state,
                hit,
                new_pos,
                upgrades.chain_lightning_jumps,
                upgrades.chain_lightning_range,
                upgrades,
            );
        }
        _ => spawn_burst(state, new_pos, 6, 250.0, SPARK_COLOR, ParticleStyle::Spark),
    }
}

fn update_hostile(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let EntityKind::Projectile(p) = &e.kind else {
        return;
    };
    // Homing only while whoever fired it is still alive
    let homing = if p.parent.is_some_and(|parent| state.entities.contains(parent)) {
        p.homing
    } else {
        0.0
    };
    let (style, damage) = (p.style, p.damage);

    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    e.life -= dt;
    let prev = e.pos;
    if homing > 0.0 {
        let speed = e.vel.length();
        let desired = (player_pos - e.pos).normalize_or(Vec2::NEG_Y) * speed;
        e.vel = e.vel.lerp(desired, exp_blend(homing, dt));
    }
    e.pos += e.vel * dt;
    if let EntityKind::Projectile(p) = &mut e.kind {
        p.trail.record(prev);
    }
    let (pos, radius, expired) = (e.pos, e.radius, e.life <= 0.0);

    if expired {
        state.remove(h);
        return;
    }

    let hit = match style {
        ProjectileStyle::Mine => circles_overlap(pos, radius + MINE_TRIGGER, player_pos, player_radius),
        // Lances are fast enough to tunnel, so sweep them
        ProjectileStyle::Lance => line_circle(prev, pos, player_pos, player_radius + radius).is_some(),
        _ => circles_overlap(pos, radius, player_pos, player_radius),
    };
    if !hit {
        return;
    }

    state.remove(h);
    if style == ProjectileStyle::Mine {
        spawn_shockwave(state, pos, MINE_BLAST, 0xd5_00_f9);
        state.play(AudioCue::Explosion, Some(0.7));
    } else {
        spawn_burst(state, pos, 6, 200.0, SPARK_COLOR, ParticleStyle::Spark);
    }
    state.hurt_player(damage, upgrades);
}

fn update_bomb(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    let EntityKind::Bomb(bomb) = &mut e.kind else {
        return;
    };
    bomb.fuse -= dt;
    let (fuse, blast) = (bomb.fuse, bomb.blast_radius);
    e.vel.y -= BOMB_GRAVITY * dt;
    e.pos += e.vel * dt;
    e.rotation += dt * 5.0;
    let (pos, radius) = (e.pos, e.radius);

    if fuse <= 0.0 || state.target_hit(pos, radius).is_some() {
        state.remove(h);
        explode(state, pos, blast, KillCause::Bomb, upgrades);
    }
}

fn update_particle(state: &mut WorldState, h: Handle, dt: f32) {
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    e.life -= dt;
    if e.life <= 0.0 {
        state.remove(h);
        return;
    }
    let EntityKind::Particle(p) = &e.kind else {
        return;
    };
    match &p.style {
        ParticleStyle::Spark | ParticleStyle::Debris => {
            if p.falls {
                e.vel.y -= GRAVITY * 0.4 * dt;
            }
            e.vel *= (1.0 - 1.5 * dt).max(0.0);
            e.pos += e.vel * dt;
        }
        ParticleStyle::Shockwave { max_radius } => {
            e.radius = max_radius * (1.0 - e.life / e.max_life);
        }
        ParticleStyle::FloatingText { .. } => e.pos.y += 60.0 * dt,
        ParticleStyle::Lightning { .. } => {}
    }
}

fn update_wall(state: &mut WorldState, h: Handle, dt: f32, upgrades: &Upgrades) {
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };
    let EntityKind::Wall(w) = &e.kind else {
        return;
    };
    if !w.armed {
        return;
    }
    let (half, damage) = (w.half_size, w.damage);
    e.pos += e.vel * dt;
    let min = e.pos - half;

    let player = &state.player;
    let contact = circle_rect(player.pos, player.radius, min, half * 2.0);
    if !contact.hit {
        return;
    }
    state.player.pos += contact.normal * contact.penetration;
    state.player.vel = static_bounce(state.player.vel, contact.normal, 0.5) + contact.normal * 200.0;
    state.hurt_player(damage, upgrades);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::spawn::{spawn_friendly, spawn_wall};

    fn empty_state() -> WorldState {
        let mut state = WorldState::new(17);
        state.entities.clear();
        state.player.pos = Vec2::new(0.0, 500.0);
        state.player.vel = Vec2::ZERO;
        state
    }

    #[test]
    fn test_far_entities_are_culled_but_bosses_kept() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let far = state
            .spawn(Entity::ball(BallType::Common, Vec2::new(CULL_RADIUS + 500.0, 500.0)))
            .unwrap();
        let near = state.spawn(Entity::ball(BallType::Common, Vec2::new(0.0, 900.0))).unwrap();
        let wall = spawn_wall(&mut state, Vec2::new(-CULL_RADIUS * 2.0, 0.0), Vec2::splat(10.0), None, 5.0).unwrap();
        update_entities(&mut state, 0.016, 0.016, &upgrades);
        state.entities.flush_removals();
        assert!(state.entities.get(far).is_none());
        assert!(state.entities.get(near).is_some());
        assert!(state.entities.get(wall).is_some());
    }

    #[test]
    fn test_hazard_hurts_and_repels() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let spike = state
            .spawn(Entity::ball(BallType::Spike, Vec2::new(0.0, 530.0)))
            .unwrap();
        state.player.vel = Vec2::new(0.0, 400.0);
        update_entities(&mut state, 0.016, 0.016, &upgrades);
        assert!(state.entities.get(spike).is_some());
        assert!(state.player.health < state.player.max_health);
        assert!(state.player.vel.y < 0.0);
    }

    #[test]
    fn test_missile_destroys_target() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let ball = state.spawn(Entity::ball(BallType::Common, Vec2::new(300.0, 500.0))).unwrap();
        spawn_friendly(&mut state, Vec2::new(300.0, 480.0), Vec2::ZERO, ProjectileStyle::Missile, Some(ball));
        update_entities(&mut state, 0.016, 0.016, &upgrades);
        assert!(state.entities.get(ball).is_none());
        assert_eq!(state.score, 100);
    }

    #[test]
    fn test_lance_cannot_tunnel_through_player() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        // Travels 60 px in one step, straight through the player
        spawn_enemy(
            &mut state,
            Vec2::new(-30.0, 500.0),
            Vec2::new(3000.0, 0.0),
            EnemyShot {
                style: ProjectileStyle::Lance,
                damage: 10.0,
                parent: None,
                from_boss: true,
                homing: 0.0,
            },
        );
        update_entities(&mut state, 0.02, 0.02, &upgrades);
        assert!(state.player.health < state.player.max_health);
    }

    #[test]
    fn test_unarmed_wall_is_harmless() {
        let mut state = empty_state();
        let upgrades = Upgrades::default();
        let at = state.player.pos;
        let wall = spawn_wall(&mut state, at, Vec2::splat(40.0), None, 25.0).unwrap();
        update_entities(&mut state, 0.016, 0.016, &upgrades);
        assert_eq!(state.player.health, state.player.max_health);

        if let Some(EntityKind::Wall(w)) = state.entities.get_mut(wall).map(|e| &mut e.kind) {
            w.armed = true;
        }
        update_entities(&mut state, 0.016, 0.016, &upgrades);
        assert!(state.player.health < state.player.max_health);
    }

    #[test]
    fn test_expired_particles_removed() {
        let mut state = empty_state();
        spawn_burst(&mut state, Vec2::new(0.0, 500.0), 5, 100.0, SPARK_COLOR, ParticleStyle::Spark);
        for _ in 0..60 {
            update_entities(&mut state, 0.05, 0.05, &Upgrades::default());
            state.entities.flush_removals();
        }
        assert!(state.entities.is_empty());
    }
}
