//! Simulation tick
//!
//! Core game loop. The host calls `advance` once per rendered frame with the
//! real elapsed time; the step is clamped, scaled for slow motion, and then
//! every subsystem runs in a fixed order.

use glam::Vec2;

use super::ability::{update_auto_bounce, update_combo, update_passive_procs};
use super::boss::update_director;
use super::dispatch::update_entities;
use super::entity::{Entity, EntityKind, ParticleData, ParticleStyle};
use super::generation::update_generation;
use super::hud::{GameCallbacks, HudSnapshot, StatSnapshot};
use super::physics::{circle_rect, static_bounce};
use super::spawn::SPARK_COLOR;
use super::state::WorldState;
use crate::audio::{AudioCue, AudioSink};
use crate::consts::*;
use crate::upgrades::Upgrades;
use crate::{cap_speed, exp_blend};

const PLATFORM_RESTITUTION: f32 = 0.35;
/// Ground friction (1/s) while resting on a ledge
const GROUND_FRICTION: f32 = 6.0;
/// Impacts slower than this are silent
const IMPACT_SOUND_SPEED: f32 = 200.0;
/// Player speed at which trail sparks start
const TRAIL_SPEED: f32 = 400.0;
const MIN_TIME_SCALE: f32 = 0.05;

/// Advance the world by one frame of `dt_real` seconds
pub fn advance(
    state: &mut WorldState,
    dt_real: f32,
    upgrades: &Upgrades,
    callbacks: &mut dyn GameCallbacks,
    audio: &mut dyn AudioSink,
) {
    if state.game_over {
        return;
    }

    let dt_real = if dt_real.is_finite() {
        dt_real.clamp(0.0, MAX_DT)
    } else {
        0.0
    };
    state.player.sync_max_health(upgrades.max_health);
    let dt = update_time_scale(state, dt_real, upgrades);
    state.last_dt_game = dt;

    state.elapsed += dt;
    update_director(state, dt);
    update_generation(state);
    update_combo(state, dt);
    update_passive_procs(state, dt, upgrades);
    update_auto_bounce(state, dt, dt_real, upgrades);

    integrate_player(state, dt, upgrades);
    emit_player_particles(state);
    update_lava(state, dt);
    resolve_platforms(state, dt);

    update_entities(state, dt, dt_real, upgrades);
    apply_environment_damage(state, dt, upgrades);
    state.entities.flush_removals();

    if state.player.pos.y < LAVA_DEATH_Y || state.player.is_dead() {
        state.game_over = true;
        state.player.health = 0.0;
        state.play(AudioCue::GameOver, None);
        log::info!(
            "Game over: score {}, distance {}m, {:.1}s",
            state.score,
            state.distance_m(),
            state.elapsed
        );
        callbacks.on_game_over(state.score);
    } else {
        callbacks.on_update_stats(&StatSnapshot::capture(state));
    }

    let hud = HudSnapshot::capture(state, upgrades);
    if state.last_hud.as_ref().is_none_or(|last| hud.differs_from(last)) {
        callbacks.on_hud_update(&hud);
        state.last_hud = Some(hud);
    }

    update_camera(state, dt_real);

    for queued in state.sounds.drain(..) {
        audio.play(queued.cue, queued.intensity);
    }
}

/// Smooth toward slow motion while dragging; returns the game-time step
fn update_time_scale(state: &mut WorldState, dt_real: f32, upgrades: &Upgrades) -> f32 {
    let target = if state.input.dragging {
        upgrades.slow_motion_factor
    } else {
        1.0
    };
    state.time_scale += (target - state.time_scale) * exp_blend(TIME_SCALE_SMOOTHING, dt_real);
    state.time_scale = state.time_scale.clamp(MIN_TIME_SCALE, 1.0);
    // A boss death pins the scale, bypassing the smoothing
    dt_real * state.death_time_scale.unwrap_or(state.time_scale)
}

fn integrate_player(state: &mut WorldState, dt: f32, upgrades: &Upgrades) {
    if let Some(launch) = state.input.pending_launch.take() {
        state.player.vel = launch * LAUNCH_SCALE * upgrades.launch_power;
        state.player.on_ground = false;
        let intensity = (launch.length() / MAX_DRAG).clamp(0.0, 1.0);
        state.play(AudioCue::Launch, Some(intensity));
    }

    let gravity_on = !state.ability.is_active();
    let player = &mut state.player;
    if gravity_on {
        player.vel.y -= GRAVITY * dt;
    }
    player.vel *= (1.0 - AIR_DRAG * dt).max(0.0);
    player.vel = cap_speed(player.vel, MAX_PLAYER_SPEED);
    player.pos += player.vel * dt;

    if player.pos.y > CEILING_Y {
        player.pos.y = CEILING_Y;
        if player.vel.y > 0.0 {
            player.vel.y *= -0.3;
        }
    }
    player.hurt_timer = (player.hurt_timer - dt).max(0.0);
    player.on_ground = false;
    state.max_distance = state.max_distance.max(state.player.pos.x.abs());
}

/// Speed trail and drag-charge sparks; skipped at the population cap
fn emit_player_particles(state: &mut WorldState) {
    if !state.has_room(1) {
        return;
    }
    let pos = state.player.pos;
    let vel = state.player.vel;
    if vel.length_squared() > TRAIL_SPEED * TRAIL_SPEED {
        let spark = Entity::new(
            pos,
            3.0,
            EntityKind::Particle(ParticleData {
                style: ParticleStyle::Spark,
                falls: false,
            }),
        )
        .with_vel(-vel * 0.1)
        .with_color(SPARK_COLOR)
        .with_life(0.3);
        state.spawn(spark);
    }
    if state.input.dragging && state.input.drag != Vec2::ZERO {
        let charge = (state.input.drag.length() / MAX_DRAG).min(1.0);
        let spark = Entity::new(
            pos - state.input.drag.normalize_or_zero() * state.player.radius,
            2.0 + 3.0 * charge,
            EntityKind::Particle(ParticleData {
                style: ParticleStyle::Spark,
                falls: false,
            }),
        )
        .with_color(0xff_f5_9d)
        .with_life(0.15);
        state.spawn(spark);
    }
}

/// Recycle lava bubbles in place around the camera
fn update_lava(state: &mut WorldState, dt: f32) {
    let WorldState {
        lava, rng, camera, ..
    } = state;
    for p in lava.iter_mut() {
        p.life -= dt;
        p.pos += p.vel * dt;
        if p.life <= 0.0 {
            p.reset(rng, camera.pos.x);
        }
    }
}

fn resolve_platforms(state: &mut WorldState, dt: f32) {
    let mut impact: f32 = 0.0;
    let player = &mut state.player;
    for platform in &state.platforms {
        let contact = circle_rect(player.pos, player.radius, platform.min, platform.size);
        if !contact.hit {
            continue;
        }
        impact = impact.max(-player.vel.dot(contact.normal));
        player.pos += contact.normal * contact.penetration;
        player.vel = static_bounce(player.vel, contact.normal, PLATFORM_RESTITUTION);
        if contact.normal.y > 0.6 {
            player.on_ground = true;
            player.vel.x *= (1.0 - GROUND_FRICTION * dt).max(0.0);
        }
    }
    if impact > IMPACT_SOUND_SPEED {
        state.play(AudioCue::Impact, Some((impact / 1500.0).min(1.0)));
    }
}

/// Lava heat near the surface plus a slow constant drain
fn apply_environment_damage(state: &mut WorldState, dt: f32, upgrades: &Upgrades) {
    let height = state.player.pos.y - LAVA_SURFACE_Y;
    if height < LAVA_HEAT_HEIGHT {
        // Hotter the closer to the surface
        let closeness = (1.0 - height / LAVA_HEAT_HEIGHT).clamp(0.0, 1.0);
        let heat = upgrades.heat_damage(LAVA_HEAT_DPS * (0.5 + closeness) * dt);
        state.player.apply_damage(heat);
    }
    state.player.apply_damage(HEALTH_DECAY_PER_SEC * dt);
}

fn update_camera(state: &mut WorldState, dt_real: f32) {
    let camera = &mut state.camera;
    camera.pos = camera
        .pos
        .lerp(state.player.pos, exp_blend(CAMERA_FOLLOW_RATE, dt_real));
    camera.shake *= (-SHAKE_DECAY_RATE * dt_real).exp();
    if camera.shake < 0.01 {
        camera.shake = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NullAudioSink, RecordingAudioSink};
    use crate::sim::catalog::BallType;
    use crate::sim::hud::{NoopCallbacks, RecordingCallbacks};
    use proptest::prelude::*;

    /// Empty world, no generation, player hovering above the start ledge
    fn quiet_state() -> WorldState {
        let mut state = WorldState::new(42);
        state.entities.clear();
        state.next_right_x = 1e6;
        state.next_left_x = -1e6;
        state.player.pos = Vec2::new(0.0, 100.0);
        state.player.vel = Vec2::ZERO;
        state.platforms.clear();
        state
    }

    fn step(state: &mut WorldState, dt: f32) {
        advance(state, dt, &Upgrades::default(), &mut NoopCallbacks, &mut NullAudioSink);
    }

    #[test]
    fn test_launch_breaks_target_and_scores() {
        let mut state = quiet_state();
        // 50 px apart: not touching until the launch closes the gap
        state.spawn(Entity::ball(BallType::Common, Vec2::new(0.0, 150.0)));
        state.release_drag(Vec2::Y, 300.0);
        step(&mut state, 0.016);
        assert_eq!(state.score, 100);
        assert_eq!(state.combo.multiplier, 2);
    }

    #[test]
    fn test_game_over_fires_once_and_latches() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, LAVA_DEATH_Y - 10.0);
        let mut callbacks = RecordingCallbacks::default();
        let mut audio = RecordingAudioSink::default();
        let upgrades = Upgrades::default();
        advance(&mut state, 0.016, &upgrades, &mut callbacks, &mut audio);
        advance(&mut state, 0.016, &upgrades, &mut callbacks, &mut audio);
        assert!(state.game_over);
        assert_eq!(callbacks.game_overs, vec![state.score]);
        assert!(callbacks.stats.is_empty());
        assert_eq!(audio.count(AudioCue::GameOver), 1);
    }

    #[test]
    fn test_stats_every_tick_hud_only_on_change() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, 1500.0);
        let mut callbacks = RecordingCallbacks::default();
        let upgrades = Upgrades::default();
        for _ in 0..10 {
            advance(&mut state, 0.016, &upgrades, &mut callbacks, &mut NullAudioSink);
        }
        assert_eq!(callbacks.stats.len(), 10);
        assert_eq!(callbacks.huds.len(), 1);
    }

    #[test]
    fn test_drag_slows_time() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, 1500.0);
        state.begin_drag();
        for _ in 0..60 {
            step(&mut state, 0.016);
        }
        let slow = Upgrades::default().slow_motion_factor;
        assert!((state.time_scale - slow).abs() < 0.02);
        assert!(state.last_dt_game < 0.016 * 0.5);
    }

    #[test]
    fn test_boss_death_pins_time_scale() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, 1500.0);
        state.death_time_scale = Some(DEATH_TIME_SCALE);
        step(&mut state, 0.02);
        assert!((state.last_dt_game - 0.02 * DEATH_TIME_SCALE).abs() < 1e-6);
    }

    #[test]
    fn test_lava_heat_hurts_near_surface() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, 40.0);
        let before = state.player.health;
        state.player.vel = Vec2::new(0.0, 50.0);
        step(&mut state, 0.016);
        let heat_loss = before - state.player.health;
        assert!(heat_loss > HEALTH_DECAY_PER_SEC * 0.016 * 2.0);
    }

    #[test]
    fn test_player_lands_on_platform() {
        let mut state = quiet_state();
        state.platforms.push(super::super::state::Platform::new(
            Vec2::new(-100.0, 200.0),
            Vec2::new(200.0, 20.0),
        ));
        state.player.pos = Vec2::new(0.0, 240.0);
        for _ in 0..60 {
            step(&mut state, 0.016);
        }
        assert!(state.player.pos.y >= 220.0 + state.player.radius - 2.0);
        assert!(!state.game_over);
    }

    #[test]
    fn test_gravity_suspended_during_auto_bounce() {
        let mut state = quiet_state();
        state.player.pos = Vec2::new(0.0, 1500.0);
        let upgrades = Upgrades {
            auto_bounce_unlocked: true,
            ..Upgrades::default()
        };
        state.ability.charge = 1.0;
        assert!(state.try_activate_auto_bounce(&upgrades));
        let y = state.player.pos.y;
        advance(&mut state, 0.016, &upgrades, &mut NoopCallbacks, &mut NullAudioSink);
        assert!(state.player.pos.y > y);
    }

    #[test]
    fn test_population_never_exceeds_cap() {
        let mut state = WorldState::new(99);
        let upgrades = Upgrades {
            auto_missile_rate: 20.0,
            auto_missile_max: 50,
            auto_fireball_rate: 5.0,
            ..Upgrades::default()
        };
        for i in 0..600 {
            if i % 40 == 0 {
                state.release_drag(Vec2::new(0.6, 1.0), MAX_DRAG);
            }
            advance(&mut state, 0.05, &upgrades, &mut NoopCallbacks, &mut NullAudioSink);
            assert!(state.entities.len() <= MAX_ENTITIES);
            if state.game_over {
                break;
            }
        }
    }

    #[test]
    fn test_world_state_serializes() {
        let state = WorldState::new(5);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"score\":0"));
    }

    proptest! {
        #[test]
        fn prop_dt_clamped_and_health_bounded(dts in proptest::collection::vec(-1.0f32..1.0, 1..40)) {
            let mut state = WorldState::new(7);
            let upgrades = Upgrades::default();
            for dt in dts {
                advance(&mut state, dt, &upgrades, &mut NoopCallbacks, &mut NullAudioSink);
                prop_assert!(state.last_dt_game >= 0.0 && state.last_dt_game <= MAX_DT);
                prop_assert!(state.player.health >= 0.0);
                prop_assert!(state.player.health <= state.player.max_health);
                if state.game_over {
                    break;
                }
            }
        }
    }
}
