//! Procedural world generation
//!
//! The world is filled one chunk at a time as the player approaches either
//! horizon. Placement is rejection-sampled against platforms and every ball
//! or boss already on the field.

use glam::Vec2;
use rand::Rng;

use super::catalog::BallType;
use super::entity::{Entity, EntityKind};
use super::physics::{circle_rect, circles_overlap};
use super::state::{LavaParticle, Platform, WorldState};
use crate::consts::*;

/// Starting ledge, centered under the spawn point
pub const START_PLATFORM_MIN: Vec2 = Vec2::new(-220.0, 160.0);
pub const START_PLATFORM_SIZE: Vec2 = Vec2::new(440.0, 30.0);

/// Chance a chunk gets a ledge
const LEDGE_CHANCE: f64 = 0.5;
const LEDGE_MIN_WIDTH: f32 = 160.0;
const LEDGE_MAX_WIDTH: f32 = 320.0;
const LEDGE_THICKNESS: f32 = 24.0;

/// Build the starting area: ledge, player, safe zone and lava pool
pub fn init_world(state: &mut WorldState) {
    state.platforms.clear();
    state.platforms.push(Platform::new(START_PLATFORM_MIN, START_PLATFORM_SIZE));

    let top = START_PLATFORM_MIN.y + START_PLATFORM_SIZE.y;
    state.player.pos = Vec2::new(0.0, top + state.player.radius);
    state.player.vel = Vec2::ZERO;
    state.camera.pos = state.player.pos;

    spawn_chunk(state, -SAFE_ZONE_HALF_WIDTH, SAFE_ZONE_HALF_WIDTH, true);
    state.next_left_x = -SAFE_ZONE_HALF_WIDTH;
    state.next_right_x = SAFE_ZONE_HALF_WIDTH;

    state.lava.clear();
    for _ in 0..LAVA_PARTICLE_COUNT {
        let p = LavaParticle::spawn(&mut state.rng, 0.0);
        state.lava.push(p);
    }
}

/// Extend the world by at most one chunk per side when the player nears a horizon
pub fn update_generation(state: &mut WorldState) {
    let x = state.player.pos.x;
    if state.next_right_x < x + GENERATION_BUFFER {
        let start = state.next_right_x;
        spawn_chunk(state, start, start + CHUNK_WIDTH, false);
        state.next_right_x = start + CHUNK_WIDTH;
    }
    if state.next_left_x > x - GENERATION_BUFFER {
        let end = state.next_left_x;
        spawn_chunk(state, end - CHUNK_WIDTH, end, false);
        state.next_left_x = end - CHUNK_WIDTH;
    }
}

/// Populate `[start_x, end_x)` with balls and maybe a ledge
///
/// Returns the number of balls placed.
pub fn spawn_chunk(state: &mut WorldState, start_x: f32, end_x: f32, safe_only: bool) -> usize {
    let width = end_x - start_x;
    if width <= 0.0 {
        return 0;
    }

    if !safe_only && state.rng.random_bool(LEDGE_CHANCE) {
        try_place_ledge(state, start_x, end_x);
    }

    let count = (width / 1000.0 * ENTITIES_PER_1000PX).round() as usize;
    let mut placed = 0;
    for _ in 0..count {
        if !state.has_room(1) {
            log::debug!("Chunk [{:.0}, {:.0}) cut short at population cap", start_x, end_x);
            break;
        }
        let ball_type = roll_type(state, safe_only);
        let radius = ball_type.def().radius;
        let Some(pos) = find_clear_spot(state, start_x, end_x, radius) else {
            continue;
        };

        let mut ball = Entity::ball(ball_type, pos);
        if let EntityKind::Ball(data) = &mut ball.kind {
            data.phase = state.rng.random_range(0.0..std::f32::consts::TAU);
            if ball_type.def().is_enemy {
                data.fire_timer = state.rng.random_range(1.0..2.2);
            }
        }
        if state.spawn(ball).is_some() {
            placed += 1;
        }
    }
    placed
}

fn roll_type(state: &mut WorldState, safe_only: bool) -> BallType {
    let ball_type = BallType::from_roll(state.rng.random());
    if safe_only && !ball_type.is_safe() {
        BallType::Common
    } else {
        ball_type
    }
}

/// Rejection-sample a position inside the spawn band
fn find_clear_spot(state: &mut WorldState, start_x: f32, end_x: f32, radius: f32) -> Option<Vec2> {
    for _ in 0..SPAWN_ATTEMPTS {
        let pos = Vec2::new(
            state.rng.random_range(start_x..end_x),
            state.rng.random_range(SAFE_BAND_MIN_Y..SAFE_BAND_MAX_Y),
        );
        if is_clear(state, pos, radius) {
            return Some(pos);
        }
    }
    None
}

/// True if a circle at `pos` keeps clearance from platforms, balls and bosses
pub fn is_clear(state: &WorldState, pos: Vec2, radius: f32) -> bool {
    let padded = radius + SPAWN_CLEARANCE;
    if state
        .platforms
        .iter()
        .any(|p| circle_rect(pos, padded, p.min, p.size).hit)
    {
        return false;
    }
    !state.entities.iter().any(|(_, e)| {
        matches!(e.kind, EntityKind::Ball(_) | EntityKind::Boss(_))
            && circles_overlap(pos, padded, e.pos, e.radius)
    })
}

fn try_place_ledge(state: &mut WorldState, start_x: f32, end_x: f32) {
    let width = state.rng.random_range(LEDGE_MIN_WIDTH..LEDGE_MAX_WIDTH);
    if end_x - start_x <= width {
        return;
    }
    let min = Vec2::new(
        state.rng.random_range(start_x..end_x - width),
        state.rng.random_range(SAFE_BAND_MIN_Y..(SAFE_BAND_MIN_Y + SAFE_BAND_MAX_Y) * 0.5),
    );
    let size = Vec2::new(width, LEDGE_THICKNESS);

    let blocked = state.entities.iter().any(|(_, e)| {
        matches!(e.kind, EntityKind::Ball(_) | EntityKind::Boss(_))
            && circle_rect(e.pos, e.radius + SPAWN_CLEARANCE, min, size).hit
    });
    if !blocked {
        state.platforms.push(Platform::new(min, size));
    }
}
