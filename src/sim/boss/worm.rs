//! Worm boss
//!
//! A chain of segment entities. Only the head thinks; every other segment
//! follows the one ahead of it at a fixed distance. Any segment can be hit at
//! any time, and killing one relinks its neighbours so the chain stays whole.

use glam::Vec2;
use std::f32::consts::TAU;

use super::{
    BossArchetype, BossMeta, BossState, SegmentLink, SegmentRole, begin_dying, finish_boss,
    rubber_band, steer,
};
use crate::audio::AudioCue;
use crate::sim::arena::Handle;
use crate::sim::entity::{Entity, EntityKind, ParticleStyle};
use crate::sim::spawn::{SPARK_COLOR, spawn_burst};
use crate::sim::state::WorldState;

const HEAD_COLOR: u32 = 0x76_ff_03;
const BODY_COLOR: u32 = 0x33_69_1e;
/// Score for each segment destroyed (before combo)
const SEGMENT_POINTS: u64 = 200;

/// Returns the total worm health, or `None` without room for every segment
pub(super) fn spawn(state: &mut WorldState, pos: Vec2, scale: f32) -> Option<f32> {
    let t = &state.tuning.worm;
    let count = t.segments.max(2) as usize;
    if !state.has_room(count) {
        return None;
    }
    let health = t.segment_health * scale;
    let (head_radius, body_radius, spacing, chase_time) =
        (t.head_radius, t.body_radius, t.follow_distance, t.chase_time);
    // Trail away from the player
    let back = (pos - state.player.pos).normalize_or(Vec2::X);

    let mut handles = Vec::with_capacity(count);
    for i in 0..count {
        let radius = if i == 0 { head_radius } else { body_radius };
        let color = if i == 0 { HEAD_COLOR } else { BODY_COLOR };
        let meta = BossMeta::new(BossArchetype::Worm, BossState::WormChase, chase_time, health);
        let entity = Entity::new(pos + back * spacing * i as f32, radius, EntityKind::Boss(meta))
            .with_color(color);
        handles.push(state.spawn(entity)?);
    }

    for (i, &h) in handles.iter().enumerate() {
        let role = match i {
            0 => SegmentRole::Head,
            i if i + 1 == count => SegmentRole::Tail,
            _ => SegmentRole::Body,
        };
        let link = SegmentLink {
            role,
            prev: i.checked_sub(1).map(|p| handles[p]),
            next: handles.get(i + 1).copied(),
        };
        if let Some(meta) = state.entities.get_mut(h).and_then(Entity::boss_mut) {
            meta.segment = Some(link);
        }
    }
    Some(health * count as f32)
}

pub(super) fn update(state: &mut WorldState, h: Handle, dt: f32) {
    let Some(link) = state
        .entities
        .get(h)
        .and_then(Entity::boss)
        .and_then(|m| m.segment)
    else {
        return;
    };
    match link.role {
        SegmentRole::Head => update_head(state, h, dt),
        SegmentRole::Body | SegmentRole::Tail => update_follower(state, h, link.prev, dt),
    }
}

fn update_head(state: &mut WorldState, h: Handle, dt: f32) {
    let player_pos = state.player.pos;
    let Some(pos) = state.entities.get(h).map(|e| e.pos) else {
        return;
    };
    let (tier, speed_mult, turn_mult) = rubber_band(state, pos);

    let mut telegraph = false;
    {
        let WorldState {
            entities, tuning, ..
        } = &mut *state;
        let t = &tuning.worm;
        let Some(e) = entities.get_mut(h) else {
            return;
        };
        let EntityKind::Boss(meta) = &mut e.kind else {
            return;
        };
        meta.state_timer -= dt;
        meta.clock += dt;
        let to_player = (player_pos - e.pos).normalize_or(Vec2::Y);

        // Falling too far behind cuts a retreat short
        if tier > 0 && meta.state == BossState::WormRetreat {
            meta.enter(BossState::WormChase, t.chase_time);
        }

        let desired = match meta.state {
            BossState::WormChase => {
                let wobble = (meta.clock * t.wobble_frequency * TAU).sin() * t.wobble_amplitude;
                let desired = to_player * t.chase_speed * speed_mult + to_player.perp() * wobble;
                if meta.state_timer <= 0.0 {
                    meta.enter(BossState::WormRetreat, t.retreat_time);
                }
                desired
            }
            BossState::WormRetreat => {
                if meta.state_timer <= 0.0 {
                    meta.enter(BossState::WormCharge, t.charge_time);
                    meta.locked_dir = to_player;
                    telegraph = true;
                }
                -to_player * t.retreat_speed
            }
            BossState::WormCharge => {
                if meta.state_timer <= 0.0 {
                    meta.enter(BossState::WormChase, t.chase_time);
                }
                meta.locked_dir * t.charge_speed * speed_mult
            }
            _ => {
                meta.enter(BossState::WormChase, t.chase_time);
                to_player * t.chase_speed
            }
        };

        e.vel = steer(e.vel, desired, t.turn_rate * turn_mult, dt);
        e.pos += e.vel * dt;
        e.rotation = e.vel.y.atan2(e.vel.x);
    }

    if telegraph {
        state.play(AudioCue::BossTelegraph, None);
    }
}

fn update_follower(state: &mut WorldState, h: Handle, prev: Option<Handle>, dt: f32) {
    let prev_pos = prev.and_then(|p| state.entities.get(p)).map(|e| e.pos);
    let t = &state.tuning.worm;
    let (spacing, gain, gravity) = (t.follow_distance, t.follow_gain, t.orphan_gravity);
    let Some(e) = state.entities.get_mut(h) else {
        return;
    };

    match prev_pos {
        Some(anchor) => {
            let dir = (e.pos - anchor).normalize_or(Vec2::NEG_X);
            let target = anchor + dir * spacing;
            e.vel = (target - e.pos) * gain;
            e.pos += e.vel * dt;
            let facing = anchor - e.pos;
            e.rotation = facing.y.atan2(facing.x);
        }
        None => {
            // Orphaned: fall
            e.vel.y -= gravity * dt;
            e.pos += e.vel * dt;
        }
    }
}

fn segment_mut(state: &mut WorldState, h: Handle) -> Option<&mut SegmentLink> {
    state.entities.get_mut(h)?.boss_mut()?.segment.as_mut()
}

/// Live worm segment handles in slot order
pub fn live_segments(state: &WorldState) -> Vec<Handle> {
    state
        .entities
        .iter()
        .filter(|(_, e)| e.boss().is_some_and(|m| m.segment.is_some()))
        .map(|(h, _)| h)
        .collect()
}

/// Remove a destroyed segment and stitch the chain back together
pub(crate) fn kill_segment(state: &mut WorldState, h: Handle) {
    let Some(e) = state.entities.get(h) else {
        return;
    };
    let pos = e.pos;
    let Some(link) = e.boss().and_then(|m| m.segment) else {
        return;
    };
    state.remove(h);

    if let Some(prev) = link.prev {
        if let Some(seg) = segment_mut(state, prev) {
            seg.next = link.next;
            if link.next.is_none() && seg.role != SegmentRole::Head {
                seg.role = SegmentRole::Tail;
            }
        }
    }
    if let Some(next) = link.next {
        let chase_time = state.tuning.worm.chase_time;
        if let Some(meta) = state.entities.get_mut(next).and_then(Entity::boss_mut) {
            if let Some(seg) = meta.segment.as_mut() {
                seg.prev = link.prev;
                if link.role == SegmentRole::Head {
                    seg.role = SegmentRole::Head;
                }
            }
            if link.role == SegmentRole::Head {
                meta.enter(BossState::WormChase, chase_time);
            }
        }
    }

    state.score += SEGMENT_POINTS * state.combo.multiplier as u64;
    spawn_burst(state, pos, 16, 450.0, SPARK_COLOR, ParticleStyle::Debris);
    state.play(AudioCue::Break, None);

    let remaining = live_segments(state);
    log::debug!("Worm segment destroyed, {} left", remaining.len());
    match remaining.as_slice() {
        [] => finish_boss(state, Some(pos)),
        [last] => begin_dying(state, *last),
        _ => {}
    }
}
