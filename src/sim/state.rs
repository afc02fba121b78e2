//! World state and core simulation types
//!
//! Everything one play session mutates lives in `WorldState`. A new session
//! builds a fresh one; there is no partial reset.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::ability::{AutoBounce, PassiveProcs};
use super::arena::{Arena, Handle};
use super::boss::BossDirector;
use super::entity::{Entity, EntityKind};
use super::hud::HudSnapshot;
use crate::audio::{AudioCue, QueuedCue};
use crate::consts::*;
use crate::tuning::Tuning;
use crate::upgrades::Upgrades;

/// Seconds of contact-damage immunity after being hurt
pub const HURT_COOLDOWN: f32 = 0.5;

/// The player body
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub mass: f32,
    pub on_ground: bool,
    /// Contact-damage immunity remaining
    pub hurt_timer: f32,
}

impl Player {
    pub fn new(pos: Vec2, max_health: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            health: max_health,
            max_health,
            mass: PLAYER_MASS,
            on_ground: false,
            hurt_timer: 0.0,
        }
    }

    /// Subtract health, clamped to `[0, max_health]`
    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).clamp(0.0, self.max_health);
    }

    /// Add health, clamped to `[0, max_health]`
    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).clamp(0.0, self.max_health);
    }

    /// Follow the configured max health without exceeding it
    pub fn sync_max_health(&mut self, max_health: f32) {
        self.max_health = max_health.max(1.0);
        self.health = self.health.clamp(0.0, self.max_health);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Camera {
    pub pos: Vec2,
    /// Screen shake intensity (0-1)
    pub shake: f32,
}

/// Drag gesture state, reduced from raw pointer input by the platform layer
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputGesture {
    /// A drag is being held (slow motion)
    pub dragging: bool,
    /// Current drag vector (launch preview)
    pub drag: Vec2,
    /// Launch released but not yet applied (direction * magnitude)
    pub pending_launch: Option<Vec2>,
}

/// Static axis-aligned ledge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Platform {
    pub min: Vec2,
    pub size: Vec2,
}

impl Platform {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }
}

/// Cosmetic bubble rising off the lava, recycled in place
#[derive(Debug, Clone, Serialize)]
pub struct LavaParticle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
}

impl LavaParticle {
    pub fn spawn(rng: &mut Pcg32, center_x: f32) -> Self {
        let mut p = Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            life: 0.0,
            max_life: 0.0,
            size: 0.0,
        };
        p.reset(rng, center_x);
        // Stagger the initial pool so it doesn't pulse in sync
        p.life *= rng.random::<f32>();
        p
    }

    /// Re-emit this particle near `center_x`
    pub fn reset(&mut self, rng: &mut Pcg32, center_x: f32) {
        let spread = VIEW_HALF_WIDTH * 1.5;
        self.pos = Vec2::new(
            center_x + rng.random_range(-spread..spread),
            LAVA_SURFACE_Y - rng.random_range(0.0..20.0),
        );
        self.vel = Vec2::new(rng.random_range(-20.0..20.0), rng.random_range(40.0..120.0));
        self.max_life = rng.random_range(0.8..2.0);
        self.life = self.max_life;
        self.size = rng.random_range(2.0..6.0);
    }
}

/// Score multiplier that decays without new target kills
#[derive(Debug, Clone, Serialize)]
pub struct Combo {
    pub multiplier: u32,
    /// Seconds until the multiplier resets
    pub timer: f32,
}

impl Default for Combo {
    fn default() -> Self {
        Self {
            multiplier: 1,
            timer: 0.0,
        }
    }
}

/// Complete world state for one play session
#[derive(Debug, Clone, Serialize)]
pub struct WorldState {
    /// Run seed
    pub seed: u64,
    #[serde(skip)]
    pub rng: Pcg32,
    pub player: Player,
    pub camera: Camera,
    pub input: InputGesture,
    pub entities: Arena<Entity>,
    pub platforms: Vec<Platform>,
    pub lava: Vec<LavaParticle>,
    pub combo: Combo,
    pub boss: BossDirector,
    pub ability: AutoBounce,
    pub procs: PassiveProcs,
    pub score: u64,
    pub coins_earned: u32,
    pub kills: u32,
    /// Game-time seconds survived
    pub elapsed: f32,
    /// Smoothed time scale
    pub time_scale: f32,
    /// Pinned time scale while a boss death cinematic plays
    pub death_time_scale: Option<f32>,
    /// Game-time step used by the last tick
    pub last_dt_game: f32,
    /// Furthest generated chunk boundaries
    pub next_right_x: f32,
    pub next_left_x: f32,
    /// Furthest horizontal distance reached from the origin
    pub max_distance: f32,
    pub game_over: bool,
    #[serde(skip)]
    pub tuning: Tuning,
    #[serde(skip)]
    pub(crate) sounds: Vec<QueuedCue>,
    #[serde(skip)]
    pub(crate) last_hud: Option<HudSnapshot>,
    #[serde(skip)]
    pub(crate) scratch: Vec<Handle>,
}

impl WorldState {
    /// New session with default tuning and base upgrades
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Tuning::default(), &Upgrades::default())
    }

    /// New session with explicit balance and upgrades
    pub fn with_config(seed: u64, tuning: Tuning, upgrades: &Upgrades) -> Self {
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: Player::new(Vec2::ZERO, upgrades.max_health),
            camera: Camera::default(),
            input: InputGesture::default(),
            entities: Arena::with_capacity(MAX_ENTITIES),
            platforms: Vec::new(),
            lava: Vec::with_capacity(LAVA_PARTICLE_COUNT),
            combo: Combo::default(),
            boss: BossDirector::default(),
            ability: AutoBounce::default(),
            procs: PassiveProcs::default(),
            score: 0,
            coins_earned: 0,
            kills: 0,
            elapsed: 0.0,
            time_scale: 1.0,
            death_time_scale: None,
            last_dt_game: 0.0,
            next_right_x: 0.0,
            next_left_x: 0.0,
            max_distance: 0.0,
            game_over: false,
            tuning: tuning.sanitized(),
            sounds: Vec::new(),
            last_hud: None,
            scratch: Vec::with_capacity(MAX_ENTITIES),
        };

        super::generation::init_world(&mut state);
        log::info!("Session started with seed {}", seed);
        state
    }

    /// Discard everything and start a new session
    pub fn reset(&mut self, seed: u64, upgrades: &Upgrades) {
        let tuning = std::mem::take(&mut self.tuning);
        *self = Self::with_config(seed, tuning, upgrades);
    }

    // -- Input --

    pub fn begin_drag(&mut self) {
        self.input.dragging = true;
        self.input.drag = Vec2::ZERO;
    }

    pub fn update_drag(&mut self, drag: Vec2) {
        if self.input.dragging {
            self.input.drag = drag;
        }
    }

    /// Release the drag; the launch impulse is applied on the next tick
    pub fn release_drag(&mut self, direction: Vec2, magnitude: f32) {
        self.input.dragging = false;
        self.input.drag = Vec2::ZERO;
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO || !magnitude.is_finite() || magnitude <= 0.0 {
            return;
        }
        self.input.pending_launch = Some(dir * magnitude.min(MAX_DRAG));
    }

    /// Cancel a drag without launching
    pub fn cancel_drag(&mut self) {
        self.input.dragging = false;
        self.input.drag = Vec2::ZERO;
    }

    // -- Spawning --

    /// True if `n` more entities fit under the soft cap
    #[inline]
    pub fn has_room(&self, n: usize) -> bool {
        self.entities.len() + n <= MAX_ENTITIES
    }

    /// Insert an entity unless the soft cap is reached
    pub fn spawn(&mut self, entity: Entity) -> Option<Handle> {
        if !self.has_room(1) {
            return None;
        }
        let handle = self.entities.insert(entity);
        if let Some(slot) = self.entities.get_mut(handle) {
            slot.id = handle;
        }
        Some(handle)
    }

    /// Schedule an entity for end-of-tick removal
    #[inline]
    pub fn remove(&mut self, handle: Handle) -> bool {
        self.entities.mark_for_removal(handle)
    }

    // -- Effects --

    /// Queue a sound cue for the end-of-tick flush
    pub fn play(&mut self, cue: AudioCue, intensity: Option<f32>) {
        self.sounds.push(QueuedCue { cue, intensity });
    }

    pub fn add_shake(&mut self, amount: f32) {
        self.camera.shake = (self.camera.shake + amount).min(1.0);
    }

    /// Contact damage with armor and a short immunity window
    pub fn hurt_player(&mut self, raw: f32, upgrades: &Upgrades) -> bool {
        if self.player.hurt_timer > 0.0 || raw <= 0.0 {
            return false;
        }
        let amount = upgrades.contact_damage(raw);
        self.player.apply_damage(amount);
        self.player.hurt_timer = HURT_COOLDOWN;
        self.play(AudioCue::Hurt, Some((amount / 30.0).min(1.0)));
        self.add_shake(0.3);
        true
    }

    // -- Queries --

    /// Nearest live target ball within `range` of `from`, skipping `exclude`
    pub fn nearest_target(&self, from: Vec2, range: f32, exclude: &[Handle]) -> Option<Handle> {
        let range_sq = range * range;
        self.entities
            .iter()
            .filter(|(h, e)| e.is_target() && !exclude.contains(h))
            .map(|(h, e)| (h, e.pos.distance_squared(from)))
            .filter(|&(_, d)| d <= range_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| h)
    }

    /// First live target ball overlapping the circle
    pub fn target_hit(&self, pos: Vec2, radius: f32) -> Option<Handle> {
        self.entities
            .iter()
            .find(|(_, e)| {
                e.is_target() && super::physics::circles_overlap(pos, radius, e.pos, e.radius)
            })
            .map(|(h, _)| h)
    }

    /// Live friendly projectiles of a style
    pub fn count_friendly(&self, style: super::entity::ProjectileStyle) -> usize {
        self.entities
            .iter()
            .filter(|(_, e)| {
                matches!(&e.kind, EntityKind::Projectile(p) if p.friendly && p.style == style)
            })
            .count()
    }

    /// Horizontal distance reached, in meters
    pub fn distance_m(&self) -> u32 {
        (self.max_distance / 10.0) as u32
    }
}
