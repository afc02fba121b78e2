//! Data-driven boss balance
//!
//! Rubber-band thresholds, timings and damage numbers for the three boss
//! archetypes. Defaults are the shipped balance; a JSON file can override
//! any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{VIEW_HALF_HEIGHT, VIEW_HALF_WIDTH};
use crate::error::ConfigResult;

/// Shortest interval between repeated shots or strikes (s)
const MIN_INTERVAL: f32 = 0.01;

fn non_negative(values: &mut [&mut f32]) {
    for v in values.iter_mut() {
        **v = v.max(0.0);
    }
}

/// Catch-up tiers keyed by boss-to-player distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubberBand {
    /// Distances at which the next tier kicks in (ascending)
    pub thresholds: [f32; 3],
    /// Movement speed multiplier per tier (tier 0 = within first threshold)
    pub speed_mult: [f32; 4],
    /// Turn-rate multiplier per tier
    pub turn_mult: [f32; 4],
}

impl Default for RubberBand {
    fn default() -> Self {
        Self {
            thresholds: [900.0, 1500.0, 2300.0],
            speed_mult: [1.0, 1.6, 2.4, 3.5],
            turn_mult: [1.0, 1.5, 2.5, 4.0],
        }
    }
}

impl RubberBand {
    /// Tier index (0..=3) for a distance
    pub fn tier(&self, distance: f32) -> usize {
        self.thresholds.iter().filter(|&&t| distance > t).count()
    }

    pub fn speed(&self, distance: f32) -> f32 {
        self.speed_mult[self.tier(distance)]
    }

    pub fn turn(&self, distance: f32) -> f32 {
        self.turn_mult[self.tier(distance)]
    }

    fn sanitize(&mut self) {
        for t in &mut self.thresholds {
            *t = t.max(0.0);
        }
        self.thresholds.sort_by(f32::total_cmp);
        for m in self.speed_mult.iter_mut().chain(self.turn_mult.iter_mut()) {
            *m = m.max(0.0);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeTuning {
    pub health: f32,
    pub radius: f32,
    /// Damage per vulnerable hit before the combo multiplier
    pub hit_damage: f32,
    pub contact_damage: f32,
    pub speed: f32,
    /// Steering rate toward the hover point (1/s), scaled by the rubber band
    pub turn_rate: f32,
    /// Velocity settling rate while spawning; half of it while vulnerable
    pub settle_rate: f32,
    pub spawn_time: f32,
    pub align_time: f32,
    pub hover_height: f32,
    pub vulnerable_time: f32,
    pub attacks_per_vulnerable: u32,
    pub invincibility: f32,
    /// Weights for Shooting, Dashing, LightningStorm, FireNova
    pub attack_weights: [f32; 4],
    pub shooting_time: f32,
    pub shot_interval: f32,
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub dash_speed: f32,
    pub dash_time: f32,
    pub storm_time: f32,
    pub storm_strike_interval: f32,
    pub storm_strike_width: f32,
    pub storm_damage: f32,
    pub nova_count: u32,
    pub nova_speed: f32,
    pub nova_time: f32,
}

impl Default for CubeTuning {
    fn default() -> Self {
        Self {
            health: 30.0,
            radius: 70.0,
            hit_damage: 1.0,
            contact_damage: 20.0,
            speed: 260.0,
            turn_rate: 5.0,
            settle_rate: 4.0,
            spawn_time: 2.0,
            align_time: 1.4,
            hover_height: 260.0,
            vulnerable_time: 3.0,
            attacks_per_vulnerable: 4,
            invincibility: 0.35,
            attack_weights: [3.0, 2.0, 2.0, 2.0],
            shooting_time: 2.0,
            shot_interval: 0.25,
            bullet_speed: 520.0,
            bullet_damage: 10.0,
            dash_speed: 1300.0,
            dash_time: 0.7,
            storm_time: 2.6,
            storm_strike_interval: 0.35,
            storm_strike_width: 40.0,
            storm_damage: 18.0,
            nova_count: 16,
            nova_speed: 380.0,
            nova_time: 1.0,
        }
    }
}

impl CubeTuning {
    fn sanitize(&mut self) {
        self.health = self.health.max(1.0);
        self.radius = self.radius.max(1.0);
        non_negative(&mut [
            &mut self.hit_damage,
            &mut self.contact_damage,
            &mut self.speed,
            &mut self.turn_rate,
            &mut self.settle_rate,
            &mut self.spawn_time,
            &mut self.align_time,
            &mut self.vulnerable_time,
            &mut self.invincibility,
            &mut self.shooting_time,
            &mut self.bullet_speed,
            &mut self.bullet_damage,
            &mut self.dash_speed,
            &mut self.dash_time,
            &mut self.storm_time,
            &mut self.storm_strike_width,
            &mut self.storm_damage,
            &mut self.nova_speed,
            &mut self.nova_time,
        ]);
        for w in &mut self.attack_weights {
            *w = w.max(0.0);
        }
        self.shot_interval = self.shot_interval.max(MIN_INTERVAL);
        self.storm_strike_interval = self.storm_strike_interval.max(MIN_INTERVAL);
        self.nova_count = self.nova_count.max(1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WormTuning {
    pub segments: u32,
    pub segment_health: f32,
    pub head_radius: f32,
    pub body_radius: f32,
    pub follow_distance: f32,
    /// Proportional gain pulling a segment to its follow point (1/s)
    pub follow_gain: f32,
    pub orphan_gravity: f32,
    pub chase_speed: f32,
    pub chase_time: f32,
    pub retreat_speed: f32,
    pub retreat_time: f32,
    pub charge_speed: f32,
    pub charge_time: f32,
    pub wobble_amplitude: f32,
    pub wobble_frequency: f32,
    pub turn_rate: f32,
    pub contact_damage: f32,
    pub invincibility: f32,
    pub hit_damage: f32,
}

impl Default for WormTuning {
    fn default() -> Self {
        Self {
            segments: 12,
            segment_health: 3.0,
            head_radius: 42.0,
            body_radius: 32.0,
            follow_distance: 52.0,
            follow_gain: 12.0,
            orphan_gravity: 900.0,
            chase_speed: 420.0,
            chase_time: 4.5,
            retreat_speed: 650.0,
            retreat_time: 1.6,
            charge_speed: 1250.0,
            charge_time: 1.2,
            wobble_amplitude: 160.0,
            wobble_frequency: 3.0,
            turn_rate: 2.5,
            contact_damage: 22.0,
            invincibility: 0.25,
            hit_damage: 1.0,
        }
    }
}

impl WormTuning {
    fn sanitize(&mut self) {
        self.segments = self.segments.max(2);
        self.segment_health = self.segment_health.max(1.0);
        self.head_radius = self.head_radius.max(1.0);
        self.body_radius = self.body_radius.max(1.0);
        self.follow_distance = self.follow_distance.max(1.0);
        non_negative(&mut [
            &mut self.follow_gain,
            &mut self.orphan_gravity,
            &mut self.chase_speed,
            &mut self.chase_time,
            &mut self.retreat_speed,
            &mut self.retreat_time,
            &mut self.charge_speed,
            &mut self.charge_time,
            &mut self.wobble_amplitude,
            &mut self.wobble_frequency,
            &mut self.turn_rate,
            &mut self.contact_damage,
            &mut self.invincibility,
            &mut self.hit_damage,
        ]);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleTuning {
    pub health: f32,
    pub radius: f32,
    pub hit_damage: f32,
    pub contact_damage: f32,
    pub speed: f32,
    /// Steering rate toward the hover point (1/s), scaled by the rubber band
    pub turn_rate: f32,
    pub invincibility: f32,
    pub pre_fight_time: f32,
    pub vulnerable_time: f32,
    pub wall_telegraph_time: f32,
    pub wall_sweep_time: f32,
    pub wall_thickness: f32,
    pub wall_gap: f32,
    pub wall_damage: f32,
    pub projectile_damage: f32,
    pub arc_volleys: u32,
    pub arc_bullets: u32,
    pub arc_spread: f32,
    pub arc_interval: f32,
    pub bullet_speed: f32,
    pub spiral_time: f32,
    pub spiral_interval: f32,
    pub spiral_arms: u32,
    pub spiral_turn_rate: f32,
    pub lance_speed: f32,
    pub missile_count: u32,
    pub missile_speed: f32,
    pub missile_time: f32,
    pub mine_count: u32,
    pub mine_life: f32,
    pub mine_time: f32,
}

impl Default for TriangleTuning {
    fn default() -> Self {
        Self {
            health: 40.0,
            radius: 80.0,
            hit_damage: 1.0,
            contact_damage: 20.0,
            speed: 220.0,
            turn_rate: 4.0,
            invincibility: 0.35,
            pre_fight_time: 2.5,
            vulnerable_time: 3.5,
            wall_telegraph_time: 1.2,
            wall_sweep_time: 3.5,
            wall_thickness: 60.0,
            wall_gap: 170.0,
            wall_damage: 25.0,
            projectile_damage: 12.0,
            arc_volleys: 3,
            arc_bullets: 7,
            arc_spread: 0.9,
            arc_interval: 0.6,
            bullet_speed: 480.0,
            spiral_time: 3.0,
            spiral_interval: 0.08,
            spiral_arms: 3,
            spiral_turn_rate: 2.6,
            lance_speed: 700.0,
            missile_count: 6,
            missile_speed: 360.0,
            missile_time: 2.0,
            mine_count: 8,
            mine_life: 7.0,
            mine_time: 1.5,
        }
    }
}

impl TriangleTuning {
    fn sanitize(&mut self) {
        self.health = self.health.max(1.0);
        self.radius = self.radius.max(1.0);
        self.wall_thickness = self.wall_thickness.max(1.0);
        // The gap must fit inside the shortest wall
        self.wall_gap = self.wall_gap.clamp(0.0, VIEW_HALF_WIDTH.min(VIEW_HALF_HEIGHT));
        non_negative(&mut [
            &mut self.hit_damage,
            &mut self.contact_damage,
            &mut self.speed,
            &mut self.turn_rate,
            &mut self.invincibility,
            &mut self.pre_fight_time,
            &mut self.vulnerable_time,
            &mut self.wall_telegraph_time,
            &mut self.wall_sweep_time,
            &mut self.wall_damage,
            &mut self.projectile_damage,
            &mut self.arc_spread,
            &mut self.bullet_speed,
            &mut self.spiral_time,
            &mut self.spiral_turn_rate,
            &mut self.lance_speed,
            &mut self.missile_speed,
            &mut self.missile_time,
            &mut self.mine_life,
            &mut self.mine_time,
        ]);
        self.arc_interval = self.arc_interval.max(MIN_INTERVAL);
        self.spiral_interval = self.spiral_interval.max(MIN_INTERVAL);
        self.arc_bullets = self.arc_bullets.max(1);
        self.spiral_arms = self.spiral_arms.max(1);
        self.missile_count = self.missile_count.max(1);
        self.mine_count = self.mine_count.max(1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathTuning {
    /// Real-time seconds the cinematic lasts
    pub duration: f32,
    /// Cosmetic jitter amplitude (px)
    pub jitter: f32,
}

impl Default for DeathTuning {
    fn default() -> Self {
        Self {
            duration: 2.5,
            jitter: 6.0,
        }
    }
}

/// All boss balance in one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub rubber_band: RubberBand,
    pub cube: CubeTuning,
    pub worm: WormTuning,
    pub triangle: TriangleTuning,
    pub death: DeathTuning,
    /// Extra boss health per boss already defeated (fraction)
    pub health_scale_per_defeat: f32,
}

impl Tuning {
    /// Parse tuning from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded boss tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Clamp every value into a range the simulation can run with
    pub fn sanitized(mut self) -> Self {
        self.rubber_band.sanitize();
        self.cube.sanitize();
        self.worm.sanitize();
        self.triangle.sanitize();
        self.death.duration = self.death.duration.max(0.0);
        self.death.jitter = self.death.jitter.max(0.0);
        self.health_scale_per_defeat = self.health_scale_per_defeat.max(0.0);
        self
    }

    /// Health multiplier after `defeats` bosses
    pub fn health_scale(&self, defeats: u32) -> f32 {
        1.0 + self.health_scale_per_defeat.max(0.0) * defeats as f32
    }
}
