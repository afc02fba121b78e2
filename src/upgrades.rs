//! Player upgrade levels
//!
//! Owned by the shop/persistence layer; the simulation only reads it.
//! Every field is flat so the store can keep it as plain key/value data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Flat upgrade configuration, read-only per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Upgrades {
    // === Body ===
    /// Maximum player health
    pub max_health: f32,
    /// Fraction of contact damage absorbed (0.0 - 0.8)
    pub armor: f32,
    /// Fraction of lava heat damage absorbed (0.0 - 1.0)
    pub lava_resistance: f32,

    // === Launch ===
    /// Multiplier on drag-to-velocity conversion
    pub launch_power: f32,
    /// Time scale while a drag gesture is held (0.05 - 1.0)
    pub slow_motion_factor: f32,

    // === Scoring ===
    /// Seconds a combo survives without a new target kill
    pub combo_duration: f32,
    /// Multiplier on ability charge gained per kill
    pub charge_rate: f32,

    // === On-kill procs (player kills only) ===
    /// Chance to get a free upward launch
    pub launch_impulse_chance: f32,
    /// Upward speed granted by the launch impulse proc
    pub launch_impulse_strength: f32,
    /// Chance to start a chain lightning
    pub chain_lightning_chance: f32,
    /// Maximum hops per chain
    pub chain_lightning_jumps: u32,
    /// Maximum hop distance
    pub chain_lightning_range: f32,
    /// Chance to spawn a homing missile
    pub bounce_missile_chance: f32,
    /// Chance to split the ball into fragments
    pub split_chance: f32,
    /// Fragments per split
    pub split_count: u32,

    // === Auto-bounce ===
    pub auto_bounce_unlocked: bool,
    /// Level 0 = base duration and speed
    pub auto_bounce_level: u32,

    // === Passive procs (per second, 0 = disabled) ===
    pub auto_missile_rate: f32,
    /// Live friendly missile cap for the auto-missile proc
    pub auto_missile_max: u32,
    pub auto_bomb_rate: f32,
    pub auto_bomb_range: f32,
    pub auto_fireball_rate: f32,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            max_health: crate::consts::PLAYER_BASE_HEALTH,
            armor: 0.0,
            lava_resistance: 0.0,

            launch_power: 1.0,
            slow_motion_factor: 0.3,

            combo_duration: 2.5,
            charge_rate: 1.0,

            // Procs are bought in the shop; base run has none
            launch_impulse_chance: 0.0,
            launch_impulse_strength: 900.0,
            chain_lightning_chance: 0.0,
            chain_lightning_jumps: 3,
            chain_lightning_range: 320.0,
            bounce_missile_chance: 0.0,
            split_chance: 0.0,
            split_count: 3,

            auto_bounce_unlocked: false,
            auto_bounce_level: 0,

            auto_missile_rate: 0.0,
            auto_missile_max: 4,
            auto_bomb_rate: 0.0,
            auto_bomb_range: 600.0,
            auto_fireball_rate: 0.0,
        }
    }
}

impl Upgrades {
    /// Parse upgrades from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let upgrades: Self = serde_json::from_str(json)?;
        Ok(upgrades.sanitized())
    }

    /// Load upgrades from a JSON file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let upgrades = Self::from_json(&json)?;
        log::info!("Loaded upgrades from {}", path.as_ref().display());
        Ok(upgrades)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp every value into its valid range
    pub fn sanitized(mut self) -> Self {
        self.max_health = self.max_health.max(1.0);
        self.armor = self.armor.clamp(0.0, 0.8);
        self.lava_resistance = self.lava_resistance.clamp(0.0, 1.0);
        self.launch_power = self.launch_power.max(0.0);
        self.slow_motion_factor = self.slow_motion_factor.clamp(0.05, 1.0);
        self.combo_duration = self.combo_duration.max(0.1);
        self.charge_rate = self.charge_rate.max(0.0);
        self.launch_impulse_chance = self.launch_impulse_chance.clamp(0.0, 1.0);
        self.chain_lightning_chance = self.chain_lightning_chance.clamp(0.0, 1.0);
        self.bounce_missile_chance = self.bounce_missile_chance.clamp(0.0, 1.0);
        self.split_chance = self.split_chance.clamp(0.0, 1.0);
        self.chain_lightning_range = self.chain_lightning_range.max(0.0);
        self.auto_missile_rate = self.auto_missile_rate.max(0.0);
        self.auto_bomb_rate = self.auto_bomb_rate.max(0.0);
        self.auto_fireball_rate = self.auto_fireball_rate.max(0.0);
        self
    }

    /// Contact damage after armor
    pub fn contact_damage(&self, raw: f32) -> f32 {
        raw * (1.0 - self.armor)
    }

    /// Lava heat damage after resistance
    pub fn heat_damage(&self, raw: f32) -> f32 {
        raw * (1.0 - self.lava_resistance)
    }

    /// Auto-bounce duration in seconds for the current level
    pub fn auto_bounce_duration(&self) -> f32 {
        4.0 + self.auto_bounce_level as f32
    }

    /// Auto-bounce cruise speed tier for the current level
    pub fn auto_bounce_speed(&self) -> f32 {
        900.0 * (1.0 + 0.15 * self.auto_bounce_level as f32)
    }
}
