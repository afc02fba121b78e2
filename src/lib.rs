//! Lava Launch - an endless-survival launch arcade
//!
//! Core modules:
//! - `sim`: Simulation (physics, generation, entities, bosses, abilities)
//! - `upgrades`: Read-only player upgrade configuration
//! - `tuning`: Data-driven boss balance
//! - `audio`: Named sound cues and the sink they are flushed to

pub mod audio;
pub mod error;
pub mod sim;
pub mod tuning;
pub mod upgrades;

pub use audio::{AudioCue, AudioSink, LogAudioSink, NullAudioSink};
pub use error::ConfigError;
pub use tuning::Tuning;
pub use upgrades::Upgrades;

use glam::Vec2;

/// Game configuration constants (world units are pixels, +y is up)
pub mod consts {
    /// Largest real frame step the simulation will integrate
    pub const MAX_DT: f32 = 0.05;
    /// Time-scale smoothing rate (1/s)
    pub const TIME_SCALE_SMOOTHING: f32 = 10.0;
    /// Time scale pinned during a boss death cinematic
    pub const DEATH_TIME_SCALE: f32 = 0.2;

    /// Player body
    pub const PLAYER_RADIUS: f32 = 18.0;
    pub const PLAYER_MASS: f32 = 1.0;
    pub const PLAYER_BASE_HEALTH: f32 = 100.0;
    pub const GRAVITY: f32 = 1400.0;
    /// Fraction of velocity lost per second to air drag
    pub const AIR_DRAG: f32 = 0.12;
    pub const MAX_PLAYER_SPEED: f32 = 2400.0;
    /// Soft ceiling: the player is pushed back down above this height
    pub const CEILING_Y: f32 = 3000.0;

    /// Drag gesture -> launch velocity
    pub const LAUNCH_SCALE: f32 = 3.0;
    pub const MAX_DRAG: f32 = 400.0;

    /// Lava floor
    pub const LAVA_SURFACE_Y: f32 = 0.0;
    /// Below this height the player takes heat damage
    pub const LAVA_HEAT_HEIGHT: f32 = 120.0;
    /// Falling past this line ends the run
    pub const LAVA_DEATH_Y: f32 = -30.0;
    pub const LAVA_HEAT_DPS: f32 = 30.0;
    /// Constant health drain (survival pressure)
    pub const HEALTH_DECAY_PER_SEC: f32 = 0.5;
    pub const LAVA_PARTICLE_COUNT: usize = 96;

    /// Procedural generation
    pub const CHUNK_WIDTH: f32 = 1200.0;
    pub const GENERATION_BUFFER: f32 = 1600.0;
    pub const ENTITIES_PER_1000PX: f32 = 18.0;
    pub const SPAWN_ATTEMPTS: u32 = 12;
    pub const SPAWN_CLEARANCE: f32 = 36.0;
    pub const SAFE_ZONE_HALF_WIDTH: f32 = 700.0;
    /// Vertical band entities are placed in
    pub const SAFE_BAND_MIN_Y: f32 = 220.0;
    pub const SAFE_BAND_MAX_Y: f32 = 2400.0;

    /// Population control
    pub const MAX_ENTITIES: usize = 1200;
    pub const CULL_RADIUS: f32 = 3200.0;

    /// Scoring
    pub const MAX_COMBO: u32 = 50;
    pub const CHARGE_PER_KILL: f32 = 0.04;

    /// Camera
    pub const CAMERA_FOLLOW_RATE: f32 = 6.0;
    pub const SHAKE_DECAY_RATE: f32 = 6.0;
    /// Visible half-extents used for boss arenas (closing walls)
    pub const VIEW_HALF_WIDTH: f32 = 640.0;
    pub const VIEW_HALF_HEIGHT: f32 = 420.0;

    /// Boss cadence
    pub const BOSS_FIRST_DELAY: f32 = 60.0;
    pub const BOSS_INTERVAL: f32 = 90.0;
    pub const BOSS_DEFEAT_BONUS: u64 = 5000;

    /// Projectile trail history
    pub const TRAIL_LENGTH: usize = 12;
}

/// Fraction to move toward a target under exponential smoothing at `rate` for `dt`
#[inline]
pub fn exp_blend(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Unit vector at `angle` radians
#[inline]
pub fn unit_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Clamp a vector's length to `max`
#[inline]
pub fn cap_speed(vel: Vec2, max: f32) -> Vec2 {
    let speed = vel.length();
    if speed > max {
        vel * (max / speed)
    } else {
        vel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_blend_bounds() {
        assert_eq!(exp_blend(10.0, 0.0), 0.0);
        let f = exp_blend(10.0, 0.016);
        assert!(f > 0.0 && f < 1.0);
        assert!(exp_blend(10.0, 100.0) > 0.999);
    }

    #[test]
    fn test_cap_speed() {
        let v = cap_speed(Vec2::new(300.0, 400.0), 100.0);
        assert!((v.length() - 100.0).abs() < 0.001);
        let slow = Vec2::new(3.0, 4.0);
        assert_eq!(cap_speed(slow, 100.0), slow);
    }
}
