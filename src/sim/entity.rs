//! Entity model
//!
//! One struct for every dynamic object, with the kind-specific payload in a
//! tagged enum. The update pass dispatches on `EntityKind` in a single match.

use glam::Vec2;
use serde::Serialize;

use super::arena::Handle;
use super::boss::BossMeta;
use super::catalog::{BallDef, BallType};
use crate::consts::TRAIL_LENGTH;

/// A ball on the field (target, hazard or enemy)
#[derive(Debug, Clone, Serialize)]
pub struct BallData {
    pub ball_type: BallType,
    /// Spawned by a split; fragments never split again
    pub fragment: bool,
    /// Enemy attack cooldown
    pub fire_timer: f32,
    /// Spawn position (patrol center for enemies)
    pub anchor: Vec2,
    /// Bob/patrol phase
    pub phase: f32,
}

impl BallData {
    pub fn new(ball_type: BallType, anchor: Vec2) -> Self {
        Self {
            ball_type,
            fragment: false,
            fire_timer: 0.0,
            anchor,
            phase: 0.0,
        }
    }

    #[inline]
    pub fn def(&self) -> &'static BallDef {
        self.ball_type.def()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectileStyle {
    /// Friendly homing missile
    Missile,
    /// Friendly fireball; impact starts a chain
    Fireball,
    /// Friendly shard from a prism burst
    Shard,
    /// Enemy bullet
    Bullet,
    /// Fast enemy lance (swept collision)
    Lance,
    /// Stationary enemy mine
    Mine,
    /// Enemy homing missile
    EnemyMissile,
}

/// Fixed-size position history (newest first)
#[derive(Debug, Clone, Serialize)]
pub struct Trail {
    points: [Vec2; TRAIL_LENGTH],
    len: usize,
    head: usize,
}

impl Default for Trail {
    fn default() -> Self {
        Self {
            points: [Vec2::ZERO; TRAIL_LENGTH],
            len: 0,
            head: 0,
        }
    }
}

impl Trail {
    pub fn record(&mut self, pos: Vec2) {
        self.head = (self.head + TRAIL_LENGTH - 1) % TRAIL_LENGTH;
        self.points[self.head] = pos;
        self.len = (self.len + 1).min(TRAIL_LENGTH);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Points from newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.len).map(move |i| self.points[(self.head + i) % TRAIL_LENGTH])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileData {
    pub friendly: bool,
    pub style: ProjectileStyle,
    pub damage: f32,
    /// Homing target (friendly: a ball; enemy homing: unused, aims at player)
    pub target: Option<Handle>,
    /// Entity that fired this projectile
    pub parent: Option<Handle>,
    /// Fired by a boss (purged when the boss dies)
    pub from_boss: bool,
    /// Homing turn rate (0 = straight)
    pub homing: f32,
    pub trail: Trail,
}

#[derive(Debug, Clone, Serialize)]
pub struct BombData {
    pub fuse: f32,
    pub blast_radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub enum ParticleStyle {
    Spark,
    Debris,
    Shockwave { max_radius: f32 },
    FloatingText { text: String },
    Lightning { to: Vec2 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleData {
    pub style: ParticleStyle,
    /// Affected by gravity
    pub falls: bool,
}

/// Axis-aligned wall (pos is the center)
#[derive(Debug, Clone, Serialize)]
pub struct WallData {
    pub half_size: Vec2,
    /// Owning boss, if any
    pub boss: Option<Handle>,
    /// Telegraphing walls are visible but harmless
    pub armed: bool,
    pub damage: f32,
}

#[derive(Debug, Clone, Serialize)]
pub enum EntityKind {
    Ball(BallData),
    Projectile(ProjectileData),
    Bomb(BombData),
    Particle(ParticleData),
    Wall(WallData),
    Boss(BossMeta),
}

#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: Handle,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    /// Seconds remaining (infinite for balls, walls and bosses)
    pub life: f32,
    pub max_life: f32,
    pub rotation: f32,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(pos: Vec2, radius: f32, kind: EntityKind) -> Self {
        Self {
            id: Handle::DANGLING,
            pos,
            vel: Vec2::ZERO,
            radius,
            color: 0xff_ff_ff,
            life: f32::INFINITY,
            max_life: f32::INFINITY,
            rotation: 0.0,
            kind,
        }
    }

    // -- Builder pattern --

    pub fn with_vel(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_life(mut self, life: f32) -> Self {
        self.life = life;
        self.max_life = life;
        self
    }

    /// A ball of the given type at `pos`
    pub fn ball(ball_type: BallType, pos: Vec2) -> Self {
        let def = ball_type.def();
        Self::new(pos, def.radius, EntityKind::Ball(BallData::new(ball_type, pos)))
            .with_color(def.color)
    }

    /// Bosses and walls are never culled by distance
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, EntityKind::Boss(_) | EntityKind::Wall(_))
    }

    pub fn as_ball(&self) -> Option<&BallData> {
        match &self.kind {
            EntityKind::Ball(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_ball_mut(&mut self) -> Option<&mut BallData> {
        match &mut self.kind {
            EntityKind::Ball(b) => Some(b),
            _ => None,
        }
    }

    pub fn ball_def(&self) -> Option<&'static BallDef> {
        self.as_ball().map(BallData::def)
    }

    pub fn boss(&self) -> Option<&BossMeta> {
        match &self.kind {
            EntityKind::Boss(m) => Some(m),
            _ => None,
        }
    }

    pub fn boss_mut(&mut self) -> Option<&mut BossMeta> {
        match &mut self.kind {
            EntityKind::Boss(m) => Some(m),
            _ => None,
        }
    }

    /// Live target ball (breakable, combo-counting)
    pub fn is_target(&self) -> bool {
        self.ball_def().is_some_and(|d| d.is_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_newest_first_and_bounded() {
        let mut trail = Trail::default();
        for i in 0..(TRAIL_LENGTH + 5) {
            trail.record(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(trail.len(), TRAIL_LENGTH);
        let points: Vec<Vec2> = trail.iter().collect();
        assert_eq!(points[0].x, (TRAIL_LENGTH + 4) as f32);
        assert_eq!(points[TRAIL_LENGTH - 1].x, 5.0);
    }

    #[test]
    fn test_ball_constructor_uses_def() {
        let e = Entity::ball(BallType::Gold, Vec2::new(10.0, 20.0));
        assert_eq!(e.radius, BallType::Gold.def().radius);
        assert!(e.is_target());
        assert!(!e.is_structural());
    }
}
