//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - Variable real-time step, clamped and scaled before integration
//! - Seeded RNG only
//! - Stable iteration order (arena slot order)
//! - No rendering or platform dependencies

pub mod ability;
pub mod arena;
pub mod boss;
pub mod catalog;
pub mod destruction;
pub mod dispatch;
pub mod entity;
pub mod generation;
pub mod hud;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;

pub use ability::{AbilityState, AutoBounce};
pub use arena::{Arena, Handle};
pub use boss::{BossArchetype, BossMeta, BossState, SegmentRole};
pub use catalog::{BallDef, BallType};
pub use destruction::{KillCause, destroy_ball};
pub use entity::{Entity, EntityKind, ProjectileStyle};
pub use hud::{GameCallbacks, HudSnapshot, NoopCallbacks, RecordingCallbacks, StatSnapshot};
pub use physics::{CollisionResult, circle_circle, circle_rect, line_circle};
pub use state::{Platform, Player, WorldState};
pub use tick::advance;
