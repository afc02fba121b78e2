//! Static ball catalog
//!
//! Every ball on the field references one of these definitions by type.
//! Definitions are compile-time constants and never change during a run.

use serde::Serialize;

/// Ball types, in spawn-table priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BallType {
    /// Common target
    Common,
    /// Rare target, big points and coins
    Gold,
    /// Partial health refill
    Refill,
    /// Tier-1 hazard
    Spike,
    /// Tier-2 hazard
    Magma,
    /// Enemy that shoots at the player
    Turret,
    /// Enemy that homes toward the player
    Drifter,
    /// Enemy that patrols side to side
    Bouncer,
    /// Special: bursts into friendly shards
    Prism,
    /// Jackpot: huge points and full heal
    Jackpot,
}

/// Extra behavior when a ball is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialEffect {
    None,
    /// Radial burst of friendly shards
    ShardBurst,
}

/// Read-only per-type properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BallDef {
    pub radius: f32,
    pub mass: f32,
    pub bounciness: f32,
    pub color: u32,
    pub glow_color: u32,
    pub points: u64,
    pub coins: u32,
    /// Fraction of max health restored on destruction
    pub heal_fraction: f32,
    /// Contact damage dealt to the player
    pub damage: f32,
    /// Counts toward combo
    pub is_target: bool,
    /// Hurts and repels the player instead of breaking
    pub is_hazard: bool,
    pub is_enemy: bool,
    /// May split into fragments on a player kill
    pub splittable: bool,
    /// Rare items get an auto-bounce targeting bonus
    pub is_rare: bool,
    pub effect: SpecialEffect,
}

const fn target(radius: f32, color: u32, points: u64, coins: u32) -> BallDef {
    BallDef {
        radius,
        mass: 0.25,
        bounciness: 0.6,
        color,
        glow_color: color,
        points,
        coins,
        heal_fraction: 0.0,
        damage: 0.0,
        is_target: true,
        is_hazard: false,
        is_enemy: false,
        splittable: true,
        is_rare: false,
        effect: SpecialEffect::None,
    }
}

const fn hazard(radius: f32, color: u32, damage: f32, bounciness: f32) -> BallDef {
    BallDef {
        radius,
        mass: 8.0,
        bounciness,
        color,
        glow_color: 0xff_40_20,
        points: 0,
        coins: 0,
        heal_fraction: 0.0,
        damage,
        is_target: false,
        is_hazard: true,
        is_enemy: false,
        splittable: false,
        is_rare: false,
        effect: SpecialEffect::None,
    }
}

const fn enemy(radius: f32, color: u32, points: u64, damage: f32) -> BallDef {
    BallDef {
        radius,
        mass: 1.5,
        bounciness: 0.7,
        color,
        glow_color: 0xff_00_60,
        points,
        coins: 2,
        heal_fraction: 0.0,
        damage,
        is_target: true,
        is_hazard: false,
        is_enemy: true,
        splittable: false,
        is_rare: false,
        effect: SpecialEffect::None,
    }
}

const COMMON: BallDef = target(22.0, 0x4f_c3_f7, 100, 1);
const GOLD: BallDef = BallDef {
    is_rare: true,
    glow_color: 0xff_f1_76,
    ..target(26.0, 0xff_d7_00, 500, 10)
};
const REFILL: BallDef = BallDef {
    heal_fraction: 0.35,
    splittable: false,
    ..target(20.0, 0x66_bb_6a, 50, 0)
};
const SPIKE: BallDef = hazard(26.0, 0x9e_9e_9e, 15.0, 0.8);
const MAGMA: BallDef = hazard(34.0, 0xff_57_22, 30.0, 1.0);
const TURRET: BallDef = enemy(28.0, 0xe5_39_35, 300, 0.0);
const DRIFTER: BallDef = enemy(24.0, 0xab_47_bc, 250, 12.0);
const BOUNCER: BallDef = enemy(26.0, 0xff_70_43, 250, 8.0);
const PRISM: BallDef = BallDef {
    is_rare: true,
    effect: SpecialEffect::ShardBurst,
    splittable: false,
    ..target(24.0, 0xe1_f5_fe, 400, 5)
};
const JACKPOT: BallDef = BallDef {
    is_rare: true,
    heal_fraction: 1.0,
    splittable: false,
    glow_color: 0xff_ff_ff,
    ..target(30.0, 0xff_ab_00, 2500, 50)
};

/// Cumulative spawn table (type, cumulative probability)
pub const SPAWN_TABLE: [(BallType, f32); 10] = [
    (BallType::Common, 0.52),
    (BallType::Gold, 0.58),
    (BallType::Refill, 0.63),
    (BallType::Spike, 0.73),
    (BallType::Magma, 0.79),
    (BallType::Turret, 0.84),
    (BallType::Drifter, 0.89),
    (BallType::Bouncer, 0.94),
    (BallType::Prism, 0.98),
    (BallType::Jackpot, 1.0),
];

impl BallType {
    /// Static definition for this type
    pub fn def(self) -> &'static BallDef {
        match self {
            BallType::Common => &COMMON,
            BallType::Gold => &GOLD,
            BallType::Refill => &REFILL,
            BallType::Spike => &SPIKE,
            BallType::Magma => &MAGMA,
            BallType::Turret => &TURRET,
            BallType::Drifter => &DRIFTER,
            BallType::Bouncer => &BOUNCER,
            BallType::Prism => &PRISM,
            BallType::Jackpot => &JACKPOT,
        }
    }

    /// Pick a type from a uniform roll in `[0, 1)`
    pub fn from_roll(roll: f32) -> Self {
        SPAWN_TABLE
            .iter()
            .find(|(_, cumulative)| roll < *cumulative)
            .map(|(t, _)| *t)
            .unwrap_or(BallType::Common)
    }

    /// Types allowed in the starting safe zone
    pub fn is_safe(self) -> bool {
        let def = self.def();
        !def.is_hazard && !def.is_enemy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_table_is_monotonic_and_complete() {
        let mut last = 0.0;
        for (_, cumulative) in SPAWN_TABLE {
            assert!(cumulative > last);
            last = cumulative;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_from_roll_priority_order() {
        assert_eq!(BallType::from_roll(0.0), BallType::Common);
        assert_eq!(BallType::from_roll(0.55), BallType::Gold);
        assert_eq!(BallType::from_roll(0.70), BallType::Spike);
        assert_eq!(BallType::from_roll(0.999), BallType::Jackpot);
    }

    #[test]
    fn test_enemies_never_split() {
        for (t, _) in SPAWN_TABLE {
            let def = t.def();
            if def.is_enemy {
                assert!(!def.splittable);
                assert!(def.is_target);
            }
            if def.is_hazard {
                assert!(!def.is_target);
            }
        }
    }
}
