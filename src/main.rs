//! Lava Launch headless runner
//!
//! Plays one session with a simple autopilot and logs the outcome. Useful
//! for balance checks and soak-testing the simulation.
//!
//! Usage: `lava-launch [seed] [upgrades.json] [tuning.json]`

use glam::Vec2;

use lava_launch::consts::MAX_DRAG;
use lava_launch::sim::{GameCallbacks, HudSnapshot, StatSnapshot, WorldState, advance};
use lava_launch::{ConfigError, LogAudioSink, Tuning, Upgrades};

/// Simulated frame rate
const FRAME_DT: f32 = 1.0 / 60.0;
/// Give up after this many simulated seconds
const MAX_SESSION_SECS: f32 = 600.0;
/// Autopilot launch cadence (seconds)
const LAUNCH_INTERVAL: f32 = 1.5;

/// Logs host notifications
#[derive(Default)]
struct LogCallbacks {
    final_score: Option<u64>,
    last_stats: Option<StatSnapshot>,
}

impl GameCallbacks for LogCallbacks {
    fn on_game_over(&mut self, score: u64) {
        self.final_score = Some(score);
    }

    fn on_update_stats(&mut self, stats: &StatSnapshot) {
        log::trace!("{:?}", stats);
        self.last_stats = Some(stats.clone());
    }

    fn on_hud_update(&mut self, hud: &HudSnapshot) {
        log::debug!(
            "HUD t={}s charge={:.2} active={} boss={:.0}/{:.0}",
            hud.elapsed_secs,
            hud.ability_charge,
            hud.ability_active,
            hud.boss_health,
            hud.boss_max_health
        );
    }
}

/// Aim at the nearest target above the player, or straight up
fn autopilot_aim(state: &WorldState) -> Vec2 {
    let pos = state.player.pos;
    state
        .entities
        .iter()
        .filter(|(_, e)| e.is_target() && e.pos.y > pos.y)
        .min_by(|a, b| {
            a.1.pos
                .distance_squared(pos)
                .total_cmp(&b.1.pos.distance_squared(pos))
        })
        .map(|(_, e)| (e.pos - pos).normalize_or(Vec2::Y))
        .unwrap_or(Vec2::Y)
}

fn main() -> Result<(), ConfigError> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x1a7a);
    let upgrades = match args.next() {
        Some(path) => Upgrades::load(path)?,
        None => Upgrades::default(),
    };
    let tuning = match args.next() {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    log::info!("Lava Launch (headless) starting with seed {}", seed);
    let mut state = WorldState::with_config(seed, tuning, &upgrades);
    let mut callbacks = LogCallbacks::default();
    let mut audio = LogAudioSink;

    let mut launch_timer = 0.0;
    let mut t = 0.0;
    while t < MAX_SESSION_SECS && !state.game_over {
        launch_timer -= FRAME_DT;
        if launch_timer <= 0.0 {
            launch_timer = LAUNCH_INTERVAL;
            let aim = autopilot_aim(&state);
            state.begin_drag();
            state.release_drag(aim, MAX_DRAG * 0.8);
        }
        state.try_activate_auto_bounce(&upgrades);
        advance(&mut state, FRAME_DT, &upgrades, &mut callbacks, &mut audio);
        t += FRAME_DT;
    }

    match callbacks.final_score {
        Some(score) => log::info!("Run ended after {:.1}s with score {}", t, score),
        None => log::info!("Session limit reached, score {}", state.score),
    }
    if let Some(stats) = &callbacks.last_stats {
        log::info!(
            "Distance {}m, {} kills, bosses defeated {}",
            stats.distance,
            state.kills,
            state.boss.defeated
        );
    }
    Ok(())
}
