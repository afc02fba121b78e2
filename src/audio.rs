//! Sound cues
//!
//! The simulation never talks to an audio backend directly. Deep code queues
//! cues on the world state; the tick flushes them to an injected sink.

use serde::Serialize;

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AudioCue {
    /// Player launched from a drag
    Launch,
    /// Player bounced off a platform, hazard or wall
    Impact,
    /// A target broke
    Break,
    /// A rare or jackpot target broke
    BreakRare,
    /// Health refill collected
    Heal,
    /// Player took damage
    Hurt,
    /// Chain lightning hop
    Zap,
    /// Missile or fireball fired
    MissileLaunch,
    /// Bomb or mine exploded
    Explosion,
    /// Enemy shot fired
    EnemyShot,
    /// Auto-bounce started
    AbilityStart,
    /// Auto-bounce ended
    AbilityEnd,
    /// Boss entered the arena
    BossRoar,
    /// Boss took a hit
    BossHit,
    /// Boss telegraphing an attack
    BossTelegraph,
    /// Boss death cinematic started
    BossDying,
    /// Boss finally destroyed
    BossDefeated,
    /// Run over
    GameOver,
}

impl AudioCue {
    /// Stable event name for the audio layer
    pub fn name(&self) -> &'static str {
        match self {
            AudioCue::Launch => "launch",
            AudioCue::Impact => "impact",
            AudioCue::Break => "break",
            AudioCue::BreakRare => "break_rare",
            AudioCue::Heal => "heal",
            AudioCue::Hurt => "hurt",
            AudioCue::Zap => "zap",
            AudioCue::MissileLaunch => "missile_launch",
            AudioCue::Explosion => "explosion",
            AudioCue::EnemyShot => "enemy_shot",
            AudioCue::AbilityStart => "ability_start",
            AudioCue::AbilityEnd => "ability_end",
            AudioCue::BossRoar => "boss_roar",
            AudioCue::BossHit => "boss_hit",
            AudioCue::BossTelegraph => "boss_telegraph",
            AudioCue::BossDying => "boss_dying",
            AudioCue::BossDefeated => "boss_defeated",
            AudioCue::GameOver => "game_over",
        }
    }
}

/// A queued cue with optional intensity (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueuedCue {
    pub cue: AudioCue,
    pub intensity: Option<f32>,
}

/// Fire-and-forget audio output
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue, intensity: Option<f32>);
}

/// Discards every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&mut self, _cue: AudioCue, _intensity: Option<f32>) {}
}

/// Logs every cue at debug level (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudioSink;

impl AudioSink for LogAudioSink {
    fn play(&mut self, cue: AudioCue, intensity: Option<f32>) {
        match intensity {
            Some(i) => log::debug!("sfx {} ({:.2})", cue.name(), i),
            None => log::debug!("sfx {}", cue.name()),
        }
    }
}

/// Collects cues in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingAudioSink {
    pub cues: Vec<QueuedCue>,
}

impl AudioSink for RecordingAudioSink {
    fn play(&mut self, cue: AudioCue, intensity: Option<f32>) {
        self.cues.push(QueuedCue { cue, intensity });
    }
}

impl RecordingAudioSink {
    pub fn count(&self, cue: AudioCue) -> usize {
        self.cues.iter().filter(|c| c.cue == cue).count()
    }
}
