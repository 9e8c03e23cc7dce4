//! Floating Damage Numbers
//!
//! Numbers rise above the target and fade out over `float_duration`:
//! - Pop in at 1.5x scale during the first 10%
//! - Fade alpha over the last 30%
//! - Shrink over the last 20%
//!
//! Crits are bigger and gold with a trailing `!`, heals are green with a
//! leading `+`. At capacity the oldest number is evicted.

use bevy::color::LinearRgba;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub const DAMAGE_COLOR: LinearRgba = LinearRgba::WHITE;
pub const CRIT_COLOR: LinearRgba = LinearRgba::new(1.0, 0.8, 0.0, 1.0);
pub const HEAL_COLOR: LinearRgba = LinearRgba::new(0.2, 1.0, 0.3, 1.0);

const STATUS_TEXT_SCALE: f32 = 1.2;
/// Horizontal spawn jitter, world units either side
const SPAWN_JITTER: f32 = 10.0;
const STACK_DRIFT: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageNumberConfig {
    /// Seconds a number stays on screen
    pub float_duration: f32,
    pub float_height: f32,
    pub crit_scale: f32,
    pub max_numbers: usize,
}

impl Default for DamageNumberConfig {
    fn default() -> Self {
        Self {
            float_duration: 1.2,
            float_height: 120.0,
            crit_scale: 1.5,
            max_numbers: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FloatingNumber {
    text: String,
    color: LinearRgba,
    scale: f32,
    spawn_offset_x: f32,
    time_remaining: f32,
    total_time: f32,
}

impl FloatingNumber {
    /// 0 = just spawned, 1 = about to disappear
    fn progress(&self) -> f32 {
        1.0 - self.time_remaining / self.total_time
    }
}

/// Render state of one number for the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct DamageNumberFrame {
    pub text: String,
    pub color: LinearRgba,
    pub alpha: f32,
    pub scale: f32,
    /// Height above the target
    pub rise: f32,
    /// Horizontal offset: spawn jitter plus stacking drift
    pub offset_x: f32,
}

#[derive(Debug)]
pub struct DamageNumbers {
    config: DamageNumberConfig,
    numbers: Vec<FloatingNumber>,
    rng: Xoshiro256PlusPlus,
}

impl Default for DamageNumbers {
    fn default() -> Self {
        Self::new(DamageNumberConfig::default())
    }
}

impl DamageNumbers {
    pub fn new(config: DamageNumberConfig) -> Self {
        Self {
            config,
            numbers: Vec::new(),
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Deterministic jitter for replays and tests
    pub fn with_seed(config: DamageNumberConfig, seed: u64) -> Self {
        Self {
            config,
            numbers: Vec::new(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    pub fn show_damage(&mut self, amount: f32, is_crit: bool, is_healing: bool) {
        if is_healing {
            self.spawn(format!("+{:.0}", amount), HEAL_COLOR, 1.0);
        } else if is_crit {
            self.spawn(format!("{:.0}!", amount), CRIT_COLOR, self.config.crit_scale);
        } else {
            self.spawn(format!("{:.0}", amount), DAMAGE_COLOR, 1.0);
        }
    }

    /// Free text such as "IMMUNE" or "DODGE"
    pub fn show_status_text(&mut self, text: &str, color: LinearRgba) {
        self.spawn(text.to_string(), color, STATUS_TEXT_SCALE);
    }

    fn spawn(&mut self, text: String, color: LinearRgba, scale: f32) {
        if self.config.max_numbers == 0 {
            return;
        }
        while self.numbers.len() >= self.config.max_numbers {
            self.numbers.remove(0);
        }
        let spawn_offset_x = self.rng.gen_range(-SPAWN_JITTER..SPAWN_JITTER);
        self.numbers.push(FloatingNumber {
            text,
            color,
            scale,
            spawn_offset_x,
            time_remaining: self.config.float_duration,
            total_time: self.config.float_duration,
        });
    }

    /// Age every number and drop the expired ones
    pub fn tick(&mut self, dt: f32) {
        for number in &mut self.numbers {
            number.time_remaining -= dt;
        }
        self.numbers.retain(|n| n.time_remaining > 0.0);
    }

    pub fn frames(&self) -> Vec<DamageNumberFrame> {
        self.numbers
            .iter()
            .enumerate()
            .map(|(i, number)| {
                let progress = number.progress();

                let alpha = if progress > 0.7 {
                    (1.0 - progress) / 0.3
                } else {
                    1.0
                };

                let mut scale = number.scale;
                if progress < 0.1 {
                    scale *= 1.0 + (1.0 - progress / 0.1) * 0.5; // pop in
                } else if progress > 0.8 {
                    scale *= (1.0 - progress) / 0.2; // shrink out
                }

                let lane = (i % 3) as f32 - 1.0;
                let drift = (progress * PI).sin() * STACK_DRIFT * lane;

                DamageNumberFrame {
                    text: number.text.clone(),
                    color: number.color,
                    alpha,
                    scale,
                    rise: self.config.float_height * progress,
                    offset_x: number.spawn_offset_x + drift,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn clear(&mut self) {
        self.numbers.clear();
    }
}
