//! Echo Ghosts
//!
//! Client-side display of echoes left where other players died. A ghost bobs,
//! spins slowly and pulses its opacity until its lifetime runs out. Aggressive
//! ghosts hurt a nearby player once per second, helpful ones heal continuously;
//! both scale with `1 - distance / radius`.

use bevy::color::LinearRgba;
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Degrees per second
const SPIN_SPEED: f32 = 30.0;
/// Share of lifetime over which the ghost fades out
const FADE_WINDOW: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EchoKind {
    Lingering,
    Aggressive,
    Helpful,
    Warning,
}

impl EchoKind {
    pub fn color(&self) -> LinearRgba {
        match self {
            Self::Lingering => LinearRgba::new(0.5, 0.5, 0.8, 0.4),  // pale blue
            Self::Aggressive => LinearRgba::new(0.9, 0.2, 0.15, 0.5), // red
            Self::Helpful => LinearRgba::new(0.2, 0.9, 0.4, 0.4),     // green
            Self::Warning => LinearRgba::new(1.0, 0.7, 0.0, 0.5),     // orange
        }
    }

    /// Silhouette scale
    pub fn scale(&self) -> Vec3 {
        match self {
            Self::Aggressive => Vec3::new(1.0, 1.0, 1.8),
            Self::Helpful => Vec3::new(0.7, 0.7, 1.4),
            _ => Vec3::new(0.8, 0.8, 1.6),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lingering => "Lingering",
            Self::Aggressive => "Aggressive",
            Self::Helpful => "Helpful",
            Self::Warning => "Warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EchoEffect {
    Heal(f32),
    Damage(f32),
}

/// Per-frame result of `EchoGhost::tick`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoTick {
    pub expired: bool,
    pub bob_offset: f32,
    pub opacity: f32,
    pub effect: Option<EchoEffect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoGhost {
    pub player_name: String,
    pub kind: EchoKind,
    pub origin: Vec3,
    pub lifetime: f32,
    pub pulse_speed: f32,
    pub bob_height: f32,
    pub bob_speed: f32,
    pub effect_radius: f32,
    pub aggressive_damage: f32,
    pub helpful_heal_per_second: f32,
    time_alive: f32,
    yaw_degrees: f32,
    damage_accumulator: f32,
}

impl EchoGhost {
    pub fn new(player_name: &str, kind: EchoKind, origin: Vec3) -> Self {
        let mut ghost = Self {
            player_name: player_name.to_string(),
            kind,
            origin,
            lifetime: 300.0,
            pulse_speed: 2.0,
            bob_height: 20.0,
            bob_speed: 1.5,
            effect_radius: 300.0,
            aggressive_damage: 15.0,
            helpful_heal_per_second: 5.0,
            time_alive: 0.0,
            yaw_degrees: 0.0,
            damage_accumulator: 0.0,
        };
        match kind {
            EchoKind::Aggressive => ghost.aggressive_damage = 20.0,
            EchoKind::Helpful => ghost.helpful_heal_per_second = 8.0,
            EchoKind::Warning => ghost.pulse_speed = 4.0,
            EchoKind::Lingering => {}
        }
        info!(
            "Echo spawned: {} ({}) at ({:.0}, {:.0}, {:.0})",
            player_name,
            kind.name(),
            origin.x,
            origin.y,
            origin.z
        );
        ghost
    }

    /// Advance the ghost. `player_distance` is `None` when no player is around.
    pub fn tick(&mut self, dt: f32, player_distance: Option<f32>) -> EchoTick {
        self.time_alive += dt;
        if self.is_expired() {
            return EchoTick {
                expired: true,
                bob_offset: 0.0,
                opacity: 0.0,
                effect: None,
            };
        }

        self.yaw_degrees = (self.yaw_degrees + SPIN_SPEED * dt) % 360.0;

        EchoTick {
            expired: false,
            bob_offset: self.bob_offset(),
            opacity: self.opacity(),
            effect: player_distance.and_then(|d| self.apply_effect(dt, d)),
        }
    }

    fn apply_effect(&mut self, dt: f32, distance: f32) -> Option<EchoEffect> {
        if distance > self.effect_radius {
            return None;
        }
        // 1.0 at center, 0.0 at edge
        let strength = 1.0 - distance / self.effect_radius;
        match self.kind {
            EchoKind::Helpful => Some(EchoEffect::Heal(
                self.helpful_heal_per_second * strength * dt,
            )),
            EchoKind::Aggressive => {
                self.damage_accumulator += dt;
                if self.damage_accumulator >= 1.0 {
                    self.damage_accumulator = 0.0;
                    Some(EchoEffect::Damage(self.aggressive_damage * strength))
                } else {
                    None
                }
            }
            EchoKind::Lingering | EchoKind::Warning => None,
        }
    }

    pub fn bob_offset(&self) -> f32 {
        (self.time_alive * self.bob_speed).sin() * self.bob_height
    }

    /// Pulsing `0.3 + 0.2 sin(t * pulse_speed)`, faded over the last 20% of lifetime
    pub fn opacity(&self) -> f32 {
        let mut pulse = 0.3 + 0.2 * (self.time_alive * self.pulse_speed).sin();
        let progress = self.time_alive / self.lifetime;
        if progress > 1.0 - FADE_WINDOW {
            pulse *= ((1.0 - progress) / FADE_WINDOW).max(0.0);
        }
        pulse
    }

    pub fn position(&self) -> Vec3 {
        self.origin + Vec3::Z * self.bob_offset()
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    pub fn time_alive(&self) -> f32 {
        self.time_alive
    }

    pub fn is_expired(&self) -> bool {
        self.time_alive >= self.lifetime
    }
}
