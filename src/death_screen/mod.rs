//! Death Screen
//!
//! Shown when the local player dies: fades in over two seconds, summarizes
//! the run and the echo left behind, and unlocks respawn after a cooldown.
//! Returning to the lobby is always allowed.

use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::echo::EchoKind;
use crate::events::{Observers, SubscriptionId};

/// Fade progress per second (two second fade)
const FADE_RATE: f32 = 0.5;

pub const TITLE: &str = "YOU DIED";
pub const TITLE_COLOR: LinearRgba = LinearRgba::new(0.8, 0.1, 0.1, 1.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathScreenConfig {
    /// Seconds before respawn unlocks
    pub respawn_cooldown: f32,
}

impl Default for DeathScreenConfig {
    fn default() -> Self {
        Self {
            respawn_cooldown: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathSummary {
    pub floor_reached: u32,
    pub monsters_slain: u32,
    /// Seconds
    pub time_survived: f32,
    pub echo_kind: EchoKind,
}

impl DeathSummary {
    /// Echo kind from the server's lowercase name. Unknown names read as Warning.
    pub fn echo_kind_from_name(name: &str) -> EchoKind {
        match name {
            "lingering" => EchoKind::Lingering,
            "aggressive" => EchoKind::Aggressive,
            "helpful" => EchoKind::Helpful,
            _ => EchoKind::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathScreenEvent {
    RespawnRequested,
    ReturnToLobby,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeathScreenError {
    #[error("death screen is not showing")]
    NotShowing,
    #[error("respawn available in {remaining:.1}s")]
    OnCooldown { remaining: f32 },
}

pub fn echo_label(kind: EchoKind) -> &'static str {
    match kind {
        EchoKind::Lingering => "Echo Type: Lingering (Blue)",
        EchoKind::Aggressive => "Echo Type: Aggressive (Red)",
        EchoKind::Helpful => "Echo Type: Helpful (Green)",
        EchoKind::Warning => "Echo Type: Warning (Orange)",
    }
}

pub fn echo_label_color(kind: EchoKind) -> LinearRgba {
    match kind {
        EchoKind::Lingering => LinearRgba::new(0.3, 0.5, 1.0, 1.0),
        EchoKind::Aggressive => LinearRgba::new(1.0, 0.2, 0.2, 1.0),
        EchoKind::Helpful => LinearRgba::new(0.2, 1.0, 0.3, 1.0),
        EchoKind::Warning => LinearRgba::new(1.0, 0.6, 0.1, 1.0),
    }
}

/// `Time survived: mm:ss`
pub fn time_survived_label(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0).floor() as u32;
    let secs = (seconds % 60.0).floor() as u32;
    format!("Time survived: {:02}:{:02}", mins, secs)
}

#[derive(Debug, Default)]
pub struct DeathScreen {
    config: DeathScreenConfig,
    summary: Option<DeathSummary>,
    showing: bool,
    cooldown_timer: f32,
    fade_in: f32,
    observers: Observers<DeathScreenEvent>,
}

impl DeathScreen {
    pub fn new(config: DeathScreenConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DeathScreenEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn show(&mut self, summary: DeathSummary) {
        info!(
            "Player died on floor {} after {:.0}s",
            summary.floor_reached, summary.time_survived
        );
        self.summary = Some(summary);
        self.showing = true;
        self.cooldown_timer = self.config.respawn_cooldown;
        self.fade_in = 0.0;
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.showing {
            return;
        }
        if self.fade_in < 1.0 {
            self.fade_in = (self.fade_in + dt * FADE_RATE).min(1.0);
        }
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer = (self.cooldown_timer - dt).max(0.0);
        }
    }

    pub fn respawn(&mut self) -> Result<(), DeathScreenError> {
        if !self.showing {
            return Err(DeathScreenError::NotShowing);
        }
        if self.cooldown_timer > 0.0 {
            return Err(DeathScreenError::OnCooldown {
                remaining: self.cooldown_timer,
            });
        }
        self.showing = false;
        self.observers.notify(&DeathScreenEvent::RespawnRequested);
        Ok(())
    }

    pub fn return_to_lobby(&mut self) -> Result<(), DeathScreenError> {
        if !self.showing {
            return Err(DeathScreenError::NotShowing);
        }
        self.showing = false;
        self.observers.notify(&DeathScreenEvent::ReturnToLobby);
        Ok(())
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn can_respawn(&self) -> bool {
        self.showing && self.cooldown_timer <= 0.0
    }

    pub fn opacity(&self) -> f32 {
        self.fade_in.clamp(0.0, 1.0)
    }

    /// 0 when the cooldown starts, 1 once respawn is available
    pub fn cooldown_progress(&self) -> f32 {
        if self.config.respawn_cooldown <= 0.0 {
            return 1.0;
        }
        (1.0 - self.cooldown_timer / self.config.respawn_cooldown).clamp(0.0, 1.0)
    }

    pub fn summary(&self) -> Option<&DeathSummary> {
        self.summary.as_ref()
    }

    /// Display lines for the current summary
    pub fn lines(&self) -> Vec<String> {
        let Some(summary) = &self.summary else {
            return Vec::new();
        };
        vec![
            TITLE.to_string(),
            format!("Your echo lingers on floor {}...", summary.floor_reached),
            echo_label(summary.echo_kind).to_string(),
            format!("Floor reached: {}", summary.floor_reached),
            format!("Monsters slain: {}", summary.monsters_slain),
            time_survived_label(summary.time_survived),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn summary() -> DeathSummary {
        DeathSummary {
            floor_reached: 14,
            monsters_slain: 87,
            time_survived: 754.9,
            echo_kind: EchoKind::Aggressive,
        }
    }

    #[test]
    fn test_respawn_after_cooldown() {
        let mut screen = DeathScreen::new(DeathScreenConfig::default());
        screen.show(summary());
        assert!(matches!(
            screen.respawn(),
            Err(DeathScreenError::OnCooldown { .. })
        ));
        screen.tick(2.0);
        assert!(!screen.can_respawn());
        screen.tick(1.0);
        assert!(screen.can_respawn());
        screen.respawn().unwrap();
        assert!(!screen.is_showing());
        assert_eq!(screen.respawn(), Err(DeathScreenError::NotShowing));
    }

    #[test]
    fn test_fade_in_takes_two_seconds() {
        let mut screen = DeathScreen::default();
        screen.show(summary());
        assert_eq!(screen.opacity(), 0.0);
        screen.tick(1.0);
        assert!((screen.opacity() - 0.5).abs() < 1e-6);
        screen.tick(5.0);
        assert_eq!(screen.opacity(), 1.0);
    }

    #[test]
    fn test_lobby_always_allowed() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut screen = DeathScreen::default();
        let log = events.clone();
        screen.subscribe(move |e| log.lock().unwrap().push(*e));
        screen.show(summary());
        screen.return_to_lobby().unwrap();
        assert_eq!(*events.lock().unwrap(), vec![DeathScreenEvent::ReturnToLobby]);
    }

    #[test]
    fn test_cooldown_progress() {
        let mut screen = DeathScreen::default();
        screen.show(summary());
        assert_eq!(screen.cooldown_progress(), 0.0);
        screen.tick(1.5);
        assert!((screen.cooldown_progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_labels() {
        assert_eq!(time_survived_label(754.9), "Time survived: 12:34");
        assert_eq!(time_survived_label(5.0), "Time survived: 00:05");
        assert_eq!(echo_label(EchoKind::Helpful), "Echo Type: Helpful (Green)");
        assert_eq!(DeathSummary::echo_kind_from_name("lingering"), EchoKind::Lingering);
        assert_eq!(DeathSummary::echo_kind_from_name("???"), EchoKind::Warning);

        let mut screen = DeathScreen::default();
        screen.show(summary());
        let lines = screen.lines();
        assert_eq!(lines[0], "YOU DIED");
        assert_eq!(lines[1], "Your echo lingers on floor 14...");
        assert_eq!(lines[2], "Echo Type: Aggressive (Red)");
        assert_eq!(lines[4], "Monsters slain: 87");
    }
}
