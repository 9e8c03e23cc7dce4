//! Chat Log
//!
//! Headless model of the in-game chat box: bounded history, player/system/
//! combat lines, input submission and inactivity fade. The log keeps its own
//! clock (advanced by `tick`) for message timestamps.

use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{Observers, SubscriptionId};

pub const SYSTEM_COLOR: LinearRgba = LinearRgba::new(1.0, 0.9, 0.3, 1.0);
pub const COMBAT_COLOR: LinearRgba = LinearRgba::new(0.5, 0.5, 0.5, 1.0);
pub const PLAYER_COLOR: LinearRgba = LinearRgba::WHITE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_messages: usize,
    /// Seconds of inactivity before the log fades
    pub fade_delay: f32,
    pub fade_opacity: f32,
    pub show_timestamps: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            fade_delay: 5.0,
            fade_opacity: 0.3,
            show_timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Empty for combat log lines
    pub sender: String,
    pub text: String,
    pub color: LinearRgba,
    pub is_system: bool,
    /// Seconds on the log's clock
    pub timestamp: f64,
}

#[derive(Debug, Default)]
pub struct ChatLog {
    config: ChatConfig,
    messages: Vec<ChatMessage>,
    clock: f64,
    time_since_last_message: f32,
    faded: bool,
    message_sent: Observers<String>,
}

impl ChatLog {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn set_show_timestamps(&mut self, show: bool) {
        self.config.show_timestamps = show;
    }

    /// Called with the trimmed text of every submitted line
    pub fn on_message_sent<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&String) + Send + Sync + 'static,
    {
        self.message_sent.subscribe(callback)
    }

    pub fn add_player_message(&mut self, sender: &str, text: &str) {
        self.add_message(sender, text, PLAYER_COLOR, false);
    }

    pub fn add_system_message(&mut self, text: &str) {
        self.add_message("System", text, SYSTEM_COLOR, true);
    }

    pub fn add_combat_log(&mut self, text: &str) {
        self.add_message("", text, COMBAT_COLOR, true);
    }

    pub fn add_message(&mut self, sender: &str, text: &str, color: LinearRgba, is_system: bool) {
        self.messages.push(ChatMessage {
            sender: sender.to_string(),
            text: text.to_string(),
            color,
            is_system,
            timestamp: self.clock,
        });

        if self.messages.len() > self.config.max_messages {
            let excess = self.messages.len() - self.config.max_messages;
            self.messages.drain(..excess);
        }

        self.unfade();
    }

    /// Submit typed input. Blank input is ignored and returns `None`.
    pub fn submit_input(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        debug!("Chat input submitted ({} chars)", text.len());
        self.message_sent.notify(&text);
        self.add_player_message("You", &text);
        Some(text)
    }

    pub fn focus_input(&mut self) {
        self.unfade();
    }

    /// Advance the clock and fade after `fade_delay` without activity.
    /// The log never fades while the input box has focus.
    pub fn tick(&mut self, dt: f32, input_focused: bool) {
        self.clock += dt as f64;
        if input_focused {
            return;
        }
        self.time_since_last_message += dt;
        if self.time_since_last_message > self.config.fade_delay && !self.faded {
            self.faded = true;
        }
    }

    fn unfade(&mut self) {
        self.time_since_last_message = 0.0;
        self.faded = false;
    }

    pub fn is_faded(&self) -> bool {
        self.faded
    }

    pub fn opacity(&self) -> f32 {
        if self.faded {
            self.config.fade_opacity
        } else {
            1.0
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// `[mm:ss] Sender: text`, timestamp only when enabled, sender only when set
    pub fn format_line(&self, message: &ChatMessage) -> String {
        let mut line = String::new();
        if self.config.show_timestamps {
            let total = message.timestamp.max(0.0);
            let mins = (total / 60.0).floor() as u64;
            let secs = (total % 60.0).floor() as u64;
            line.push_str(&format!("[{:02}:{:02}] ", mins, secs));
        }
        if !message.sender.is_empty() {
            line.push_str(&message.sender);
            line.push_str(": ");
        }
        line.push_str(&message.text);
        line
    }

    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(|m| self.format_line(m)).collect()
    }
}
