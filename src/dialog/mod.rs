//! NPC Dialog Panel
//!
//! Shows one dialog node at a time with a typewriter reveal. Choices become
//! selectable once the node is showing; unavailable choices render with their
//! requirement hint and cannot be picked.

use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{Observers, SubscriptionId};

fn default_faction() -> String {
    "neutral".to_string()
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogChoice {
    pub text: String,
    #[serde(default)]
    pub next_node: i64,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub requirement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogNode {
    pub id: i64,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<DialogChoice>,
    #[serde(default = "default_faction")]
    pub faction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Characters revealed per second
    pub typewriter_speed: f32,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            typewriter_speed: 40.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("invalid dialog node json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("no dialog is showing")]
    NotShowing,
    #[error("no choice at index {0}")]
    InvalidChoice(usize),
    #[error("choice {0} is not available")]
    ChoiceUnavailable(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    ChoiceSelected { node_id: i64, choice_index: usize },
    Closed,
}

pub fn faction_color(faction: &str) -> LinearRgba {
    match faction {
        "seekers" => LinearRgba::new(0.2, 0.6, 1.0, 1.0),
        "wardens" => LinearRgba::new(0.2, 0.8, 0.3, 1.0),
        "breakers" => LinearRgba::new(1.0, 0.3, 0.2, 1.0),
        "weavers" => LinearRgba::new(0.7, 0.3, 1.0, 1.0),
        _ => LinearRgba::new(0.8, 0.8, 0.8, 1.0),
    }
}

#[derive(Debug, Default)]
pub struct DialogPanel {
    config: DialogConfig,
    current: Option<DialogNode>,
    showing: bool,
    typewriting: bool,
    typewriter_timer: f32,
    revealed_chars: usize,
    total_chars: usize,
    observers: Observers<DialogEvent>,
}

impl DialogPanel {
    pub fn new(config: DialogConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DialogEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn show_node(&mut self, node: DialogNode) {
        debug!("Dialog node {} ({})", node.id, node.speaker);
        self.total_chars = node.text.chars().count();
        self.current = Some(node);
        self.showing = true;
        self.typewriting = true;
        self.typewriter_timer = 0.0;
        self.revealed_chars = 0;
    }

    pub fn show_node_json(&mut self, json: &str) -> Result<(), DialogError> {
        let node: DialogNode = serde_json::from_str(json)?;
        self.show_node(node);
        Ok(())
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.showing || !self.typewriting {
            return;
        }
        self.typewriter_timer += dt;
        let chars_to_show = (self.typewriter_timer * self.config.typewriter_speed).floor() as usize;
        if chars_to_show > self.revealed_chars {
            self.revealed_chars = chars_to_show.min(self.total_chars);
        }
        if self.revealed_chars >= self.total_chars {
            self.typewriting = false;
        }
    }

    pub fn skip_typewriter(&mut self) {
        if !self.typewriting {
            return;
        }
        self.typewriting = false;
        self.revealed_chars = self.total_chars;
    }

    /// Pick a choice on the showing node and notify observers
    pub fn choose(&mut self, index: usize) -> Result<i64, DialogError> {
        if !self.showing {
            return Err(DialogError::NotShowing);
        }
        let node = self.current.as_ref().ok_or(DialogError::NotShowing)?;
        let choice = node
            .choices
            .get(index)
            .ok_or(DialogError::InvalidChoice(index))?;
        if !choice.available {
            return Err(DialogError::ChoiceUnavailable(index));
        }
        let next_node = choice.next_node;
        let event = DialogEvent::ChoiceSelected {
            node_id: node.id,
            choice_index: index,
        };
        self.observers.notify(&event);
        Ok(next_node)
    }

    pub fn close(&mut self) {
        self.showing = false;
        self.typewriting = false;
        self.observers.notify(&DialogEvent::Closed);
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn is_typewriting(&self) -> bool {
        self.typewriting
    }

    /// Continue hint is shown once the full text is out
    pub fn show_continue_hint(&self) -> bool {
        self.showing && !self.typewriting
    }

    pub fn current_node(&self) -> Option<&DialogNode> {
        self.current.as_ref()
    }

    pub fn revealed_text(&self) -> String {
        self.current
            .as_ref()
            .map(|n| n.text.chars().take(self.revealed_chars).collect())
            .unwrap_or_default()
    }

    /// `[n] text`, with ` (hint)` appended to unavailable choices that have one
    pub fn choice_lines(&self) -> Vec<String> {
        let Some(node) = &self.current else {
            return Vec::new();
        };
        node.choices
            .iter()
            .enumerate()
            .map(|(i, choice)| {
                let mut line = format!("[{}] {}", i + 1, choice.text);
                if !choice.available && !choice.requirement.is_empty() {
                    line.push_str(&format!(" ({})", choice.requirement));
                }
                line
            })
            .collect()
    }

    pub fn speaker_color(&self) -> LinearRgba {
        self.current
            .as_ref()
            .map(|n| faction_color(&n.faction))
            .unwrap_or_else(|| faction_color("neutral"))
    }
}
