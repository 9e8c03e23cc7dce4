//! Socket & Gem Panel
//!
//! Equipment has colored sockets that hold gems or runes:
//! - Red (offensive), Blue (defensive), Yellow (utility), Prismatic (any)
//! - Gems carry a tier; three gems of the same color and tier combine into
//!   one gem of the next tier (Radiant is the ceiling)
//!
//! The panel works on server-provided JSON for the equipment and the player's
//! available gems/runes. Inserting consumes the gem/rune from the available
//! list; the server confirms the real change from the emitted events.

use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::{Observers, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketColor {
    Red,
    Blue,
    Yellow,
    Prismatic,
}

impl SocketColor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Yellow => "Yellow",
            Self::Prismatic => "Prismatic",
        }
    }

    /// Unknown names fall back to Red
    pub fn parse(name: &str) -> Self {
        match name {
            "Blue" => Self::Blue,
            "Yellow" => Self::Yellow,
            "Prismatic" => Self::Prismatic,
            _ => Self::Red,
        }
    }

    pub fn accepts(&self, content_color: SocketColor) -> bool {
        match self {
            Self::Prismatic => true,
            other => *other == content_color,
        }
    }

    pub fn color(&self) -> LinearRgba {
        match self {
            Self::Red => LinearRgba::new(1.0, 0.267, 0.267, 1.0),
            Self::Blue => LinearRgba::new(0.267, 0.533, 1.0, 1.0),
            Self::Yellow => LinearRgba::new(1.0, 0.8, 0.133, 1.0),
            Self::Prismatic => LinearRgba::WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GemTier {
    Chipped,
    Flawed,
    Regular,
    Flawless,
    Perfect,
    Radiant,
}

impl GemTier {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chipped => "Chipped",
            Self::Flawed => "Flawed",
            Self::Regular => "Regular",
            Self::Flawless => "Flawless",
            Self::Perfect => "Perfect",
            Self::Radiant => "Radiant",
        }
    }

    /// Unknown names fall back to Chipped
    pub fn parse(name: &str) -> Self {
        match name {
            "Flawed" => Self::Flawed,
            "Regular" => Self::Regular,
            "Flawless" => Self::Flawless,
            "Perfect" => Self::Perfect,
            "Radiant" => Self::Radiant,
            _ => Self::Chipped,
        }
    }

    /// Combine 3 gems of same tier to upgrade
    pub fn next_tier(&self) -> Option<Self> {
        match self {
            Self::Chipped => Some(Self::Flawed),
            Self::Flawed => Some(Self::Regular),
            Self::Regular => Some(Self::Flawless),
            Self::Flawless => Some(Self::Perfect),
            Self::Perfect => Some(Self::Radiant),
            Self::Radiant => None,
        }
    }

    pub fn color(&self) -> LinearRgba {
        match self {
            Self::Chipped => LinearRgba::new(0.5, 0.5, 0.5, 1.0),
            Self::Flawed => LinearRgba::new(0.9, 0.9, 0.9, 1.0),
            Self::Regular => LinearRgba::new(0.2, 0.9, 0.3, 1.0),
            Self::Flawless => LinearRgba::new(0.3, 0.5, 1.0, 1.0),
            Self::Perfect => LinearRgba::new(0.7, 0.3, 1.0, 1.0),
            Self::Radiant => LinearRgba::new(1.0, 0.84, 0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gem {
    pub id: String,
    pub name: String,
    pub color: SocketColor,
    pub tier: GemTier,
    pub bonus_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rune {
    pub id: String,
    pub name: String,
    pub color: SocketColor,
    pub description: String,
    pub effect_description: String,
}

/// What currently sits in a socket
#[derive(Debug, Clone, PartialEq)]
pub struct SocketContent {
    pub name: String,
    pub description: String,
    pub is_gem: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    pub index: usize,
    pub color: SocketColor,
    pub content: Option<SocketContent>,
}

impl Socket {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("invalid socket json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a list or an object with a '{0}' list")]
    MissingList(&'static str),
    #[error("no socket at index {0}")]
    InvalidSlot(usize),
    #[error("socket {0} is empty")]
    SocketEmpty(usize),
    #[error("gem '{0}' not available")]
    GemNotFound(String),
    #[error("rune '{0}' not available")]
    RuneNotFound(String),
    #[error("{content:?} cannot fit {socket:?} socket")]
    ColorMismatch {
        socket: SocketColor,
        content: SocketColor,
    },
    #[error("gems must be same color to combine")]
    CombineColorMismatch,
    #[error("gems must be same tier to combine")]
    CombineTierMismatch,
    #[error("radiant gems cannot be combined further")]
    MaxTier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Modified { equipment_id: String, index: usize },
    GemsCombined { new_gem_id: String },
}

// ============ Wire shapes ============

#[derive(Deserialize)]
struct EquipmentJson {
    name: Option<String>,
    #[serde(default)]
    sockets: Vec<SocketJson>,
}

#[derive(Deserialize)]
struct SocketJson {
    #[serde(default)]
    color: String,
    content: Option<ContentJson>,
}

#[derive(Deserialize)]
struct ContentJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    // gems have a tier, runes don't
    tier: Option<String>,
}

#[derive(Deserialize)]
struct GemJson {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    tier: String,
    #[serde(default)]
    bonus_description: String,
}

#[derive(Deserialize)]
struct RuneJson {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    effect_description: String,
}

/// Accept either a bare array or `{ "<key>": [...] }`
fn parse_list<T: serde::de::DeserializeOwned>(
    json: &str,
    key: &'static str,
) -> Result<Vec<T>, SocketError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let list = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut map) => map.remove(key).ok_or(SocketError::MissingList(key))?,
        _ => return Err(SocketError::MissingList(key)),
    };
    Ok(serde_json::from_value(list)?)
}

#[derive(Debug, Default)]
pub struct SocketPanel {
    equipment_id: String,
    equipment_name: String,
    sockets: Vec<Socket>,
    gems: Vec<Gem>,
    runes: Vec<Rune>,
    selected_socket: Option<usize>,
    observers: Observers<SocketEvent>,
}

impl SocketPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SocketEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Replace the displayed equipment. Returns the socket count.
    pub fn load_equipment_json(
        &mut self,
        equipment_id: &str,
        json: &str,
    ) -> Result<usize, SocketError> {
        let parsed: EquipmentJson = match serde_json::from_str(json) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse sockets JSON for {}: {}", equipment_id, e);
                return Err(e.into());
            }
        };

        self.equipment_id = equipment_id.to_string();
        self.equipment_name = parsed.name.unwrap_or_else(|| equipment_id.to_string());
        self.selected_socket = None;
        self.sockets = parsed
            .sockets
            .into_iter()
            .enumerate()
            .map(|(index, s)| Socket {
                index,
                color: SocketColor::parse(&s.color),
                content: s.content.map(|c| SocketContent {
                    name: c.name,
                    description: c.description,
                    is_gem: c.tier.is_some(),
                }),
            })
            .collect();

        info!("Loaded {} sockets for {}", self.sockets.len(), equipment_id);
        Ok(self.sockets.len())
    }

    pub fn load_gems_json(&mut self, json: &str) -> Result<usize, SocketError> {
        let gems: Vec<GemJson> = parse_list(json, "gems")?;
        self.gems = gems
            .into_iter()
            .map(|g| Gem {
                id: g.id,
                name: g.name,
                color: SocketColor::parse(&g.color),
                tier: GemTier::parse(&g.tier),
                bonus_description: g.bonus_description,
            })
            .collect();
        info!("Loaded {} available gems", self.gems.len());
        Ok(self.gems.len())
    }

    pub fn load_runes_json(&mut self, json: &str) -> Result<usize, SocketError> {
        let runes: Vec<RuneJson> = parse_list(json, "runes")?;
        self.runes = runes
            .into_iter()
            .map(|r| Rune {
                id: r.id,
                name: r.name,
                color: SocketColor::parse(&r.color),
                description: r.description,
                effect_description: r.effect_description,
            })
            .collect();
        info!("Loaded {} available runes", self.runes.len());
        Ok(self.runes.len())
    }

    pub fn select_socket(&mut self, index: usize) -> Result<(), SocketError> {
        if index >= self.sockets.len() {
            return Err(SocketError::InvalidSlot(index));
        }
        self.selected_socket = Some(index);
        Ok(())
    }

    pub fn selected_socket(&self) -> Option<&Socket> {
        self.selected_socket.and_then(|i| self.sockets.get(i))
    }

    /// False for out-of-range sockets
    pub fn is_compatible(&self, socket_index: usize, content_color: SocketColor) -> bool {
        self.sockets
            .get(socket_index)
            .is_some_and(|s| s.color.accepts(content_color))
    }

    fn check_fit(&self, socket_index: usize, content_color: SocketColor) -> Result<(), SocketError> {
        let socket = self
            .sockets
            .get(socket_index)
            .ok_or(SocketError::InvalidSlot(socket_index))?;
        if !socket.color.accepts(content_color) {
            warn!(
                "Color mismatch: {} cannot fit {} socket",
                content_color.name(),
                socket.color.name()
            );
            return Err(SocketError::ColorMismatch {
                socket: socket.color,
                content: content_color,
            });
        }
        Ok(())
    }

    fn notify_modified(&mut self, index: usize) {
        let event = SocketEvent::Modified {
            equipment_id: self.equipment_id.clone(),
            index,
        };
        self.observers.notify(&event);
    }

    pub fn insert_gem(&mut self, socket_index: usize, gem_id: &str) -> Result<(), SocketError> {
        if socket_index >= self.sockets.len() {
            return Err(SocketError::InvalidSlot(socket_index));
        }
        let gem_index = self
            .gems
            .iter()
            .position(|g| g.id == gem_id)
            .ok_or_else(|| SocketError::GemNotFound(gem_id.to_string()))?;
        self.check_fit(socket_index, self.gems[gem_index].color)?;

        let gem = self.gems.remove(gem_index);
        self.sockets[socket_index].content = Some(SocketContent {
            name: gem.name,
            description: gem.bonus_description,
            is_gem: true,
        });
        self.notify_modified(socket_index);
        Ok(())
    }

    pub fn insert_rune(&mut self, socket_index: usize, rune_id: &str) -> Result<(), SocketError> {
        if socket_index >= self.sockets.len() {
            return Err(SocketError::InvalidSlot(socket_index));
        }
        let rune_index = self
            .runes
            .iter()
            .position(|r| r.id == rune_id)
            .ok_or_else(|| SocketError::RuneNotFound(rune_id.to_string()))?;
        self.check_fit(socket_index, self.runes[rune_index].color)?;

        let rune = self.runes.remove(rune_index);
        self.sockets[socket_index].content = Some(SocketContent {
            name: rune.name,
            description: rune.effect_description,
            is_gem: false,
        });
        self.notify_modified(socket_index);
        Ok(())
    }

    /// Clear a socket. The removed content is destroyed, not returned to the lists.
    pub fn remove_content(&mut self, socket_index: usize) -> Result<SocketContent, SocketError> {
        let socket = self
            .sockets
            .get_mut(socket_index)
            .ok_or(SocketError::InvalidSlot(socket_index))?;
        let content = socket
            .content
            .take()
            .ok_or(SocketError::SocketEmpty(socket_index))?;
        self.notify_modified(socket_index);
        Ok(content)
    }

    /// Consume three gems of one color and tier. Returns the preview id of the
    /// resulting gem (`combined_{color}_{tier}`); the server assigns the real one.
    pub fn combine_gems(&mut self, id1: &str, id2: &str, id3: &str) -> Result<String, SocketError> {
        let mut picked: Vec<usize> = Vec::with_capacity(3);
        for id in [id1, id2, id3] {
            let index = self
                .gems
                .iter()
                .enumerate()
                .position(|(i, g)| g.id == id && !picked.contains(&i))
                .ok_or_else(|| {
                    warn!("Cannot find all 3 gems for combining");
                    SocketError::GemNotFound(id.to_string())
                })?;
            picked.push(index);
        }

        let first = &self.gems[picked[0]];
        let (color, tier) = (first.color, first.tier);
        if picked.iter().any(|&i| self.gems[i].color != color) {
            return Err(SocketError::CombineColorMismatch);
        }
        if picked.iter().any(|&i| self.gems[i].tier != tier) {
            return Err(SocketError::CombineTierMismatch);
        }
        let next_tier = tier.next_tier().ok_or(SocketError::MaxTier)?;

        let new_gem_id = format!(
            "combined_{}_{}",
            color.name().to_lowercase(),
            next_tier.name().to_lowercase()
        );

        picked.sort_unstable();
        for index in picked.into_iter().rev() {
            self.gems.remove(index);
        }

        info!("Combined 3 {} gems into {}", tier.name(), new_gem_id);
        self.observers.notify(&SocketEvent::GemsCombined {
            new_gem_id: new_gem_id.clone(),
        });
        Ok(new_gem_id)
    }

    pub fn equipment_id(&self) -> &str {
        &self.equipment_id
    }

    pub fn equipment_name(&self) -> &str {
        &self.equipment_name
    }

    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    pub fn gems(&self) -> &[Gem] {
        &self.gems
    }

    pub fn runes(&self) -> &[Rune] {
        &self.runes
    }
}
