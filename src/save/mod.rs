//! Local Save Data
//!
//! Versioned save record persisted per slot (`TowerSave_{n}`):
//! - Identity and cached auth token
//! - Progress counters (floors, deaths, kills, play time, ...)
//! - Inventory snapshot and currencies
//! - Faction reputation list
//! - Player settings
//!
//! The version field is checked on load but never migrated: a record written
//! by a newer build is refused.

pub mod store;
pub mod subsystem;

pub use store::{FileSlotStore, MemorySlotStore, SaveSlotStore};
pub use subsystem::SaveSubsystem;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Version stamped on every save written by this build
pub const CURRENT_SAVE_VERSION: u32 = 1;
pub const GAME_VERSION: &str = "0.3.0";

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no save in slot {0}")]
    NotFound(u32),
    #[error("save version {found} is newer than supported version {supported}")]
    FutureVersion { found: u32, supported: u32 },
    #[error("save data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("slot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown stat '{0}'")]
    UnknownStat(String),
    #[error("slot {0} holds a save that failed to load; delete or overwrite it first")]
    SlotProtected(u32),
}

/// Lifetime progress counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub highest_floor: u32,
    pub total_deaths: u32,
    pub monsters_slain: u32,
    /// Seconds
    pub total_play_time: f64,
    pub chests_opened: u32,
    pub quests_completed: u32,
    pub items_crafted: u32,
    pub echoes_encountered: u32,
}

/// Counter addressed by `SaveSubsystem::increment_stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Deaths,
    Monsters,
    Chests,
    Quests,
    Crafts,
    Echoes,
}

impl FromStr for Stat {
    type Err = SaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Deaths" => Ok(Stat::Deaths),
            "Monsters" => Ok(Stat::Monsters),
            "Chests" => Ok(Stat::Chests),
            "Quests" => Ok(Stat::Quests),
            "Crafts" => Ok(Stat::Crafts),
            "Echoes" => Ok(Stat::Echoes),
            other => Err(SaveError::UnknownStat(other.to_string())),
        }
    }
}

impl PlayerStats {
    pub fn increment(&mut self, stat: Stat, amount: u32) {
        let counter = match stat {
            Stat::Deaths => &mut self.total_deaths,
            Stat::Monsters => &mut self.monsters_slain,
            Stat::Chests => &mut self.chests_opened,
            Stat::Quests => &mut self.quests_completed,
            Stat::Crafts => &mut self.items_crafted,
            Stat::Echoes => &mut self.echoes_encountered,
        };
        *counter = counter.saturating_add(amount);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub music_volume: f32,
    pub mouse_sensitivity: f32,
    pub invert_y: bool,
    pub show_damage_numbers: bool,
    pub rotate_minimap: bool,
    pub show_timestamps: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 0.7,
            mouse_sensitivity: 1.0,
            invert_y: false,
            show_damage_numbers: true,
            rotate_minimap: true,
            show_timestamps: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationTier {
    Hostile,
    Unfriendly,
    Neutral,
    Friendly,
    Honored,
    Exalted,
}

impl ReputationTier {
    pub fn from_reputation(reputation: i32) -> Self {
        match reputation {
            i32::MIN..=-50 => ReputationTier::Hostile,
            -49..=-10 => ReputationTier::Unfriendly,
            -9..=9 => ReputationTier::Neutral,
            10..=49 => ReputationTier::Friendly,
            50..=89 => ReputationTier::Honored,
            _ => ReputationTier::Exalted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionRep {
    pub faction_name: String,
    pub reputation: i32,
    pub tier: ReputationTier,
}

impl FactionRep {
    pub fn new(faction_name: &str, reputation: i32) -> Self {
        Self {
            faction_name: faction_name.to_string(),
            reputation,
            tier: ReputationTier::from_reputation(reputation),
        }
    }
}

/// Inventory snapshot entry. `loot_json` keeps the full server item blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemSave {
    pub item_name: String,
    pub category: String,
    pub rarity: String,
    pub quantity: u32,
    #[serde(default)]
    pub loot_json: String,
}

/// Full save record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveGame {
    pub player_name: String,
    pub user_id: String,
    pub auth_token: String,
    pub current_floor: u32,
    pub tower_seed: u64,
    pub stats: PlayerStats,
    pub inventory_items: Vec<InventoryItemSave>,
    pub tower_shards: u64,
    pub echo_fragments: u64,
    pub faction_reps: Vec<FactionRep>,
    pub settings: PlayerSettings,
    pub last_save_time: DateTime<Utc>,
    pub save_version: u32,
    pub game_version: String,
}

impl Default for SaveGame {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            user_id: String::new(),
            auth_token: String::new(),
            current_floor: 1,
            tower_seed: 0,
            stats: PlayerStats::default(),
            inventory_items: Vec::new(),
            tower_shards: 0,
            echo_fragments: 0,
            faction_reps: Vec::new(),
            settings: PlayerSettings::default(),
            last_save_time: Utc::now(),
            save_version: CURRENT_SAVE_VERSION,
            game_version: GAME_VERSION.to_string(),
        }
    }
}

impl SaveGame {
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and version-check a stored record
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let save: SaveGame = serde_json::from_str(json)?;
        if save.save_version > CURRENT_SAVE_VERSION {
            return Err(SaveError::FutureVersion {
                found: save.save_version,
                supported: CURRENT_SAVE_VERSION,
            });
        }
        Ok(save)
    }

    pub fn faction_rep(&self, faction_name: &str) -> Option<&FactionRep> {
        self.faction_reps
            .iter()
            .find(|r| r.faction_name == faction_name)
    }

    /// Insert or update a faction's reputation, recomputing its tier
    pub fn set_faction_reputation(&mut self, faction_name: &str, reputation: i32) {
        match self
            .faction_reps
            .iter_mut()
            .find(|r| r.faction_name == faction_name)
        {
            Some(existing) => {
                existing.reputation = reputation;
                existing.tier = ReputationTier::from_reputation(reputation);
            }
            None => self
                .faction_reps
                .push(FactionRep::new(faction_name, reputation)),
        }
    }
}

pub fn slot_name(index: u32) -> String {
    format!("TowerSave_{}", index)
}
