//! Loot Pickups
//!
//! World drops that bob and spin in place, drift toward a nearby player
//! (magnet), and despawn after a minute. Rarity drives color, size and glow.
//! A pickup is collected at most once; `LootField` tracks every live pickup
//! and reports collections to observers.

use bevy::color::LinearRgba;
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::{Observers, SubscriptionId};

/// Height the pickup floats above its spawn point
const FLOAT_HEIGHT: f32 = 30.0;
const BOB_SPEED: f32 = 3.0;
/// Magnet stops pulling inside this distance
const MAGNET_DEADZONE: f32 = 10.0;
const GLOW_FADE_WINDOW: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LootRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl LootRarity {
    /// Unknown names map to Common
    pub fn from_name(name: &str) -> Self {
        match name {
            "Uncommon" => Self::Uncommon,
            "Rare" => Self::Rare,
            "Epic" => Self::Epic,
            "Legendary" => Self::Legendary,
            "Mythic" => Self::Mythic,
            _ => Self::Common,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
        }
    }

    pub fn color(&self) -> LinearRgba {
        match self {
            Self::Common => LinearRgba::new(0.8, 0.8, 0.8, 1.0),
            Self::Uncommon => LinearRgba::new(0.2, 0.9, 0.3, 1.0),
            Self::Rare => LinearRgba::new(0.2, 0.4, 1.0, 1.0),
            Self::Epic => LinearRgba::new(0.7, 0.2, 0.9, 1.0),
            Self::Legendary => LinearRgba::new(1.0, 0.65, 0.0, 1.0),
            Self::Mythic => LinearRgba::new(1.0, 0.15, 0.15, 1.0),
        }
    }

    pub fn scale(&self) -> f32 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 1.1,
            Self::Rare => 1.2,
            Self::Epic => 1.3,
            Self::Legendary => 1.5,
            Self::Mythic => 1.7,
        }
    }

    pub fn glow_intensity(&self) -> f32 {
        match self {
            Self::Common => 200.0,
            Self::Uncommon => 400.0,
            Self::Rare => 600.0,
            Self::Epic => 1000.0,
            Self::Legendary => 2000.0,
            Self::Mythic => 3000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Seconds before an uncollected pickup disappears
    pub despawn_time: f32,
    pub magnet_radius: f32,
    pub magnet_speed: f32,
    pub bob_height: f32,
    /// Degrees per second
    pub rotate_speed: f32,
    pub collection_radius: f32,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            despawn_time: 60.0,
            magnet_radius: 200.0,
            magnet_speed: 500.0,
            bob_height: 15.0,
            rotate_speed: 90.0,
            collection_radius: 50.0,
        }
    }
}

#[derive(Deserialize)]
struct LootJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    rarity: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LootCollected {
    pub item_name: String,
    pub rarity: LootRarity,
    /// Server item blob, passed through untouched
    pub loot_json: String,
}

/// Per-frame visual state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootTick {
    pub despawned: bool,
    pub position: Vec3,
    pub yaw_degrees: f32,
    pub glow_intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LootPickup {
    pub item_name: String,
    pub rarity: LootRarity,
    pub loot_json: String,
    config: LootConfig,
    anchor: Vec3,
    time_alive: f32,
    yaw_degrees: f32,
    collected: bool,
}

impl LootPickup {
    pub fn from_json(
        loot_json: &str,
        spawn_position: Vec3,
        config: LootConfig,
    ) -> Result<Self, serde_json::Error> {
        let parsed: LootJson = serde_json::from_str(loot_json)?;
        Ok(Self {
            item_name: parsed.name,
            rarity: LootRarity::from_name(&parsed.rarity),
            loot_json: loot_json.to_string(),
            config,
            anchor: spawn_position,
            time_alive: 0.0,
            yaw_degrees: 0.0,
            collected: false,
        })
    }

    pub fn tick(&mut self, dt: f32, player_position: Option<Vec3>) -> LootTick {
        if self.collected {
            return self.snapshot(false);
        }
        self.time_alive += dt;
        if self.time_alive >= self.config.despawn_time {
            return self.snapshot(true);
        }

        self.yaw_degrees = (self.yaw_degrees + self.config.rotate_speed * dt) % 360.0;

        if let Some(player) = player_position {
            let here = self.position();
            let distance = here.distance(player);
            if distance < self.config.magnet_radius && distance > MAGNET_DEADZONE {
                let dir = (player - here).normalize_or_zero();
                let strength = 1.0 - distance / self.config.magnet_radius;
                self.anchor += dir * self.config.magnet_speed * strength * dt;
            }
        }

        self.snapshot(false)
    }

    fn snapshot(&self, despawned: bool) -> LootTick {
        LootTick {
            despawned,
            position: self.position(),
            yaw_degrees: self.yaw_degrees,
            glow_intensity: self.glow_intensity(),
        }
    }

    pub fn position(&self) -> Vec3 {
        let bob = (self.time_alive * BOB_SPEED).sin() * self.config.bob_height;
        self.anchor + Vec3::Z * (bob + FLOAT_HEIGHT)
    }

    /// Full rarity glow, fading out over the last 20% of lifetime
    pub fn glow_intensity(&self) -> f32 {
        let base = self.rarity.glow_intensity();
        let progress = self.time_alive / self.config.despawn_time;
        if progress > 1.0 - GLOW_FADE_WINDOW {
            base * ((1.0 - progress) / GLOW_FADE_WINDOW).max(0.0)
        } else {
            base
        }
    }

    /// Returns the collection record the first time only
    pub fn collect(&mut self) -> Option<LootCollected> {
        if self.collected || self.is_despawned() {
            return None;
        }
        self.collected = true;
        info!("Loot collected: {} ({})", self.item_name, self.rarity.name());
        Some(LootCollected {
            item_name: self.item_name.clone(),
            rarity: self.rarity,
            loot_json: self.loot_json.clone(),
        })
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn is_despawned(&self) -> bool {
        self.time_alive >= self.config.despawn_time
    }

    pub fn mesh_scale(&self) -> f32 {
        self.rarity.scale() * 0.3
    }
}

/// Every live pickup on the current floor
#[derive(Debug, Default)]
pub struct LootField {
    config: LootConfig,
    pickups: Vec<LootPickup>,
    observers: Observers<LootCollected>,
}

impl LootField {
    pub fn new(config: LootConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn on_collected<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&LootCollected) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn spawn_json(&mut self, loot_json: &str, position: Vec3) -> Result<(), serde_json::Error> {
        let pickup = LootPickup::from_json(loot_json, position, self.config.clone())?;
        debug!("Loot spawned: {} ({})", pickup.item_name, pickup.rarity.name());
        self.pickups.push(pickup);
        Ok(())
    }

    /// Advance every pickup, collect those within reach of the player and drop
    /// despawned or collected ones. Returns what was collected this frame.
    pub fn tick(&mut self, dt: f32, player_position: Option<Vec3>) -> Vec<LootCollected> {
        let mut collected = Vec::new();
        for pickup in &mut self.pickups {
            let tick = pickup.tick(dt, player_position);
            if tick.despawned {
                continue;
            }
            let in_reach = player_position
                .is_some_and(|p| tick.position.distance(p) <= self.config.collection_radius);
            if in_reach {
                if let Some(record) = pickup.collect() {
                    collected.push(record);
                }
            }
        }
        self.pickups
            .retain(|p| !p.is_collected() && !p.is_despawned());

        for record in &collected {
            self.observers.notify(record);
        }
        collected
    }

    pub fn pickups(&self) -> &[LootPickup] {
        &self.pickups
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const SWORD: &str = r#"{"name": "Ember Blade", "rarity": "Legendary", "damage": 42}"#;

    fn pickup(json: &str) -> LootPickup {
        LootPickup::from_json(json, Vec3::ZERO, LootConfig::default()).unwrap()
    }

    #[test]
    fn test_rarity_from_json() {
        let p = pickup(SWORD);
        assert_eq!(p.item_name, "Ember Blade");
        assert_eq!(p.rarity, LootRarity::Legendary);
        assert_eq!(p.loot_json, SWORD);
        assert!((p.mesh_scale() - 0.45).abs() < 1e-6);

        let unknown = pickup(r#"{"name": "Pebble", "rarity": "Shiny"}"#);
        assert_eq!(unknown.rarity, LootRarity::Common);
        assert!(LootPickup::from_json("nope", Vec3::ZERO, LootConfig::default()).is_err());
    }

    #[test]
    fn test_rarity_tables() {
        assert_eq!(LootRarity::Mythic.scale(), 1.7);
        assert_eq!(LootRarity::Epic.glow_intensity(), 1000.0);
        assert_eq!(LootRarity::Rare.color(), LinearRgba::new(0.2, 0.4, 1.0, 1.0));
    }

    #[test]
    fn test_collect_once() {
        let mut p = pickup(SWORD);
        let record = p.collect().unwrap();
        assert_eq!(record.item_name, "Ember Blade");
        assert!(p.collect().is_none());
    }

    #[test]
    fn test_despawn_after_lifetime() {
        let mut p = pickup(SWORD);
        assert!(!p.tick(59.0, None).despawned);
        assert!(p.tick(1.0, None).despawned);
        assert!(p.collect().is_none());
    }

    #[test]
    fn test_glow_fades_near_end() {
        let mut p = pickup(SWORD);
        p.tick(30.0, None);
        assert_eq!(p.glow_intensity(), 2000.0);
        p.tick(24.0, None); // 90% of lifetime
        assert!((p.glow_intensity() - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_magnet_pulls_toward_player() {
        let mut p = pickup(SWORD);
        let player = Vec3::new(100.0, 0.0, 30.0);
        let before = p.position().distance(player);
        p.tick(0.1, Some(player));
        let after = p.position().distance(player);
        assert!(after < before);
    }

    #[test]
    fn test_no_magnet_out_of_range() {
        let mut p = pickup(SWORD);
        p.tick(0.1, Some(Vec3::new(1000.0, 0.0, 0.0)));
        let pos = p.position();
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 0.0);
    }

    #[test]
    fn test_field_collects_nearby() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut field = LootField::new(LootConfig::default());
        let log = seen.clone();
        field.on_collected(move |c| log.lock().unwrap().push(c.item_name.clone()));

        field.spawn_json(SWORD, Vec3::ZERO).unwrap();
        field
            .spawn_json(r#"{"name": "Far Gem", "rarity": "Rare"}"#, Vec3::new(5000.0, 0.0, 0.0))
            .unwrap();

        let collected = field.tick(0.016, Some(Vec3::new(0.0, 0.0, 30.0)));
        assert_eq!(collected.len(), 1);
        assert_eq!(field.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["Ember Blade".to_string()]);

        // Nothing else in reach; far gem despawns eventually
        assert!(field.tick(61.0, Some(Vec3::ZERO)).is_empty());
        assert!(field.is_empty());
    }
}
