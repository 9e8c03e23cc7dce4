//! Save subsystem: owns the current record and its slot store.

use tracing::{error, info, warn};

use super::{
    slot_name, PlayerSettings, SaveError, SaveGame, SaveSlotStore, Stat, CURRENT_SAVE_VERSION,
};

/// Slot used by auto-save, settings and auth token persistence
pub const DEFAULT_SLOT: u32 = 0;

pub struct SaveSubsystem {
    store: Box<dyn SaveSlotStore>,
    current: SaveGame,
    auto_save_enabled: bool,
    auto_save_interval: f64,
    auto_save_timer: f64,
    /// Slot whose existing file failed to load; saves to it are refused
    protected_slot: Option<u32>,
}

impl std::fmt::Debug for SaveSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSubsystem")
            .field("current", &self.current)
            .field("auto_save_enabled", &self.auto_save_enabled)
            .field("auto_save_interval", &self.auto_save_interval)
            .field("protected_slot", &self.protected_slot)
            .finish()
    }
}

impl SaveSubsystem {
    /// Load slot 0 if present, otherwise start from a fresh record.
    ///
    /// A slot that exists but cannot be loaded (corrupt, newer version) is
    /// logged and the session starts fresh. That slot stays protected: saves
    /// to it fail with `SlotProtected` until it is deleted, loaded or
    /// explicitly overwritten.
    pub fn initialize(store: Box<dyn SaveSlotStore>) -> Self {
        let mut subsystem = Self {
            store,
            current: SaveGame::default(),
            auto_save_enabled: false,
            auto_save_interval: 0.0,
            auto_save_timer: 0.0,
            protected_slot: None,
        };

        if subsystem.store.exists(DEFAULT_SLOT) {
            match subsystem.load(DEFAULT_SLOT) {
                Ok(()) => info!("Loaded save game from slot {}", DEFAULT_SLOT),
                Err(e) => {
                    error!(
                        "Failed to load slot {}: {}; slot left untouched",
                        DEFAULT_SLOT, e
                    );
                    subsystem.protected_slot = Some(DEFAULT_SLOT);
                }
            }
        } else {
            info!("Created new save game");
        }
        subsystem
    }

    pub fn current(&self) -> &SaveGame {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut SaveGame {
        &mut self.current
    }

    /// Slot holding an unreadable save that this session will not write over
    pub fn protected_slot(&self) -> Option<u32> {
        self.protected_slot
    }

    /// Stamp time and version, then write the record to `slot`
    pub fn save(&mut self, slot: u32) -> Result<(), SaveError> {
        if self.protected_slot == Some(slot) {
            warn!("Refusing to save over unreadable slot {}", slot);
            return Err(SaveError::SlotProtected(slot));
        }
        self.write_slot(slot)
    }

    /// Save to `slot` even if it holds a save that failed to load
    pub fn overwrite(&mut self, slot: u32) -> Result<(), SaveError> {
        if self.protected_slot == Some(slot) {
            warn!("Overwriting unreadable slot {}", slot);
        }
        self.write_slot(slot)?;
        self.unprotect(slot);
        Ok(())
    }

    fn unprotect(&mut self, slot: u32) {
        if self.protected_slot == Some(slot) {
            self.protected_slot = None;
        }
    }

    fn write_slot(&mut self, slot: u32) -> Result<(), SaveError> {
        self.current.last_save_time = chrono::Utc::now();
        self.current.save_version = CURRENT_SAVE_VERSION;

        match self.store.write(slot, &self.current) {
            Ok(()) => {
                info!("Saved game to slot {} ({})", slot, slot_name(slot));
                Ok(())
            }
            Err(e) => {
                error!("Failed to save game to slot {}: {}", slot, e);
                Err(e)
            }
        }
    }

    /// Replace the current record with `slot`. On error the current record is kept.
    pub fn load(&mut self, slot: u32) -> Result<(), SaveError> {
        let loaded = self.store.read(slot)?;
        info!(
            "Loaded game from slot {}: floor {}, {} items",
            slot,
            loaded.current_floor,
            loaded.inventory_items.len()
        );
        self.current = loaded;
        self.unprotect(slot);
        Ok(())
    }

    pub fn has_save(&self, slot: u32) -> bool {
        self.store.exists(slot)
    }

    pub fn delete_save(&mut self, slot: u32) -> Result<bool, SaveError> {
        let deleted = self.store.delete(slot)?;
        if deleted {
            info!("Deleted save slot {}", slot);
        }
        self.unprotect(slot);
        Ok(deleted)
    }

    // ============ Auto-save ============

    pub fn enable_auto_save(&mut self, interval_secs: f64) {
        self.auto_save_enabled = true;
        self.auto_save_interval = interval_secs.max(0.0);
        self.auto_save_timer = 0.0;
        info!("Auto-save enabled: every {:.0}s", interval_secs);
    }

    pub fn disable_auto_save(&mut self) {
        self.auto_save_enabled = false;
        info!("Auto-save disabled");
    }

    pub fn auto_save_enabled(&self) -> bool {
        self.auto_save_enabled
    }

    /// Advance the auto-save timer. Returns true when a save to slot 0 ran.
    pub fn tick_auto_save(&mut self, dt: f64) -> bool {
        if !self.auto_save_enabled {
            return false;
        }
        self.auto_save_timer += dt;
        if self.auto_save_timer < self.auto_save_interval {
            return false;
        }
        self.auto_save_timer = 0.0;
        // Failure is already logged by save(); retried next interval
        self.save(DEFAULT_SLOT).is_ok()
    }

    // ============ Progress ============

    pub fn increment_stat(&mut self, stat: Stat, amount: u32) {
        self.current.stats.increment(stat, amount);
    }

    /// String form used by UI bindings: `Deaths`, `Monsters`, `Chests`, ...
    pub fn increment_stat_named(&mut self, stat_name: &str, amount: u32) -> Result<(), SaveError> {
        let stat: Stat = stat_name.parse()?;
        self.increment_stat(stat, amount);
        Ok(())
    }

    /// Raises both the highest and current floor when `floor` is a new record
    pub fn update_highest_floor(&mut self, floor: u32) {
        if floor > self.current.stats.highest_floor {
            self.current.stats.highest_floor = floor;
            self.current.current_floor = floor;
        }
    }

    pub fn add_play_time(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.current.stats.total_play_time += seconds;
        }
    }

    pub fn set_faction_reputation(&mut self, faction_name: &str, reputation: i32) {
        self.current.set_faction_reputation(faction_name, reputation);
    }

    // ============ Settings & auth ============

    pub fn settings(&self) -> &PlayerSettings {
        &self.current.settings
    }

    /// Replace settings and persist to slot 0 immediately
    pub fn save_settings(&mut self, settings: PlayerSettings) -> Result<(), SaveError> {
        self.current.settings = settings;
        self.save(DEFAULT_SLOT)
    }

    /// Empty when no token has been cached
    pub fn cached_auth_token(&self) -> &str {
        &self.current.auth_token
    }

    /// Store identity and token, persisting to slot 0 immediately
    pub fn cache_auth_token(&mut self, user_id: &str, token: &str) -> Result<(), SaveError> {
        if token.is_empty() {
            warn!("Caching empty auth token for user {}", user_id);
        }
        self.current.user_id = user_id.to_string();
        self.current.auth_token = token.to_string();
        self.save(DEFAULT_SLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::MemorySlotStore;

    fn fresh() -> SaveSubsystem {
        SaveSubsystem::initialize(Box::new(MemorySlotStore::new()))
    }

    #[test]
    fn test_initialize_fresh() {
        let subsystem = fresh();
        assert_eq!(subsystem.current().current_floor, 1);
        assert!(!subsystem.has_save(0));
    }

    #[test]
    fn test_initialize_loads_slot_zero() {
        let mut store = MemorySlotStore::new();
        let mut save = SaveGame::default();
        save.player_name = "Bren".to_string();
        save.current_floor = 12;
        store.write(0, &save).unwrap();

        let subsystem = SaveSubsystem::initialize(Box::new(store));
        assert_eq!(subsystem.current().player_name, "Bren");
        assert_eq!(subsystem.current().current_floor, 12);
    }

    #[test]
    fn test_initialize_with_future_save_starts_fresh() {
        let mut store = MemorySlotStore::new();
        store.insert_raw(0, r#"{"player_name": "Future", "save_version": 9}"#);
        let subsystem = SaveSubsystem::initialize(Box::new(store));
        assert_eq!(subsystem.current().player_name, "");
        // The newer save is left in place
        assert!(subsystem.has_save(0));
        assert_eq!(subsystem.protected_slot(), Some(0));
    }

    #[test]
    fn test_unreadable_slot_is_not_overwritten() {
        let raw = r#"{"player_name": "Future", "save_version": 9}"#;
        let mut store = MemorySlotStore::new();
        store.insert_raw(0, raw);
        let mut subsystem = SaveSubsystem::initialize(Box::new(store));
        subsystem.enable_auto_save(1.0);

        assert!(matches!(subsystem.save(0), Err(SaveError::SlotProtected(0))));
        assert!(!subsystem.tick_auto_save(2.0));
        assert!(subsystem.save_settings(PlayerSettings::default()).is_err());
        assert!(subsystem.cache_auth_token("user-1", "tok").is_err());
        assert!(matches!(subsystem.load(0), Err(SaveError::FutureVersion { .. })));

        // Other slots still save
        subsystem.save(1).unwrap();
        assert!(subsystem.has_save(1));
    }

    #[test]
    fn test_overwrite_and_delete_lift_protection() {
        let mut store = MemorySlotStore::new();
        store.insert_raw(0, "{ broken");
        let mut subsystem = SaveSubsystem::initialize(Box::new(store));
        subsystem.overwrite(0).unwrap();
        assert_eq!(subsystem.protected_slot(), None);
        subsystem.save(0).unwrap();
        subsystem.load(0).unwrap();

        let mut store = MemorySlotStore::new();
        store.insert_raw(0, "{ broken");
        let mut subsystem = SaveSubsystem::initialize(Box::new(store));
        assert!(subsystem.delete_save(0).unwrap());
        subsystem.save(0).unwrap();
    }

    #[test]
    fn test_save_and_load_slot() {
        let mut subsystem = fresh();
        subsystem.current_mut().tower_shards = 500;
        subsystem.save(1).unwrap();

        subsystem.current_mut().tower_shards = 0;
        subsystem.load(1).unwrap();
        assert_eq!(subsystem.current().tower_shards, 500);
        assert!(matches!(subsystem.load(4), Err(SaveError::NotFound(4))));
        // Failed load keeps the current record
        assert_eq!(subsystem.current().tower_shards, 500);
    }

    #[test]
    fn test_delete_save() {
        let mut subsystem = fresh();
        subsystem.save(0).unwrap();
        assert!(subsystem.delete_save(0).unwrap());
        assert!(!subsystem.delete_save(0).unwrap());
        assert!(!subsystem.has_save(0));
    }

    #[test]
    fn test_auto_save_interval() {
        let mut subsystem = fresh();
        assert!(!subsystem.tick_auto_save(100.0));

        subsystem.enable_auto_save(60.0);
        assert!(!subsystem.tick_auto_save(30.0));
        assert!(!subsystem.has_save(0));
        assert!(subsystem.tick_auto_save(30.0));
        assert!(subsystem.has_save(0));
        // Timer reset after saving
        assert!(!subsystem.tick_auto_save(59.0));

        subsystem.disable_auto_save();
        assert!(!subsystem.tick_auto_save(120.0));
    }

    #[test]
    fn test_progress_counters() {
        let mut subsystem = fresh();
        subsystem.increment_stat(Stat::Deaths, 1);
        subsystem.increment_stat_named("Chests", 4).unwrap();
        assert!(subsystem.increment_stat_named("Gold", 1).is_err());
        subsystem.add_play_time(90.5);
        subsystem.add_play_time(-10.0);

        let stats = &subsystem.current().stats;
        assert_eq!(stats.total_deaths, 1);
        assert_eq!(stats.chests_opened, 4);
        assert!((stats.total_play_time - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_highest_floor_only_increases() {
        let mut subsystem = fresh();
        subsystem.update_highest_floor(5);
        subsystem.update_highest_floor(3);
        assert_eq!(subsystem.current().stats.highest_floor, 5);
        assert_eq!(subsystem.current().current_floor, 5);
    }

    #[test]
    fn test_settings_persist_immediately() {
        let mut subsystem = fresh();
        let settings = PlayerSettings {
            invert_y: true,
            ..Default::default()
        };
        subsystem.save_settings(settings).unwrap();
        assert!(subsystem.settings().invert_y);
        assert!(subsystem.has_save(0));
    }

    #[test]
    fn test_auth_token_cached_and_persisted() {
        let mut subsystem = fresh();
        assert_eq!(subsystem.cached_auth_token(), "");
        subsystem.cache_auth_token("user-1", "tok-abc").unwrap();
        assert_eq!(subsystem.cached_auth_token(), "tok-abc");
        assert_eq!(subsystem.current().user_id, "user-1");
        assert!(subsystem.has_save(0));
    }
}
