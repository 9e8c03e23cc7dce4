//! File-backed save slots: persistence across sessions, version checks and
//! recovery from damaged files.

use tempfile::TempDir;
use tower_client::client::TowerClient;
use tower_client::config::ClientConfig;
use tower_client::save::{
    FileSlotStore, PlayerSettings, ReputationTier, SaveError, SaveGame, SaveSlotStore,
    SaveSubsystem, Stat, CURRENT_SAVE_VERSION,
};

fn session(dir: &TempDir) -> SaveSubsystem {
    SaveSubsystem::initialize(Box::new(FileSlotStore::new(dir.path())))
}

#[test]
fn progress_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut save = session(&dir);
        save.current_mut().player_name = "Climber".to_string();
        save.increment_stat(Stat::Monsters, 25);
        save.update_highest_floor(9);
        save.set_faction_reputation("Seekers", 55);
        save.save(0).unwrap();
    }

    let save = session(&dir);
    let record = save.current();
    assert_eq!(record.player_name, "Climber");
    assert_eq!(record.stats.monsters_slain, 25);
    assert_eq!(record.stats.highest_floor, 9);
    assert_eq!(record.current_floor, 9);
    let rep = record.faction_rep("Seekers").unwrap();
    assert_eq!(rep.tier, ReputationTier::from_reputation(55));
}

#[test]
fn slot_file_name_and_delete() {
    let dir = TempDir::new().unwrap();
    let mut save = session(&dir);
    save.save(3).unwrap();
    assert!(dir.path().join("TowerSave_3.json").exists());
    assert!(save.has_save(3));

    assert!(save.delete_save(3).unwrap());
    assert!(!save.has_save(3));
    assert!(!save.delete_save(3).unwrap());
}

#[test]
fn missing_slot_is_not_found() {
    let dir = TempDir::new().unwrap();
    let mut save = session(&dir);
    assert!(matches!(save.load(7), Err(SaveError::NotFound(7))));
}

#[test]
fn future_version_is_refused_and_left_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut store = FileSlotStore::new(dir.path());
    let mut future = SaveGame {
        save_version: CURRENT_SAVE_VERSION + 1,
        player_name: "FromNewerBuild".to_string(),
        ..SaveGame::default()
    };
    future.stats.highest_floor = 42;
    store.write(0, &future).unwrap();
    let path = dir.path().join("TowerSave_0.json");
    let before = std::fs::read_to_string(&path).unwrap();

    let mut save = session(&dir);
    assert_eq!(save.current().stats.highest_floor, 0);
    assert!(matches!(
        save.load(0),
        Err(SaveError::FutureVersion { .. })
    ));
    assert!(matches!(save.save(0), Err(SaveError::SlotProtected(0))));
    assert!(save.cache_auth_token("user-1", "tok").is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn client_shutdown_keeps_newer_save() {
    let dir = TempDir::new().unwrap();
    let mut store = FileSlotStore::new(dir.path());
    let future = SaveGame {
        save_version: CURRENT_SAVE_VERSION + 1,
        player_name: "FromNewerBuild".to_string(),
        ..SaveGame::default()
    };
    store.write(0, &future).unwrap();
    let path = dir.path().join("TowerSave_0.json");
    let before = std::fs::read_to_string(&path).unwrap();

    let mut config = ClientConfig::default();
    config.save.directory = dir.path().to_path_buf();
    config.save.auto_save_interval = Some(1.0);
    let mut client = TowerClient::with_file_saves(config);
    assert!(!client.tick(2.0).auto_saved);
    client.shutdown();

    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(after, before);
    let raw: serde_json::Value = serde_json::from_str(&after).unwrap();
    assert_eq!(raw["player_name"], "FromNewerBuild");
}

#[test]
fn overwrite_replaces_unreadable_slot() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("TowerSave_0.json"), "{ not json").unwrap();

    let mut save = session(&dir);
    assert_eq!(save.protected_slot(), Some(0));
    save.current_mut().player_name = "Fresh".to_string();
    save.overwrite(0).unwrap();
    save.save(0).unwrap();

    let save = session(&dir);
    assert_eq!(save.current().player_name, "Fresh");
    assert_eq!(save.protected_slot(), None);
}

#[test]
fn corrupt_slot_starts_fresh() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("TowerSave_0.json"), "{ not json").unwrap();

    let mut save = session(&dir);
    assert_eq!(save.current().current_floor, 1);
    assert!(matches!(save.load(0), Err(SaveError::Corrupt(_))));
}

#[test]
fn settings_and_token_persist_immediately() {
    let dir = TempDir::new().unwrap();
    {
        let mut save = session(&dir);
        let settings = PlayerSettings {
            invert_y: true,
            ..PlayerSettings::default()
        };
        save.save_settings(settings).unwrap();
        save.cache_auth_token("user-42", "tok-abc").unwrap();
    }

    let save = session(&dir);
    assert!(save.settings().invert_y);
    assert_eq!(save.cached_auth_token(), "tok-abc");
    assert_eq!(save.current().user_id, "user-42");
}

#[test]
fn saved_record_is_stamped() {
    let dir = TempDir::new().unwrap();
    let mut save = session(&dir);
    save.save(1).unwrap();
    let raw = std::fs::read_to_string(dir.path().join("TowerSave_1.json")).unwrap();
    let record = SaveGame::from_json(&raw).unwrap();
    assert_eq!(record.save_version, CURRENT_SAVE_VERSION);
    assert_eq!(record.game_version, "0.3.0");
    assert!(record.last_save_time <= chrono::Utc::now());
}
