//! Slot storage backends.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{slot_name, SaveError, SaveGame};

/// Where save records live. Slot indices map to `TowerSave_{n}`.
pub trait SaveSlotStore: Send + Sync {
    fn write(&mut self, slot: u32, save: &SaveGame) -> Result<(), SaveError>;
    fn read(&self, slot: u32) -> Result<SaveGame, SaveError>;
    fn exists(&self, slot: u32) -> bool;
    /// Returns false when there was nothing to delete
    fn delete(&mut self, slot: u32) -> Result<bool, SaveError>;
}

/// One pretty-printed JSON file per slot
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    directory: PathBuf,
}

impl FileSlotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.directory.join(format!("{}.json", slot_name(slot)))
    }
}

impl SaveSlotStore for FileSlotStore {
    fn write(&mut self, slot: u32, save: &SaveGame) -> Result<(), SaveError> {
        fs::create_dir_all(&self.directory)?;
        let json = save.to_json()?;
        // Replace atomically through a temp file
        let path = self.slot_path(slot);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, slot: u32) -> Result<SaveGame, SaveError> {
        let json = match fs::read_to_string(self.slot_path(slot)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(SaveError::NotFound(slot)),
            Err(e) => return Err(e.into()),
        };
        SaveGame::from_json(&json)
    }

    fn exists(&self, slot: u32) -> bool {
        self.slot_path(slot).is_file()
    }

    fn delete(&mut self, slot: u32) -> Result<bool, SaveError> {
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Slots held as serialized JSON in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: HashMap<u32, String>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON in a slot, bypassing serialization
    pub fn insert_raw(&mut self, slot: u32, json: &str) {
        self.slots.insert(slot, json.to_string());
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SaveSlotStore for MemorySlotStore {
    fn write(&mut self, slot: u32, save: &SaveGame) -> Result<(), SaveError> {
        self.slots.insert(slot, save.to_json()?);
        Ok(())
    }

    fn read(&self, slot: u32) -> Result<SaveGame, SaveError> {
        let json = self.slots.get(&slot).ok_or(SaveError::NotFound(slot))?;
        SaveGame::from_json(json)
    }

    fn exists(&self, slot: u32) -> bool {
        self.slots.contains_key(&slot)
    }

    fn delete(&mut self, slot: u32) -> Result<bool, SaveError> {
        Ok(self.slots.remove(&slot).is_some())
    }
}
