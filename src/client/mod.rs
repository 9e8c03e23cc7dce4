//! Tower Client
//!
//! Owns every client subsystem and advances them from a single `tick(dt)`.
//! The client clock is the sum of ticked deltas; action timestamps, rate
//! limiting and timeout sweeping all read it.

pub mod plugin;

use bevy::math::Vec3;
use tracing::{error, info, warn};

use crate::actions::{ActionOutcome, ActionResult, ActionSender};
use crate::chat::ChatLog;
use crate::config::ClientConfig;
use crate::damage_numbers::DamageNumbers;
use crate::death_screen::{DeathScreen, DeathSummary};
use crate::dialog::DialogPanel;
use crate::echo::{EchoEffect, EchoGhost, EchoKind};
use crate::loot::{LootCollected, LootField};
use crate::save::subsystem::DEFAULT_SLOT;
use crate::save::{
    FileSlotStore, MemorySlotStore, SaveError, SaveSlotStore, SaveSubsystem, Stat,
};
use crate::sockets::SocketPanel;
use crate::trade::TradeSession;

pub use plugin::{ActionOutcomeEvent, ActionResultEvent, ClientResource, TowerClientPlugin};

/// What happened during one `TowerClient::tick`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientTick {
    /// Actions that timed out this frame
    pub lost_actions: Vec<ActionOutcome>,
    pub echo_effects: Vec<EchoEffect>,
    pub loot_collected: Vec<LootCollected>,
    pub expired_echoes: usize,
    pub auto_saved: bool,
}

pub struct TowerClient {
    config: ClientConfig,
    pub sender: ActionSender,
    pub save: SaveSubsystem,
    pub chat: ChatLog,
    pub trade: TradeSession,
    pub dialog: DialogPanel,
    pub sockets: SocketPanel,
    pub echoes: Vec<EchoGhost>,
    pub damage_numbers: DamageNumbers,
    pub loot: LootField,
    pub death_screen: DeathScreen,
    player_position: Option<Vec3>,
    chat_focused: bool,
    elapsed: f64,
}

impl std::fmt::Debug for TowerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TowerClient")
            .field("elapsed", &self.elapsed)
            .field("sender", &self.sender)
            .field("echoes", &self.echoes.len())
            .field("loot", &self.loot.len())
            .field("player_position", &self.player_position)
            .finish()
    }
}

impl TowerClient {
    /// Build every subsystem from `config`, persisting saves through `store`
    pub fn new(config: ClientConfig, store: Box<dyn SaveSlotStore>) -> Self {
        let config = config.validate();
        let mut save = SaveSubsystem::initialize(store);
        if let Some(interval) = config.save.auto_save_interval {
            save.enable_auto_save(interval);
        }

        info!(
            "Tower client ready (max_pending={}, auto_save={:?})",
            config.sender.max_pending, config.save.auto_save_interval
        );

        Self {
            sender: ActionSender::new(config.sender.clone()),
            save,
            chat: ChatLog::new(config.chat.clone()),
            trade: TradeSession::new(config.trade.clone()),
            dialog: DialogPanel::new(config.dialog.clone()),
            sockets: SocketPanel::new(),
            echoes: Vec::new(),
            damage_numbers: DamageNumbers::new(config.damage_numbers.clone()),
            loot: LootField::new(config.loot.clone()),
            death_screen: DeathScreen::new(config.death_screen.clone()),
            player_position: None,
            chat_focused: false,
            elapsed: 0.0,
            config,
        }
    }

    /// Saves go to `config.save.directory`
    pub fn with_file_saves(config: ClientConfig) -> Self {
        let store = FileSlotStore::new(config.save.directory.clone());
        Self::new(config, Box::new(store))
    }

    /// Saves stay in memory; nothing touches the filesystem
    pub fn in_memory(config: ClientConfig) -> Self {
        Self::new(config, Box::new(MemorySlotStore::new()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Seconds of client time ticked so far
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    pub fn set_player_position(&mut self, position: Option<Vec3>) {
        self.player_position = position;
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.player_position
    }

    pub fn set_chat_focused(&mut self, focused: bool) {
        self.chat_focused = focused;
        if focused {
            self.chat.focus_input();
        }
    }

    /// Run `f` against the sender with the current client time
    pub fn with_sender<R>(&mut self, f: impl FnOnce(&mut ActionSender, f64) -> R) -> R {
        let now = self.elapsed;
        f(&mut self.sender, now)
    }

    /// Feed one server result into the sender
    pub fn receive_result(&mut self, result: &ActionResult) -> Option<ActionOutcome> {
        let outcome = self.sender.on_result(result, self.elapsed)?;
        if let ActionOutcome::Rejected { reason, .. } = &outcome {
            self.chat.add_system_message(&format!("Action rejected: {}", reason));
        }
        Some(outcome)
    }

    pub fn spawn_echo(&mut self, player_name: &str, kind: EchoKind, origin: Vec3) {
        self.echoes.push(EchoGhost::new(player_name, kind, origin));
    }

    /// Record the death and bring up the death screen
    pub fn on_player_death(&mut self, summary: DeathSummary) {
        self.save.increment_stat(Stat::Deaths, 1);
        self.save.update_highest_floor(summary.floor_reached);
        self.save
            .increment_stat(Stat::Monsters, summary.monsters_slain);
        self.death_screen.show(summary);
    }

    pub fn tick(&mut self, dt: f32) -> ClientTick {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += f64::from(dt);
        let mut report = ClientTick {
            lost_actions: self.sender.sweep_timeouts(self.elapsed),
            ..Default::default()
        };

        // Echoes
        let player = self.player_position;
        for echo in &mut self.echoes {
            let distance = player.map(|p| p.distance(echo.origin));
            let tick = echo.tick(dt, distance);
            if let Some(effect) = tick.effect {
                report.echo_effects.push(effect);
            }
        }
        let before = self.echoes.len();
        self.echoes.retain(|echo| !echo.is_expired());
        report.expired_echoes = before - self.echoes.len();

        for effect in &report.echo_effects {
            if let EchoEffect::Damage(amount) = effect {
                self.damage_numbers.show_damage(*amount, false, false);
            }
        }

        // Loot
        report.loot_collected = self.loot.tick(dt, player);
        for record in &report.loot_collected {
            self.chat
                .add_system_message(&format!("Picked up {}", record.item_name));
        }

        // Panels
        self.chat.tick(dt, self.chat_focused);
        self.dialog.tick(dt);
        self.damage_numbers.tick(dt);
        self.death_screen.tick(dt);

        // Save
        self.save.add_play_time(f64::from(dt));
        report.auto_saved = self.save.tick_auto_save(f64::from(dt));
        report
    }

    /// Flush the save and drop everything still pending
    pub fn shutdown(&mut self) {
        match self.save.save(DEFAULT_SLOT) {
            Ok(()) => {}
            Err(SaveError::SlotProtected(slot)) => {
                warn!("Skipping final save, slot {} holds an unreadable save", slot)
            }
            Err(e) => error!("Final save failed: {}", e),
        }
        self.sender.shutdown();
        info!("Tower client shut down after {:.1}s", self.elapsed);
    }
}
