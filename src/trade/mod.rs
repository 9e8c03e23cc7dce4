//! Player-to-Player Trade
//!
//! Local half of a two-sided item/shard exchange. Both sides must lock their
//! offer before either can confirm; the trade is confirmed once both sides
//! confirm. The remote side's offer and flags arrive from the server.
//!
//! Flow: Proposing -> (both locked) Locked -> (both confirmed) Confirmed -> Completed
//! Cancel is possible from any open state.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{Observers, SubscriptionId};

pub const DEFAULT_MAX_TRADE_ITEMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    Proposing, // items being placed
    Locked,    // both sides locked in (review)
    Confirmed, // both confirmed
    Completed, // trade executed
    Cancelled,
}

impl TradeState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Proposing => "Adding Items...",
            Self::Locked => "Review & Confirm",
            Self::Confirmed => "Trade Confirmed!",
            Self::Completed => "Trade Complete",
            Self::Cancelled => "Trade Cancelled",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeItem {
    pub item_name: String,
    pub quantity: u32,
    pub rarity: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("trade is {actual:?}, operation requires {expected:?}")]
    WrongState {
        expected: TradeState,
        actual: TradeState,
    },
    #[error("trade already closed ({0:?})")]
    Closed(TradeState),
    #[error("offer already holds the maximum of {max} items")]
    TooManyItems { max: usize },
    #[error("no offered item at index {0}")]
    InvalidIndex(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    ItemAdded(TradeItem),
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub max_trade_items: usize,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            max_trade_items: DEFAULT_MAX_TRADE_ITEMS,
        }
    }
}

#[derive(Debug)]
pub struct TradeSession {
    config: TradeConfig,
    other_player_id: String,
    other_player_name: String,
    state: TradeState,
    my_items: Vec<TradeItem>,
    remote_items: Vec<TradeItem>,
    my_shards: u64,
    remote_shards: u64,
    my_locked: bool,
    remote_locked: bool,
    my_confirmed: bool,
    remote_confirmed: bool,
    observers: Observers<TradeEvent>,
}

impl Default for TradeSession {
    fn default() -> Self {
        Self::new(TradeConfig::default())
    }
}

impl TradeSession {
    /// Idle session. Call `start` to open a trade.
    pub fn new(config: TradeConfig) -> Self {
        Self {
            config,
            other_player_id: String::new(),
            other_player_name: String::new(),
            state: TradeState::Cancelled,
            my_items: Vec::new(),
            remote_items: Vec::new(),
            my_shards: 0,
            remote_shards: 0,
            my_locked: false,
            remote_locked: false,
            my_confirmed: false,
            remote_confirmed: false,
            observers: Observers::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&TradeEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Open a fresh trade, discarding any previous offer state
    pub fn start(&mut self, other_player_id: &str, other_player_name: &str) {
        self.other_player_id = other_player_id.to_string();
        self.other_player_name = other_player_name.to_string();
        self.state = TradeState::Proposing;
        self.my_items.clear();
        self.remote_items.clear();
        self.my_shards = 0;
        self.remote_shards = 0;
        self.my_locked = false;
        self.remote_locked = false;
        self.my_confirmed = false;
        self.remote_confirmed = false;
        info!("Trade started with {}", other_player_name);
    }

    fn require(&self, expected: TradeState) -> Result<(), TradeError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TradeError::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    pub fn add_my_item(&mut self, item: TradeItem) -> Result<(), TradeError> {
        self.require(TradeState::Proposing)?;
        if self.my_items.len() >= self.config.max_trade_items {
            return Err(TradeError::TooManyItems {
                max: self.config.max_trade_items,
            });
        }
        self.my_items.push(item.clone());
        self.observers.notify(&TradeEvent::ItemAdded(item));
        Ok(())
    }

    pub fn remove_my_item(&mut self, index: usize) -> Result<TradeItem, TradeError> {
        self.require(TradeState::Proposing)?;
        if index >= self.my_items.len() {
            return Err(TradeError::InvalidIndex(index));
        }
        Ok(self.my_items.remove(index))
    }

    /// Negative amounts are clamped to zero
    pub fn set_my_shards(&mut self, amount: i64) -> Result<(), TradeError> {
        self.require(TradeState::Proposing)?;
        self.my_shards = amount.max(0) as u64;
        Ok(())
    }

    pub fn lock(&mut self) -> Result<(), TradeError> {
        self.require(TradeState::Proposing)?;
        self.my_locked = true;
        if self.my_locked && self.remote_locked {
            self.state = TradeState::Locked;
        }
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), TradeError> {
        self.require(TradeState::Locked)?;
        self.my_confirmed = true;
        self.check_confirmed();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), TradeError> {
        if !self.state.is_open() {
            return Err(TradeError::Closed(self.state));
        }
        self.state = TradeState::Cancelled;
        info!("Trade with {} cancelled", self.other_player_name);
        self.observers.notify(&TradeEvent::Cancelled);
        Ok(())
    }

    /// Server reports the exchange executed
    pub fn complete(&mut self) -> Result<(), TradeError> {
        self.require(TradeState::Confirmed)?;
        self.state = TradeState::Completed;
        info!("Trade with {} completed", self.other_player_name);
        Ok(())
    }

    fn check_confirmed(&mut self) {
        if self.my_confirmed && self.remote_confirmed && self.state == TradeState::Locked {
            self.state = TradeState::Confirmed;
            self.observers.notify(&TradeEvent::Confirmed);
        }
    }

    // ============ Remote updates ============

    pub fn update_remote_items(&mut self, items: Vec<TradeItem>) {
        self.remote_items = items;
    }

    pub fn update_remote_shards(&mut self, amount: u64) {
        self.remote_shards = amount;
    }

    pub fn set_remote_locked(&mut self, locked: bool) {
        self.remote_locked = locked;
        if self.my_locked && self.remote_locked && self.state == TradeState::Proposing {
            self.state = TradeState::Locked;
        }
    }

    pub fn set_remote_confirmed(&mut self, confirmed: bool) {
        self.remote_confirmed = confirmed;
        self.check_confirmed();
    }

    /// Server-driven override, no transition checks
    pub fn set_state(&mut self, state: TradeState) {
        self.state = state;
    }

    // ============ View ============

    pub fn state(&self) -> TradeState {
        self.state
    }

    pub fn other_player_id(&self) -> &str {
        &self.other_player_id
    }

    pub fn other_player_name(&self) -> &str {
        &self.other_player_name
    }

    pub fn my_items(&self) -> &[TradeItem] {
        &self.my_items
    }

    pub fn remote_items(&self) -> &[TradeItem] {
        &self.remote_items
    }

    pub fn my_shards(&self) -> u64 {
        self.my_shards
    }

    pub fn remote_shards(&self) -> u64 {
        self.remote_shards
    }

    pub fn is_my_locked(&self) -> bool {
        self.my_locked
    }

    pub fn is_remote_locked(&self) -> bool {
        self.remote_locked
    }

    pub fn can_lock(&self) -> bool {
        self.state == TradeState::Proposing && !self.my_locked
    }

    pub fn can_confirm(&self) -> bool {
        self.state == TradeState::Locked && !self.my_confirmed
    }

    pub fn can_cancel(&self) -> bool {
        self.state.is_open()
    }
}
