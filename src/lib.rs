//! Tower Game - Headless Client Core
//!
//! Client-side state for the Tower MMORPG that does not depend on a renderer:
//! - Action sender (sequence numbers, rate limiting, pending queue, timeouts)
//! - Versioned local save data with slot-based persistence
//! - Observer dispatch for UI-facing events
//! - Headless panel models: chat, trade, dialog, sockets, death screen
//! - Cosmetic state: echo ghosts, floating damage numbers, loot pickups
//! - Bevy plugin that drives everything from the frame tick

pub mod actions;
pub mod chat;
pub mod client;
pub mod config;
pub mod damage_numbers;
pub mod death_screen;
pub mod dialog;
pub mod echo;
pub mod events;
pub mod logging;
pub mod loot;
pub mod save;
pub mod sockets;
pub mod trade;
