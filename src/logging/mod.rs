//! Structured Logging & Tracing
//!
//! All subsystems log through `tracing` macros. This module turns a
//! `TracingConfig` into an `EnvFilter` and installs a compact fmt subscriber
//! once per process. `RUST_LOG` wins over the configured filter when set.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Installs the subscriber from the `TracingConfig` it was built with
pub struct LoggingPlugin {
    pub config: TracingConfig,
}

impl Default for LoggingPlugin {
    fn default() -> Self {
        Self {
            config: TracingConfig::default(),
        }
    }
}

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&self.config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_targets: bool,
    pub show_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("tower_client::actions".to_string(), LogLevel::Info),
                ("tower_client::save".to_string(), LogLevel::Info),
                ("tower_client::echo".to_string(), LogLevel::Warn),
                ("tower_client::damage_numbers".to_string(), LogLevel::Warn),
            ],
            show_targets: true,
            show_thread_ids: false,
        }
    }
}

impl TracingConfig {
    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Idempotent: the first call wins, later calls are ignored.
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let show_targets = config.show_targets;
    let show_thread_ids = config.show_thread_ids;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .with_thread_ids(show_thread_ids)
            .compact();

        // Another global subscriber may already be installed
        let _ = subscriber.try_init();
    });
}
