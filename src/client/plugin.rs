use bevy::prelude::*;
use std::sync::{Arc, RwLock};
use tracing::error;

use crate::actions::{ActionOutcome, ActionResult};
use crate::client::TowerClient;
use crate::config::ClientConfig;
use crate::echo::EchoEffect;
use crate::logging::LoggingPlugin;
use crate::loot::LootCollected;

/// Drives a `TowerClient` from the frame clock.
///
/// Server results arrive as `ActionResultEvent`s; resolved and lost actions
/// leave as `ActionOutcomeEvent`s.
pub struct TowerClientPlugin {
    pub config: ClientConfig,
    /// Keep saves in memory instead of `config.save.directory`
    pub in_memory_saves: bool,
}

impl Default for TowerClientPlugin {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            in_memory_saves: false,
        }
    }
}

impl TowerClientPlugin {
    pub fn in_memory(config: ClientConfig) -> Self {
        Self {
            config,
            in_memory_saves: true,
        }
    }
}

impl Plugin for TowerClientPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<LoggingPlugin>() {
            app.add_plugins(LoggingPlugin {
                config: self.config.tracing.clone(),
            });
        }

        let client = if self.in_memory_saves {
            TowerClient::in_memory(self.config.clone())
        } else {
            TowerClient::with_file_saves(self.config.clone())
        };

        app.insert_resource(ClientResource(Arc::new(RwLock::new(client))))
            .add_event::<ActionResultEvent>()
            .add_event::<ActionOutcomeEvent>()
            .add_event::<EchoEffectEvent>()
            .add_event::<LootCollectedEvent>()
            .add_systems(Update, (apply_action_results, client_tick_system).chain());
    }
}

/// Shared handle so a network layer outside the ECS can reach the client
#[derive(Resource, Clone)]
pub struct ClientResource(pub Arc<RwLock<TowerClient>>);

/// Result received from the server for a sent action
#[derive(Event, Debug, Clone)]
pub struct ActionResultEvent(pub ActionResult);

#[derive(Event, Debug, Clone)]
pub struct ActionOutcomeEvent(pub ActionOutcome);

#[derive(Event, Debug, Clone, Copy)]
pub struct EchoEffectEvent(pub EchoEffect);

#[derive(Event, Debug, Clone)]
pub struct LootCollectedEvent(pub LootCollected);

fn apply_action_results(
    client_res: Res<ClientResource>,
    mut results: EventReader<ActionResultEvent>,
    mut outcomes: EventWriter<ActionOutcomeEvent>,
) {
    let Ok(mut client) = client_res.0.write() else {
        error!("Client lock poisoned, dropping action results");
        return;
    };
    for ActionResultEvent(result) in results.read() {
        if let Some(outcome) = client.receive_result(result) {
            outcomes.send(ActionOutcomeEvent(outcome));
        }
    }
}

fn client_tick_system(
    time: Res<Time>,
    client_res: Res<ClientResource>,
    mut outcomes: EventWriter<ActionOutcomeEvent>,
    mut echo_effects: EventWriter<EchoEffectEvent>,
    mut loot: EventWriter<LootCollectedEvent>,
) {
    let Ok(mut client) = client_res.0.write() else {
        error!("Client lock poisoned, skipping client tick");
        return;
    };
    let report = client.tick(time.delta_secs());

    for outcome in report.lost_actions {
        outcomes.send(ActionOutcomeEvent(outcome));
    }
    for effect in report.echo_effects {
        echo_effects.send(EchoEffectEvent(effect));
    }
    for record in report.loot_collected {
        loot.send(LootCollectedEvent(record));
    }
}
