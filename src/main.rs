//! Headless demo: drives a `TowerClient` for a few seconds against a loopback
//! "server" that acknowledges every action it receives over a channel.
//!
//! Usage: `tower-client-demo [config.json|config.ron]`

use anyhow::{Context, Result};
use bevy::math::Vec3;
use tracing::{debug, info};

use tower_client::actions::{ActionResult, ChannelTransport};
use tower_client::client::TowerClient;
use tower_client::config::ClientConfig;
use tower_client::death_screen::DeathSummary;
use tower_client::echo::EchoKind;
use tower_client::logging::init_tracing;

const FRAME_DT: f32 = 1.0 / 60.0;
const FRAMES: u32 = 300;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => ClientConfig::default(),
    };
    init_tracing(&config.tracing);

    let mut client = TowerClient::in_memory(config);
    let (transport, server_rx) = ChannelTransport::new();
    client.sender.set_transport(Box::new(transport));
    client.sender.set_player_id(1);
    client.set_player_position(Some(Vec3::ZERO));

    client.spawn_echo("Fallen Climber", EchoKind::Helpful, Vec3::new(80.0, 0.0, 0.0));
    client
        .loot
        .spawn_json(r#"{"name":"Echo Shard","rarity":"epic"}"#, Vec3::new(120.0, 0.0, 0.0))
        .context("spawning demo loot")?;

    let mut accepted = 0u32;
    let mut rejected = 0u32;

    for frame in 0..FRAMES {
        let angle = frame as f32 * 0.05;
        let direction = Vec3::new(angle.cos(), angle.sin(), 0.0);
        if let Err(e) = client.with_sender(|sender, now| sender.send_move(direction, false, now)) {
            debug!("frame {}: {}", frame, e);
        }
        if frame % 45 == 0 {
            if let Err(e) =
                client.with_sender(|sender, now| sender.send_attack("sword", 0, direction, now))
            {
                debug!("frame {}: {}", frame, e);
            }
        }

        // Loopback server: reject every fifth action
        for envelope in server_rx.try_iter() {
            let result = if envelope.sequence_number % 5 == 0 {
                ActionResult::rejected(envelope.sequence_number, "out of range")
            } else {
                ActionResult::accepted(envelope.sequence_number, serde_json::json!({ "ok": true }))
            };
            match client.receive_result(&result) {
                Some(outcome) if outcome.is_accepted() => accepted += 1,
                Some(_) => rejected += 1,
                None => {}
            }
        }

        let report = client.tick(FRAME_DT);
        for record in &report.loot_collected {
            info!("Collected {} ({})", record.item_name, record.rarity.name());
        }
    }

    client.on_player_death(DeathSummary {
        floor_reached: 3,
        monsters_slain: 17,
        time_survived: client.now() as f32,
        echo_kind: EchoKind::Helpful,
    });
    for line in client.death_screen.lines() {
        info!("{}", line);
    }

    info!(
        "Demo finished: {} accepted, {} rejected, {} pending, last seq {}",
        accepted,
        rejected,
        client.sender.pending_count(),
        client.sender.last_sequence()
    );
    for line in client.chat.lines() {
        info!("chat | {}", line);
    }
    client.shutdown();
    Ok(())
}
