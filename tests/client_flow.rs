//! End-to-end flows through `TowerClient`: config loading, a full trade,
//! an NPC conversation, socketing and a death followed by respawn.

use std::sync::{Arc, Mutex};

use bevy::math::Vec3;
use tempfile::TempDir;
use tower_client::actions::{ActionResult, ActionType, ChannelTransport};
use tower_client::client::TowerClient;
use tower_client::config::ClientConfig;
use tower_client::death_screen::{DeathScreenEvent, DeathSummary};
use tower_client::dialog::DialogEvent;
use tower_client::echo::EchoKind;
use tower_client::sockets::SocketEvent;
use tower_client::trade::{TradeEvent, TradeItem, TradeState};

fn client() -> TowerClient {
    let mut config = ClientConfig::default();
    config.save.auto_save_interval = None;
    TowerClient::in_memory(config)
}

#[test]
fn ron_config_drives_the_client() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("client.ron");
    std::fs::write(
        &path,
        "(sender: (max_pending: 2, min_action_interval: 0.0), save: (auto_save_interval: None))",
    )
    .unwrap();

    let config = ClientConfig::load(&path).unwrap();
    assert_eq!(config.sender.max_pending, 2);
    assert_eq!(config.save.auto_save_interval, None);

    let mut client = TowerClient::in_memory(config);
    assert!(!client.save.auto_save_enabled());
    for _ in 0..2 {
        client
            .with_sender(|sender, now| sender.send_move(Vec3::X, false, now))
            .unwrap();
    }
    assert!(client
        .with_sender(|sender, now| sender.send_move(Vec3::X, false, now))
        .is_err());
}

#[test]
fn loopback_server_acknowledges_everything() {
    let mut client = client();
    let (transport, server) = ChannelTransport::new();
    client.sender.set_transport(Box::new(transport));
    client.sender.set_player_id(77);

    let mut sent = Vec::new();
    for _ in 0..10 {
        sent.push(
            client
                .with_sender(|sender, now| sender.send_dodge(Vec3::Y, now))
                .unwrap(),
        );
        client.tick(0.1);
    }

    let mut acked = 0;
    for envelope in server.try_iter() {
        assert_eq!(envelope.player_id, 77);
        assert_eq!(envelope.action_type, ActionType::Dodge);
        let result = ActionResult::accepted(envelope.sequence_number, serde_json::Value::Null);
        if client.receive_result(&result).is_some() {
            acked += 1;
        }
    }
    assert_eq!(acked, sent.len());
    assert_eq!(client.sender.pending_count(), 0);
}

#[test]
fn full_trade_between_two_players() {
    let mut client = client();
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    client.trade.subscribe(move |e| log.lock().unwrap().push(e.clone()));

    client.trade.start("p-2", "Vex");
    client
        .trade
        .add_my_item(TradeItem {
            item_name: "Ember Blade".to_string(),
            quantity: 1,
            rarity: "Rare".to_string(),
        })
        .unwrap();
    client.trade.set_my_shards(250).unwrap();
    client.trade.update_remote_shards(400);

    client.trade.lock().unwrap();
    assert_eq!(client.trade.state(), TradeState::Proposing);
    client.trade.set_remote_locked(true);
    assert_eq!(client.trade.state(), TradeState::Locked);

    client.trade.confirm().unwrap();
    client.trade.set_remote_confirmed(true);
    assert_eq!(client.trade.state(), TradeState::Confirmed);
    client.trade.complete().unwrap();
    assert_eq!(client.trade.state(), TradeState::Completed);

    let events = events.lock().unwrap();
    assert!(matches!(events[0], TradeEvent::ItemAdded(_)));
    assert_eq!(events[1], TradeEvent::Confirmed);
}

#[test]
fn npc_conversation() {
    let mut client = client();
    let chosen = Arc::new(Mutex::new(Vec::new()));
    let log = chosen.clone();
    client.dialog.subscribe(move |e| log.lock().unwrap().push(e.clone()));

    client
        .dialog
        .show_node_json(
            r#"{
                "id": 10,
                "speaker": "Archivist",
                "text": "The tower remembers.",
                "choices": [
                    {"text": "Tell me more", "next_node": 11},
                    {"text": "Bribe", "next_node": 12, "available": false, "requirement": "500 shards"}
                ]
            }"#,
        )
        .unwrap();
    assert!(client.dialog.is_typewriting());
    client.tick(5.0);
    assert!(!client.dialog.is_typewriting());
    assert_eq!(client.dialog.revealed_text(), "The tower remembers.");

    assert!(client.dialog.choose(1).is_err());
    assert_eq!(client.dialog.choose(0).unwrap(), 11);
    assert_eq!(
        chosen.lock().unwrap()[0],
        DialogEvent::ChoiceSelected {
            node_id: 10,
            choice_index: 0
        }
    );
}

#[test]
fn socket_a_gem_and_combine() {
    let mut client = client();
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    client.sockets.subscribe(move |e| log.lock().unwrap().push(e.clone()));

    client
        .sockets
        .load_equipment_json(
            "helm-1",
            r#"{"name": "Warden Helm", "sockets": [{"color": "Red"}, {"color": "Prismatic"}]}"#,
        )
        .unwrap();
    client
        .sockets
        .load_gems_json(
            r#"{"gems": [
                {"id": "g1", "name": "Ruby", "color": "Red", "tier": "Chipped"},
                {"id": "g2", "name": "Ruby", "color": "Red", "tier": "Chipped"},
                {"id": "g3", "name": "Ruby", "color": "Red", "tier": "Chipped"},
                {"id": "g4", "name": "Sapphire", "color": "Blue", "tier": "Chipped"}
            ]}"#,
        )
        .unwrap();

    assert!(client.sockets.insert_gem(0, "g4").is_err());
    client.sockets.insert_gem(1, "g4").unwrap();
    assert_eq!(
        events.lock().unwrap()[0],
        SocketEvent::Modified {
            equipment_id: "helm-1".to_string(),
            index: 1
        }
    );

    let combined = client.sockets.combine_gems("g1", "g2", "g3").unwrap();
    assert!(combined.starts_with("combined_red_"));
}

#[test]
fn death_and_respawn() {
    let mut client = client();
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    client.death_screen.subscribe(move |e| log.lock().unwrap().push(*e));

    client.on_player_death(DeathSummary {
        floor_reached: 4,
        monsters_slain: 9,
        time_survived: 95.0,
        echo_kind: EchoKind::Lingering,
    });
    assert!(client.death_screen.respawn().is_err());

    for _ in 0..4 {
        client.tick(1.0);
    }
    client.death_screen.respawn().unwrap();
    assert_eq!(*events.lock().unwrap(), vec![DeathScreenEvent::RespawnRequested]);
    assert_eq!(client.save.current().stats.total_deaths, 1);
}
