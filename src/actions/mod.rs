//! Action Sender
//!
//! Outbound player actions (move, attack, parry, dodge, ability, interact):
//! - Monotonic sequence numbers, first is 1
//! - Per-action-type rate limiting against the last accepted send
//! - Bounded pending queue awaiting server acknowledgment
//! - Timeout sweep that reports unacknowledged actions as lost
//!
//! The server stays authoritative. The sender only tracks what it has sent
//! and matches results coming back to the packets that produced them.

pub mod config;
pub mod payload;
pub mod transport;

pub use config::SenderConfig;
pub use payload::{
    AbilityActionData, ActionType, AttackActionData, DodgeActionData, InteractActionData,
    MoveActionData, ParryActionData,
};
pub use transport::{ActionEnvelope, ActionTransport, ChannelTransport, TransportError};

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

use crate::events::{Observers, SubscriptionId};
use payload::{validate_direction, validate_id};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("{action} rate limited: {elapsed_ms:.1}ms since last send, minimum {min_interval_ms:.1}ms")]
    RateLimited {
        action: ActionType,
        elapsed_ms: f64,
        min_interval_ms: f64,
    },
    #[error("pending queue full ({pending}/{max})")]
    QueueFull { pending: usize, max: usize },
    #[error("invalid action input: {0}")]
    ValidationFailed(String),
    #[error("action {sequence} rejected by server: {reason}")]
    Rejected { sequence: u64, reason: String },
    #[error("action {sequence} timed out after {age_secs:.2}s")]
    TimedOut { sequence: u64, age_secs: f64 },
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

/// A sent action awaiting acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPacket {
    pub player_id: u64,
    pub action_type: ActionType,
    pub action_data: String,
    /// Milliseconds since Unix epoch
    pub timestamp: i64,
    pub sequence_number: u64,
    /// Local clock, seconds
    pub local_send_time: f64,
}

impl ActionPacket {
    pub fn envelope(&self) -> ActionEnvelope {
        ActionEnvelope {
            player_id: self.player_id,
            action_type: self.action_type,
            action_data: self.action_data.clone(),
            timestamp: self.timestamp,
            sequence_number: self.sequence_number,
        }
    }
}

/// Server acknowledgment for one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub sequence_number: u64,
    pub accepted: bool,
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(default)]
    pub state_changes: serde_json::Value,
    #[serde(default)]
    pub server_timestamp: i64,
}

impl ActionResult {
    pub fn accepted(sequence_number: u64, state_changes: serde_json::Value) -> Self {
        Self {
            sequence_number,
            accepted: true,
            rejection_reason: String::new(),
            state_changes,
            server_timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn rejected(sequence_number: u64, reason: &str) -> Self {
        Self {
            sequence_number,
            accepted: false,
            rejection_reason: reason.to_string(),
            state_changes: serde_json::Value::Null,
            server_timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// How a sent action was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Accepted {
        sequence: u64,
        action_type: ActionType,
        rtt_ms: f64,
        state_changes: serde_json::Value,
    },
    Rejected {
        sequence: u64,
        action_type: ActionType,
        reason: String,
        rtt_ms: f64,
    },
    Lost {
        sequence: u64,
        action_type: ActionType,
        age_secs: f64,
    },
}

impl ActionOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Accepted { sequence, .. }
            | Self::Rejected { sequence, .. }
            | Self::Lost { sequence, .. } => *sequence,
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Accepted { action_type, .. }
            | Self::Rejected { action_type, .. }
            | Self::Lost { action_type, .. } => *action_type,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Accepted state changes, or the matching error for rejections and losses
    pub fn into_result(self) -> Result<serde_json::Value, ActionError> {
        match self {
            Self::Accepted { state_changes, .. } => Ok(state_changes),
            Self::Rejected {
                sequence, reason, ..
            } => Err(ActionError::Rejected { sequence, reason }),
            Self::Lost {
                sequence, age_secs, ..
            } => Err(ActionError::TimedOut { sequence, age_secs }),
        }
    }
}

/// Client-side action sequencer
pub struct ActionSender {
    config: SenderConfig,
    player_id: u64,
    sequence_counter: u64,
    pending: VecDeque<ActionPacket>,
    last_action_time: HashMap<ActionType, f64>,
    transport: Option<Box<dyn ActionTransport>>,
    observers: Observers<ActionOutcome>,
}

impl std::fmt::Debug for ActionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSender")
            .field("config", &self.config)
            .field("player_id", &self.player_id)
            .field("sequence_counter", &self.sequence_counter)
            .field("pending", &self.pending.len())
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

impl Default for ActionSender {
    fn default() -> Self {
        Self::new(SenderConfig::default())
    }
}

impl ActionSender {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config: config.clamped(),
            player_id: 0,
            sequence_counter: 0,
            pending: VecDeque::new(),
            last_action_time: HashMap::new(),
            transport: None,
            observers: Observers::new(),
        }
    }

    pub fn with_transport(mut self, transport: Box<dyn ActionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn set_transport(&mut self, transport: Box<dyn ActionTransport>) {
        self.transport = Some(transport);
    }

    pub fn clear_transport(&mut self) {
        self.transport = None;
    }

    pub fn set_player_id(&mut self, player_id: u64) {
        self.player_id = player_id;
    }

    pub fn player_id(&self) -> u64 {
        self.player_id
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Register a callback for every resolved action
    pub fn on_outcome<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ActionOutcome) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn remove_outcome_observer(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ============ Typed helpers ============

    pub fn send_move(
        &mut self,
        direction: Vec3,
        sprinting: bool,
        now: f64,
    ) -> Result<u64, ActionError> {
        if self.config.enable_input_validation {
            validate_direction(direction)?;
        }
        let data = MoveActionData::new(direction, sprinting);
        self.send_payload(ActionType::Move, &data, now)
    }

    pub fn send_attack(
        &mut self,
        weapon_id: &str,
        combo_step: u32,
        direction: Vec3,
        now: f64,
    ) -> Result<u64, ActionError> {
        if self.config.enable_input_validation {
            validate_id("weapon_id", weapon_id)?;
            validate_direction(direction)?;
        }
        let data = AttackActionData::new(weapon_id, combo_step, direction);
        self.send_payload(ActionType::Attack, &data, now)
    }

    pub fn send_parry(&mut self, timing_ms: i64, now: f64) -> Result<u64, ActionError> {
        if self.config.enable_input_validation && timing_ms < 0 {
            return Err(ActionError::ValidationFailed(format!(
                "negative parry timing {}ms",
                timing_ms
            )));
        }
        self.send_payload(ActionType::Parry, &ParryActionData { timing_ms }, now)
    }

    pub fn send_dodge(&mut self, direction: Vec3, now: f64) -> Result<u64, ActionError> {
        if self.config.enable_input_validation {
            validate_direction(direction)?;
        }
        self.send_payload(ActionType::Dodge, &DodgeActionData::new(direction), now)
    }

    pub fn send_ability(
        &mut self,
        ability_id: &str,
        target: Vec3,
        target_entity: u64,
        now: f64,
    ) -> Result<u64, ActionError> {
        if self.config.enable_input_validation {
            validate_id("ability_id", ability_id)?;
            if !target.is_finite() {
                return Err(ActionError::ValidationFailed(
                    "ability target is not finite".to_string(),
                ));
            }
        }
        let data = AbilityActionData::new(ability_id, target, target_entity);
        self.send_payload(ActionType::UseAbility, &data, now)
    }

    pub fn send_interact(
        &mut self,
        target_entity: u64,
        interaction_type: &str,
        now: f64,
    ) -> Result<u64, ActionError> {
        if self.config.enable_input_validation {
            if target_entity == 0 {
                return Err(ActionError::ValidationFailed(
                    "interact target is zero".to_string(),
                ));
            }
            validate_id("interaction_type", interaction_type)?;
        }
        let data = InteractActionData {
            target_entity,
            interaction_type: interaction_type.to_string(),
        };
        self.send_payload(ActionType::Interact, &data, now)
    }

    fn send_payload<T: Serialize>(
        &mut self,
        action_type: ActionType,
        payload: &T,
        now: f64,
    ) -> Result<u64, ActionError> {
        let action_data =
            serde_json::to_string(payload).map_err(|e| ActionError::Encode(e.to_string()))?;
        self.try_send(action_type, action_data, now)
    }

    // ============ Core ============

    /// Rate-limit, enqueue and forward one already-encoded action.
    ///
    /// Returns the assigned sequence number. A missing or failing transport
    /// does not fail the send: the packet stays pending and will time out.
    pub fn try_send(
        &mut self,
        action_type: ActionType,
        action_data: String,
        now: f64,
    ) -> Result<u64, ActionError> {
        if let Some(&last) = self.last_action_time.get(&action_type) {
            let elapsed = now - last;
            if elapsed < self.config.min_action_interval {
                debug!(
                    "{} rate limited ({:.1}ms < {:.1}ms)",
                    action_type,
                    elapsed * 1000.0,
                    self.config.min_action_interval * 1000.0
                );
                return Err(ActionError::RateLimited {
                    action: action_type,
                    elapsed_ms: elapsed * 1000.0,
                    min_interval_ms: self.config.min_action_interval * 1000.0,
                });
            }
        }

        if self.pending.len() >= self.config.max_pending {
            warn!(
                "Pending queue full ({}/{}), dropping {}",
                self.pending.len(),
                self.config.max_pending,
                action_type
            );
            return Err(ActionError::QueueFull {
                pending: self.pending.len(),
                max: self.config.max_pending,
            });
        }

        self.sequence_counter += 1;
        let packet = ActionPacket {
            player_id: self.player_id,
            action_type,
            action_data,
            timestamp: chrono::Utc::now().timestamp_millis(),
            sequence_number: self.sequence_counter,
            local_send_time: now,
        };
        self.last_action_time.insert(action_type, now);

        let envelope = packet.envelope();
        let sequence = packet.sequence_number;
        self.pending.push_back(packet);

        match self.transport.as_mut() {
            Some(transport) => {
                if let Err(e) = transport.send(&envelope) {
                    warn!("Transport failed for {} seq={}: {}", action_type, sequence, e);
                }
            }
            None => {
                warn!(
                    "No transport attached, {} seq={} queued locally",
                    action_type, sequence
                );
            }
        }

        debug!("Sent {} seq={}", action_type, sequence);
        Ok(sequence)
    }

    /// Match a server result against the pending queue.
    ///
    /// Unknown sequence numbers (already resolved, timed out, or never sent)
    /// leave the sender untouched and return `None`.
    pub fn on_result(&mut self, result: &ActionResult, now: f64) -> Option<ActionOutcome> {
        let Some(index) = self
            .pending
            .iter()
            .position(|p| p.sequence_number == result.sequence_number)
        else {
            warn!(
                "Result for unknown action seq={}",
                result.sequence_number
            );
            return None;
        };
        let packet = self.pending.remove(index)?;
        let rtt_ms = ((now - packet.local_send_time) * 1000.0).max(0.0);

        let outcome = if result.accepted {
            debug!(
                "{} seq={} accepted ({:.1}ms)",
                packet.action_type, packet.sequence_number, rtt_ms
            );
            ActionOutcome::Accepted {
                sequence: packet.sequence_number,
                action_type: packet.action_type,
                rtt_ms,
                state_changes: result.state_changes.clone(),
            }
        } else {
            info!(
                "{} seq={} rejected: {}",
                packet.action_type, packet.sequence_number, result.rejection_reason
            );
            ActionOutcome::Rejected {
                sequence: packet.sequence_number,
                action_type: packet.action_type,
                reason: result.rejection_reason.clone(),
                rtt_ms,
            }
        };

        self.observers.notify(&outcome);
        Some(outcome)
    }

    /// Drop every pending action whose age reached the timeout, oldest first
    pub fn sweep_timeouts(&mut self, now: f64) -> Vec<ActionOutcome> {
        let timeout = self.config.pending_action_timeout;
        let mut lost = Vec::new();
        self.pending.retain(|packet| {
            let age = now - packet.local_send_time;
            if age >= timeout {
                lost.push(ActionOutcome::Lost {
                    sequence: packet.sequence_number,
                    action_type: packet.action_type,
                    age_secs: age,
                });
                false
            } else {
                true
            }
        });

        for outcome in &lost {
            warn!(
                "{} seq={} timed out",
                outcome.action_type(),
                outcome.sequence()
            );
            self.observers.notify(outcome);
        }
        lost
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, sequence: u64) -> bool {
        self.pending.iter().any(|p| p.sequence_number == sequence)
    }

    pub fn pending(&self) -> impl Iterator<Item = &ActionPacket> {
        self.pending.iter()
    }

    /// Last sequence number issued, 0 before the first send
    pub fn last_sequence(&self) -> u64 {
        self.sequence_counter
    }

    /// Clear the queue and rate table. Sequence numbering continues.
    pub fn shutdown(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "Action sender shut down with {} pending actions",
                self.pending.len()
            );
        }
        self.pending.clear();
        self.last_action_time.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sender(max_pending: usize, interval: f64) -> ActionSender {
        ActionSender::new(SenderConfig {
            max_pending,
            min_action_interval: interval,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_sequence_is_one() {
        let mut s = sender(8, 0.0);
        assert_eq!(s.last_sequence(), 0);
        assert_eq!(s.send_move(Vec3::X, false, 0.0), Ok(1));
        assert_eq!(s.send_move(Vec3::X, false, 0.1), Ok(2));
        assert_eq!(s.last_sequence(), 2);
    }

    #[test]
    fn test_queue_full_on_third_move() {
        let mut s = sender(2, 0.0);
        assert_eq!(s.send_move(Vec3::X, false, 0.0), Ok(1));
        assert_eq!(s.send_move(Vec3::X, false, 0.0), Ok(2));
        assert_eq!(
            s.send_move(Vec3::X, false, 0.0),
            Err(ActionError::QueueFull { pending: 2, max: 2 })
        );
        assert_eq!(s.pending_count(), 2);
    }

    #[test]
    fn test_rate_limit_per_type() {
        let mut s = sender(8, 0.05);
        assert!(s.send_move(Vec3::X, false, 1.0).is_ok());
        let err = s.send_move(Vec3::X, false, 1.01).unwrap_err();
        assert!(matches!(err, ActionError::RateLimited { action: ActionType::Move, .. }));
        // Other types are independent
        assert!(s.send_dodge(Vec3::Z, 1.01).is_ok());
        // Interval elapsed
        assert!(s.send_move(Vec3::X, false, 1.06).is_ok());
    }

    #[test]
    fn test_rejected_send_does_not_touch_rate_table() {
        let mut s = sender(1, 0.05);
        assert!(s.send_move(Vec3::X, false, 0.0).is_ok());
        // Queue full for the attack, so its rate window never starts
        assert!(matches!(
            s.send_attack("sword", 0, Vec3::X, 0.0),
            Err(ActionError::QueueFull { .. })
        ));
        s.on_result(&ActionResult::accepted(1, serde_json::Value::Null), 0.01);
        assert!(s.send_attack("sword", 0, Vec3::X, 0.01).is_ok());
    }

    #[test]
    fn test_validation_runs_before_rate_limit() {
        let mut s = sender(8, 10.0);
        assert!(s.send_move(Vec3::X, false, 0.0).is_ok());
        assert!(matches!(
            s.send_move(Vec3::ZERO, false, 0.0),
            Err(ActionError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let mut s = ActionSender::new(SenderConfig {
            enable_input_validation: false,
            ..Default::default()
        });
        assert!(s.send_move(Vec3::ZERO, false, 0.0).is_ok());
        assert!(s.send_parry(-5, 0.0).is_ok());
    }

    #[test]
    fn test_typed_validation() {
        let mut s = sender(8, 0.0);
        assert!(s.send_attack("", 0, Vec3::X, 0.0).is_err());
        assert!(s.send_parry(-1, 0.0).is_err());
        assert!(s.send_interact(0, "open", 0.0).is_err());
        assert!(s.send_interact(7, "", 0.0).is_err());
        assert!(s
            .send_ability("fireball", Vec3::new(f32::NAN, 0.0, 0.0), 0, 0.0)
            .is_err());
        assert_eq!(s.pending_count(), 0);
        assert_eq!(s.last_sequence(), 0);
    }

    #[test]
    fn test_accept_removes_pending_and_reports_rtt() {
        let mut s = sender(8, 0.0);
        let seq = s.send_attack("sword", 2, Vec3::X, 10.0).unwrap();
        let outcome = s
            .on_result(
                &ActionResult::accepted(seq, serde_json::json!({"hp": 90})),
                10.25,
            )
            .unwrap();
        match outcome {
            ActionOutcome::Accepted {
                sequence,
                action_type,
                rtt_ms,
                state_changes,
            } => {
                assert_eq!(sequence, seq);
                assert_eq!(action_type, ActionType::Attack);
                assert!((rtt_ms - 250.0).abs() < 1e-6);
                assert_eq!(state_changes["hp"], 90);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!s.is_pending(seq));
    }

    #[test]
    fn test_reject_maps_to_error() {
        let mut s = sender(8, 0.0);
        let seq = s.send_parry(120, 0.0).unwrap();
        let outcome = s
            .on_result(&ActionResult::rejected(seq, "out of stamina"), 0.1)
            .unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(
            outcome.into_result(),
            Err(ActionError::Rejected {
                sequence: seq,
                reason: "out of stamina".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_result_is_noop() {
        let mut s = sender(8, 0.0);
        s.send_move(Vec3::X, false, 0.0).unwrap();
        assert!(s
            .on_result(&ActionResult::accepted(99, serde_json::Value::Null), 0.1)
            .is_none());
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn test_sweep_then_late_ack() {
        let mut s = sender(8, 0.0);
        let a = s.send_move(Vec3::X, false, 0.0).unwrap();
        let b = s.send_dodge(Vec3::X, 3.0).unwrap();

        assert!(s.sweep_timeouts(4.9).is_empty());
        let lost = s.sweep_timeouts(5.0);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].sequence(), a);
        assert!(matches!(
            lost[0].clone().into_result(),
            Err(ActionError::TimedOut { .. })
        ));

        // Late ack for the lost action is ignored
        assert!(s
            .on_result(&ActionResult::accepted(a, serde_json::Value::Null), 5.1)
            .is_none());
        // Second sweep does not report it again
        assert!(s.sweep_timeouts(5.2).is_empty());
        assert!(s.is_pending(b));
    }

    #[test]
    fn test_sweep_returns_oldest_first() {
        let mut s = sender(8, 0.0);
        s.send_move(Vec3::X, false, 0.0).unwrap();
        s.send_attack("axe", 0, Vec3::X, 0.5).unwrap();
        s.send_dodge(Vec3::X, 1.0).unwrap();
        let seqs: Vec<u64> = s.sweep_timeouts(20.0).iter().map(|o| o.sequence()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_observers_receive_outcomes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut s = sender(8, 0.0);
        let log = seen.clone();
        s.on_outcome(move |o| log.lock().unwrap().push(o.sequence()));

        let first = s.send_move(Vec3::X, false, 0.0).unwrap();
        let second = s.send_dodge(Vec3::X, 0.0).unwrap();
        s.on_result(&ActionResult::accepted(second, serde_json::Value::Null), 0.1);
        s.sweep_timeouts(10.0);

        assert_eq!(*seen.lock().unwrap(), vec![second, first]);
    }

    #[test]
    fn test_transport_receives_envelope() {
        let (transport, rx) = ChannelTransport::new();
        let mut s = sender(8, 0.0).with_transport(Box::new(transport));
        s.set_player_id(77);
        let seq = s.send_interact(12, "open_chest", 0.0).unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.sequence_number, seq);
        assert_eq!(envelope.player_id, 77);
        assert_eq!(envelope.action_type, ActionType::Interact);
        let data: InteractActionData = serde_json::from_str(&envelope.action_data).unwrap();
        assert_eq!(data.target_entity, 12);
        assert_eq!(data.interaction_type, "open_chest");
    }

    #[test]
    fn test_transport_failure_keeps_pending() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        let mut s = sender(8, 0.0).with_transport(Box::new(transport));
        let seq = s.send_move(Vec3::X, false, 0.0).unwrap();
        assert!(s.is_pending(seq));
    }

    #[test]
    fn test_shutdown_clears_queue_and_rate_table() {
        let mut s = sender(8, 1.0);
        s.send_move(Vec3::X, false, 0.0).unwrap();
        s.shutdown();
        assert_eq!(s.pending_count(), 0);
        assert_eq!(s.send_move(Vec3::X, false, 0.0), Ok(2));
    }

    #[test]
    fn test_action_result_json() {
        let result = ActionResult::from_json(
            r#"{"sequence_number": 4, "accepted": false, "rejection_reason": "dead"}"#,
        )
        .unwrap();
        assert_eq!(result.sequence_number, 4);
        assert!(!result.accepted);
        assert_eq!(result.rejection_reason, "dead");
        assert!(result.state_changes.is_null());
        assert!(ActionResult::from_json("not json").is_none());
    }
}
