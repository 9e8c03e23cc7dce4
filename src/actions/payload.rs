//! Per-action payloads and input validation.
//!
//! Payload field names match what the server's input layer expects
//! (`dir_x`/`dir_y`/`dir_z`, `weapon_id`, ...). Each payload is encoded as its
//! own JSON string and carried inside the envelope's `action_data` field.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ActionError;

/// Longest accepted weapon/ability/interaction id
pub const MAX_ID_LEN: usize = 256;

/// Per-component tolerance for "nearly zero" direction vectors
pub const DIRECTION_EPSILON: f32 = 1.0e-4;

/// Category of player action. Each category is rate-limited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Move,
    Attack,
    Parry,
    Dodge,
    UseAbility,
    Interact,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Attack => "attack",
            Self::Parry => "parry",
            Self::Dodge => "dodge",
            Self::UseAbility => "use_ability",
            Self::Interact => "interact",
        }
    }

    pub fn all() -> [ActionType; 6] {
        [
            Self::Move,
            Self::Attack,
            Self::Parry,
            Self::Dodge,
            Self::UseAbility,
            Self::Interact,
        ]
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveActionData {
    pub dir_x: f32,
    pub dir_y: f32,
    pub dir_z: f32,
    pub sprinting: bool,
}

impl MoveActionData {
    pub fn new(direction: Vec3, sprinting: bool) -> Self {
        let dir = direction.normalize_or_zero();
        Self {
            dir_x: dir.x,
            dir_y: dir.y,
            dir_z: dir.z,
            sprinting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackActionData {
    pub weapon_id: String,
    pub combo_step: u32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub dir_z: f32,
}

impl AttackActionData {
    pub fn new(weapon_id: &str, combo_step: u32, direction: Vec3) -> Self {
        let dir = direction.normalize_or_zero();
        Self {
            weapon_id: weapon_id.to_string(),
            combo_step,
            dir_x: dir.x,
            dir_y: dir.y,
            dir_z: dir.z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParryActionData {
    pub timing_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DodgeActionData {
    pub dir_x: f32,
    pub dir_y: f32,
    pub dir_z: f32,
}

impl DodgeActionData {
    pub fn new(direction: Vec3) -> Self {
        let dir = direction.normalize_or_zero();
        Self {
            dir_x: dir.x,
            dir_y: dir.y,
            dir_z: dir.z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityActionData {
    pub ability_id: String,
    pub target_x: f32,
    pub target_y: f32,
    pub target_z: f32,
    pub target_entity: u64,
}

impl AbilityActionData {
    pub fn new(ability_id: &str, target: Vec3, target_entity: u64) -> Self {
        Self {
            ability_id: ability_id.to_string(),
            target_x: target.x,
            target_y: target.y,
            target_z: target.z,
            target_entity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractActionData {
    pub target_entity: u64,
    pub interaction_type: String,
}

/// Direction must be finite and not (nearly) zero
pub fn validate_direction(direction: Vec3) -> Result<(), ActionError> {
    if !direction.is_finite() {
        return Err(ActionError::ValidationFailed(
            "direction is not finite".to_string(),
        ));
    }
    if direction.abs().max_element() <= DIRECTION_EPSILON {
        return Err(ActionError::ValidationFailed(
            "direction is zero".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_id(field: &str, id: &str) -> Result<(), ActionError> {
    if id.is_empty() {
        return Err(ActionError::ValidationFailed(format!("empty {}", field)));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(ActionError::ValidationFailed(format!(
            "{} longer than {} characters",
            field, MAX_ID_LEN
        )));
    }
    Ok(())
}
