//! Validated donation events.
//!
//! A [`DonationRequest`] from the wire becomes a [`DonationEvent`] only if
//! its payload passes validation; malformed donations are rejected before
//! they can reach the queue. Once constructed, an event is immutable and
//! is consumed exactly once by the pipeline's process tick.

use compact_str::CompactString;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use tiprush_sdk::objects::{
    DonationEventView, DonationKind, DonationParameters, DonationRequest,
};

/// Widest accepted boost percentage.
pub const MAX_BOOST_PERCENT: u32 = 500;
/// Longest accepted boost duration.
pub const MAX_BOOST_DURATION: Duration = Duration::from_secs(3600);
/// Largest accepted heal amount (the health scale itself).
pub const MAX_HEAL_AMOUNT: u32 = 100;
/// Longest accepted enemy type name.
const MAX_ENEMY_TYPE_LEN: usize = 64;

/// A malformed donation payload. Never enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount_minor_units must be positive")]
    AmountNotPositive,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("missing parameter {name} for kind {kind}")]
    MissingParameter {
        kind: DonationKind,
        name: &'static str,
    },

    #[error("boost_percent {0} out of range 1..={MAX_BOOST_PERCENT}")]
    BoostPercentOutOfRange(u32),

    #[error("duration_seconds {0} out of range")]
    BoostDurationOutOfRange(u32),

    #[error("heal_amount {0} out of range 1..={MAX_HEAL_AMOUNT}")]
    HealAmountOutOfRange(u32),

    #[error("enemy_type too long ({0} chars)")]
    EnemyTypeTooLong(usize),
}

/// The typed effect carried by a validated donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectParams {
    Boost { percent: u32, duration: Duration },
    Heal { amount: u32 },
    Spawn { enemy_type: CompactString },
}

/// An admitted-or-pending donation event. Immutable once created; queue
/// position and processing outcome are tracked outside the record.
#[derive(Debug, Clone)]
pub struct DonationEvent {
    pub id: Uuid,
    pub actor_id: CompactString,
    pub actor_name: CompactString,
    pub amount_minor_units: u64,
    pub kind: DonationKind,
    pub effect: EffectParams,
    pub created_at: Instant,
}

impl DonationEvent {
    /// Validate a wire request into an event.
    ///
    /// Checks the generic fields first, then the parameter shape for the
    /// requested kind. `SpawnDragon` defaults its enemy type to `"dragon"`
    /// when the request carries none.
    pub fn from_request(request: DonationRequest, now: Instant) -> Result<Self, ValidationError> {
        if request.amount_minor_units == 0 {
            return Err(ValidationError::AmountNotPositive);
        }
        if request.actor_id.is_empty() {
            return Err(ValidationError::EmptyField { field: "actor_id" });
        }
        if request.actor_name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "actor_name",
            });
        }

        let effect = validate_parameters(request.kind, &request.parameters)?;

        Ok(Self {
            id: request.id,
            actor_id: request.actor_id,
            actor_name: request.actor_name,
            amount_minor_units: request.amount_minor_units,
            kind: request.kind,
            effect,
            created_at: now,
        })
    }

    /// Rebuild the wire-shaped echo of this event for alert broadcasts.
    pub fn to_view(&self) -> DonationEventView {
        let parameters = match &self.effect {
            EffectParams::Boost { percent, duration } => DonationParameters {
                boost_percent: Some(*percent),
                duration_seconds: Some(duration.as_secs() as u32),
                ..Default::default()
            },
            EffectParams::Heal { amount } => DonationParameters {
                heal_amount: Some(*amount),
                ..Default::default()
            },
            EffectParams::Spawn { enemy_type } => DonationParameters {
                enemy_type: Some(enemy_type.clone()),
                ..Default::default()
            },
        };
        DonationEventView {
            id: self.id,
            actor_id: self.actor_id.clone(),
            actor_name: self.actor_name.clone(),
            amount_minor_units: self.amount_minor_units,
            kind: self.kind,
            parameters,
        }
    }
}

fn validate_parameters(
    kind: DonationKind,
    parameters: &DonationParameters,
) -> Result<EffectParams, ValidationError> {
    match kind {
        DonationKind::Boost => {
            let percent = parameters.boost_percent.ok_or(
                ValidationError::MissingParameter {
                    kind,
                    name: "boost_percent",
                },
            )?;
            let seconds = parameters.duration_seconds.ok_or(
                ValidationError::MissingParameter {
                    kind,
                    name: "duration_seconds",
                },
            )?;
            if percent == 0 || percent > MAX_BOOST_PERCENT {
                return Err(ValidationError::BoostPercentOutOfRange(percent));
            }
            let duration = Duration::from_secs(u64::from(seconds));
            if seconds == 0 || duration > MAX_BOOST_DURATION {
                return Err(ValidationError::BoostDurationOutOfRange(seconds));
            }
            Ok(EffectParams::Boost { percent, duration })
        }
        DonationKind::Heal => {
            let amount =
                parameters
                    .heal_amount
                    .ok_or(ValidationError::MissingParameter {
                        kind,
                        name: "heal_amount",
                    })?;
            if amount == 0 || amount > MAX_HEAL_AMOUNT {
                return Err(ValidationError::HealAmountOutOfRange(amount));
            }
            Ok(EffectParams::Heal { amount })
        }
        DonationKind::SpawnEnemy => {
            let enemy_type = parameters.enemy_type.clone().ok_or(
                ValidationError::MissingParameter {
                    kind,
                    name: "enemy_type",
                },
            )?;
            validate_enemy_type(&enemy_type)?;
            Ok(EffectParams::Spawn { enemy_type })
        }
        DonationKind::SpawnDragon => {
            let enemy_type = parameters
                .enemy_type
                .clone()
                .unwrap_or_else(|| CompactString::const_new("dragon"));
            validate_enemy_type(&enemy_type)?;
            Ok(EffectParams::Spawn { enemy_type })
        }
    }
}

fn validate_enemy_type(enemy_type: &str) -> Result<(), ValidationError> {
    if enemy_type.is_empty() {
        return Err(ValidationError::EmptyField {
            field: "enemy_type",
        });
    }
    if enemy_type.len() > MAX_ENEMY_TYPE_LEN {
        return Err(ValidationError::EnemyTypeTooLong(enemy_type.len()));
    }
    Ok(())
}
