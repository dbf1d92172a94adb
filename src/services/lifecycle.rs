//! Appointment state machine
//!
//! ```text
//! Pending ──confirm──▶ Confirmed ──complete──▶ Completed
//!    │                     │
//!    └──────cancel─────────┴──────▶ Canceled
//! ```
//!
//! Cancellation is accepted from every status. Planning is pure: stores call
//! [`plan`] on the row they hold locked and write the result in the same
//! transaction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::rewards::{CounterChange, RewardPolicy};
use crate::{
    error::{AppError, AppResult},
    models::{appointment::Appointment, AppointmentStatus, Actor},
};

/// Status change requested by an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Confirm,
    Complete,
    Cancel,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
        }
    }
}

/// Writes a store performs for one accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    /// Give the slot back to the registry
    pub release_slot: bool,
    /// Reward counter movement of the appointment's client
    pub counter_change: CounterChange,
}

/// Capability check on an (actor, appointment) pair.
///
/// Cancel is open to both parties of the appointment; confirm and complete
/// belong to its provider.
pub fn authorize(actor: &Actor, transition: Transition, appointment: &Appointment) -> AppResult<()> {
    let allowed = match transition {
        Transition::Cancel => {
            actor.user_id == appointment.client_id || actor.user_id == appointment.provider_id
        }
        Transition::Confirm | Transition::Complete => {
            actor.require_provider()?;
            actor.user_id == appointment.provider_id
        }
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Permission(format!(
            "User {} may not {} appointment {}",
            actor.user_id,
            transition.as_str(),
            appointment.id
        )))
    }
}

/// Validate a transition and compute what has to be written
pub fn plan(
    appointment: &Appointment,
    actor: &Actor,
    transition: Transition,
    policy: &RewardPolicy,
) -> AppResult<TransitionPlan> {
    authorize(actor, transition, appointment)?;

    let from = appointment.status;
    let to = match (transition, from) {
        (Transition::Cancel, _) => AppointmentStatus::Canceled,
        (Transition::Confirm, AppointmentStatus::Pending) => AppointmentStatus::Confirmed,
        (Transition::Complete, AppointmentStatus::Confirmed) => AppointmentStatus::Completed,
        (Transition::Confirm, _) => {
            return Err(AppError::InvalidTransition(format!(
                "Only pending appointments can be confirmed (appointment {} is {})",
                appointment.id, from
            )))
        }
        (Transition::Complete, _) => {
            return Err(AppError::InvalidTransition(format!(
                "Only confirmed appointments can be completed (appointment {} is {})",
                appointment.id, from
            )))
        }
    };

    Ok(TransitionPlan {
        from,
        to,
        // A canceled appointment no longer owns its slot, which may be booked again
        release_slot: to == AppointmentStatus::Canceled && from != AppointmentStatus::Canceled,
        counter_change: policy.on_status_crossing(from, to, appointment.is_free),
    })
}
