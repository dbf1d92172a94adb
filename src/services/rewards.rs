//! Reward ledger: free appointment every Nth qualifying visit
//!
//! The counter lives on the client row. It grows when a paid appointment
//! enters the qualifying status and shrinks (never below zero) when it leaves
//! it. At creation time a counter that is a positive multiple of the
//! threshold makes the new appointment free and resets the counter.
//! Callers apply every result inside the transaction that writes the
//! appointment.

use rust_decimal::Decimal;

use crate::models::appointment::AppointmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    threshold: u32,
    qualifying: AppointmentStatus,
}

impl RewardPolicy {
    pub fn new(threshold: u32, qualifying: AppointmentStatus) -> Self {
        Self {
            threshold: threshold.max(1),
            qualifying,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn qualifying(&self) -> AppointmentStatus {
        self.qualifying
    }

    /// Decide price and counter for an appointment about to be created
    pub fn evaluate_new_appointment(&self, counter: i32, service_price: Decimal) -> RewardDecision {
        if counter > 0 && counter % self.threshold as i32 == 0 {
            RewardDecision {
                is_free: true,
                price: Decimal::ZERO,
                counter: 0,
            }
        } else {
            RewardDecision {
                is_free: false,
                price: service_price,
                counter,
            }
        }
    }

    /// Counter movement for a status change of one appointment
    pub fn on_status_crossing(
        &self,
        old: AppointmentStatus,
        new: AppointmentStatus,
        is_free: bool,
    ) -> CounterChange {
        if is_free {
            return CounterChange::None;
        }
        match (old == self.qualifying, new == self.qualifying) {
            (false, true) => CounterChange::Increment,
            (true, false) => CounterChange::Decrement,
            _ => CounterChange::None,
        }
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::new(5, AppointmentStatus::Completed)
    }
}

/// Outcome of the creation-time check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardDecision {
    pub is_free: bool,
    pub price: Decimal,
    /// Counter value to persist with the new appointment
    pub counter: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterChange {
    None,
    Increment,
    Decrement,
}

impl CounterChange {
    pub fn delta(&self) -> i32 {
        match self {
            CounterChange::None => 0,
            CounterChange::Increment => 1,
            CounterChange::Decrement => -1,
        }
    }

    /// New counter value, floored at zero
    pub fn apply(&self, counter: i32) -> i32 {
        (counter + self.delta()).max(0)
    }
}
