//! Business logic services

pub mod appointments;
pub mod lifecycle;
pub mod rewards;
pub mod schedules;
pub mod slots;
pub mod stats;

use std::sync::Arc;

use crate::{config::BookingConfig, error::AppResult, repository::BookingStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub schedules: schedules::SchedulesService,
    pub slots: slots::SlotsService,
    pub appointments: appointments::AppointmentsService,
    pub stats: stats::StatsService,
    store: Arc<dyn BookingStore>,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: Arc<dyn BookingStore>, booking: &BookingConfig) -> AppResult<Self> {
        let policy = booking.reward_policy()?;
        let slots = slots::SlotsService::new(store.clone());

        tracing::info!(
            threshold = policy.threshold(),
            qualifying = %policy.qualifying(),
            "Reward policy loaded"
        );

        Ok(Self {
            schedules: schedules::SchedulesService::new(store.clone(), slots.clone()),
            slots,
            appointments: appointments::AppointmentsService::new(
                store.clone(),
                policy,
                booking.max_reservation_retries,
            ),
            stats: stats::StatsService::new(store.clone(), booking.stats_window_days, booking.top_services),
            store,
        })
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
