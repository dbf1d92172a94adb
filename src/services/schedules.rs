//! Work calendar service (weekly work day templates)

use std::sync::Arc;

use validator::Validate;

use super::slots::{slot_times, SlotsService};
use crate::{
    error::{AppError, AppResult},
    models::{
        schedule::{TimeSlot, WorkDay, WorkDayRequest},
        Actor, Role,
    },
    repository::BookingStore,
};

#[derive(Clone)]
pub struct SchedulesService {
    store: Arc<dyn BookingStore>,
    slots: SlotsService,
}

impl SchedulesService {
    pub fn new(store: Arc<dyn BookingStore>, slots: SlotsService) -> Self {
        Self { store, slots }
    }

    /// Load an active work day the actor owns; deactivated days are gone
    async fn owned_work_day(&self, actor: &Actor, id: i32) -> AppResult<WorkDay> {
        actor.require_provider()?;
        let day = self.store.get_work_day(id).await?;
        if !day.is_active {
            return Err(AppError::NotFound(format!("Work day {} not found", id)));
        }
        if day.provider_id != actor.user_id {
            return Err(AppError::Permission(format!(
                "Work day {} belongs to another provider",
                id
            )));
        }
        Ok(day)
    }

    /// Regenerate slots when the template is complete enough
    async fn refresh_slots(&self, day: &WorkDay) -> AppResult<()> {
        if day.is_active && day.is_schedulable() {
            self.slots.generate(day).await?;
        }
        Ok(())
    }

    // ---- Work days ----

    /// Active work days of the calling provider
    pub async fn list_own(&self, actor: &Actor) -> AppResult<Vec<WorkDay>> {
        actor.require_provider()?;
        self.store.list_work_days(actor.user_id).await
    }

    /// Active work days of any provider (public)
    pub async fn list_public(&self, provider_id: i32) -> AppResult<Vec<WorkDay>> {
        let provider = self.store.get_user(provider_id).await?;
        if provider.role != Role::Provider {
            return Err(AppError::NotFound(format!("Provider {} not found", provider_id)));
        }
        self.store.list_work_days(provider_id).await
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<WorkDay> {
        self.owned_work_day(actor, id).await
    }

    pub async fn create(&self, actor: &Actor, data: &WorkDayRequest) -> AppResult<WorkDay> {
        actor.require_provider()?;
        data.validate()?;

        let day = self.store.create_work_day(actor.user_id, data).await?;
        self.refresh_slots(&day).await?;

        tracing::info!(work_day_id = day.id, provider_id = actor.user_id, "Created work day");
        Ok(day)
    }

    /// Replace the template; the active slots are swapped for the new ones.
    ///
    /// A day switched off or left incomplete keeps no bookable slot.
    pub async fn update(&self, actor: &Actor, id: i32, data: &WorkDayRequest) -> AppResult<WorkDay> {
        data.validate()?;
        let mut day = self.owned_work_day(actor, id).await?;

        day.apply(data);
        let times = if day.is_active && day.is_schedulable() {
            slot_times(&day)?
        } else {
            Vec::new()
        };

        let day = self.store.update_work_day(id, data, &times).await?;
        tracing::info!(
            work_day_id = id,
            is_active = day.is_active,
            slots = times.len(),
            "Updated work day"
        );
        Ok(day)
    }

    /// Soft delete; the slots go inactive and stay for appointment history
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        self.owned_work_day(actor, id).await?;
        self.store.deactivate_work_day(id).await?;
        tracing::info!(work_day_id = id, "Deactivated work day");
        Ok(())
    }

    // ---- Slots ----

    /// Explicit regeneration of the slots of an owned work day
    pub async fn generate_slots(&self, actor: &Actor, id: i32) -> AppResult<Vec<TimeSlot>> {
        let day = self.owned_work_day(actor, id).await?;
        self.slots.generate(&day).await
    }

    pub async fn delete_slots(&self, actor: &Actor, id: i32) -> AppResult<u64> {
        self.owned_work_day(actor, id).await?;
        self.slots.delete_all(id).await
    }

    pub async fn delete_slot(&self, actor: &Actor, slot_id: i32) -> AppResult<()> {
        self.slots.delete(actor, slot_id).await
    }

    pub async fn list_available_slots(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>> {
        self.slots.list_available(work_day_id).await
    }
}
