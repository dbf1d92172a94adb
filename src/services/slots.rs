//! Slot registry: derive, reserve and release the slots of a work day

use std::sync::Arc;

use chrono::{Duration, NaiveTime};

use crate::{
    error::{AppError, AppResult},
    models::{Actor, TimeSlot, WorkDay},
    repository::BookingStore,
};

/// Times of day produced by a work day template.
///
/// Two runs of fixed-length steps: start up to lunch start, then lunch end
/// up to end of day. A slot starts strictly before the boundary; the partial
/// interval that would cross it is dropped, as is any step wrapping past
/// midnight.
pub fn slot_times(day: &WorkDay) -> AppResult<Vec<NaiveTime>> {
    let (Some(start), Some(end), Some(lunch_start), Some(lunch_end)) = (
        day.start_time,
        day.end_time,
        day.lunch_start_time,
        day.lunch_end_time,
    ) else {
        return Err(AppError::Configuration(format!(
            "Work day {} needs start, end and lunch times before slots can be generated",
            day.id
        )));
    };
    if day.slot_duration <= 0 {
        return Err(AppError::Configuration(format!(
            "Work day {} has a non-positive slot duration ({})",
            day.id, day.slot_duration
        )));
    }
    let step = Duration::minutes(day.slot_duration as i64);

    let mut times = Vec::new();
    for (from, until) in [(start, lunch_start), (lunch_end, end)] {
        let mut current = from;
        while current < until {
            times.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
    }
    Ok(times)
}

#[derive(Clone)]
pub struct SlotsService {
    store: Arc<dyn BookingStore>,
}

impl SlotsService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Deactivate the current slots of the work day and create fresh ones
    pub async fn generate(&self, day: &WorkDay) -> AppResult<Vec<TimeSlot>> {
        let times = slot_times(day)?;
        let slots = self.store.replace_slots(day.id, &times).await?;
        tracing::info!(
            work_day_id = day.id,
            count = slots.len(),
            "Generated time slots"
        );
        Ok(slots)
    }

    pub async fn list_available(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>> {
        let day = self.store.get_work_day(work_day_id).await?;
        if !day.is_active {
            return Err(AppError::NotFound(format!("Work day {} not found", work_day_id)));
        }
        self.store.list_available_slots(work_day_id).await
    }

    /// Mark a slot as taken; exactly one of several concurrent callers succeeds
    pub async fn reserve(&self, slot_id: i32) -> AppResult<()> {
        self.store.reserve_slot(slot_id).await
    }

    /// Make a slot bookable again (idempotent)
    pub async fn release(&self, slot_id: i32) -> AppResult<()> {
        self.store.release_slot(slot_id).await
    }

    /// Permanently remove one slot of a work day owned by the actor
    pub async fn delete(&self, actor: &Actor, slot_id: i32) -> AppResult<()> {
        actor.require_provider()?;
        let slot = self.store.get_slot(slot_id).await?;
        let day = self.store.get_work_day(slot.work_day_id).await?;
        if day.provider_id != actor.user_id {
            return Err(AppError::Permission(format!(
                "Slot {} belongs to another provider",
                slot_id
            )));
        }
        self.store.delete_slot(slot_id).await
    }

    /// Permanently remove every slot of a work day
    pub async fn delete_all(&self, work_day_id: i32) -> AppResult<u64> {
        let removed = self.store.delete_slots(work_day_id).await?;
        tracing::info!(work_day_id, removed, "Deleted time slots");
        Ok(removed)
    }
}
