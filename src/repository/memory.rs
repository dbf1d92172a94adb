//! In-process store used by tests and the `memory` backend.
//!
//! A single mutex guards the whole state, so every trait method is one
//! atomic step. Constraints enforced by the Postgres schema (slot
//! references, live-slot uniqueness, counter floor) are checked here by hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::BookingStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        appointment::{sort_for_provider, AppointmentDraft, ProviderAppointmentFilter},
        schedule::WorkDayRequest,
        Actor, Appointment, AppointmentDetails, AppointmentStatus, Role, Service, TimeSlot, User,
        Weekday, WorkDay,
    },
    services::{
        lifecycle::{self, Transition},
        rewards::RewardPolicy,
    },
};

#[derive(Default)]
struct State {
    next_id: i32,
    users: BTreeMap<i32, User>,
    services: BTreeMap<i32, Service>,
    work_days: BTreeMap<i32, WorkDay>,
    slots: BTreeMap<i32, TimeSlot>,
    appointments: BTreeMap<i32, Appointment>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: i32) -> AppResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    fn work_day_mut(&mut self, id: i32) -> AppResult<&mut WorkDay> {
        self.work_days
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Work day {} not found", id)))
    }

    fn reserve(&mut self, id: i32) -> AppResult<()> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", id)))?;
        if !(slot.is_active && slot.is_available) {
            return Err(AppError::SlotUnavailable(format!(
                "Time slot {} is already booked",
                id
            )));
        }
        slot.is_available = false;
        Ok(())
    }

    fn release(&mut self, id: i32) {
        if let Some(slot) = self.slots.get_mut(&id) {
            if slot.is_active {
                slot.is_available = true;
            }
        }
    }

    fn swap_slots(&mut self, work_day_id: i32, times: &[NaiveTime]) -> Vec<TimeSlot> {
        for slot in self
            .slots
            .values_mut()
            .filter(|s| s.work_day_id == work_day_id && s.is_active)
        {
            slot.is_active = false;
            slot.is_available = false;
        }

        let mut created = Vec::with_capacity(times.len());
        for &time in times {
            let id = self.next_id();
            let slot = TimeSlot {
                id,
                work_day_id,
                time,
                is_available: true,
                is_active: true,
            };
            self.slots.insert(id, slot.clone());
            created.push(slot);
        }
        created.sort_by_key(|s| s.time);
        created
    }

    fn slot_referenced(&self, slot_id: i32) -> bool {
        self.appointments.values().any(|a| a.time_slot_id == slot_id)
    }

    fn details(&self, appointment: &Appointment) -> AppResult<AppointmentDetails> {
        let missing = |what: &str, id: i32| AppError::Internal(format!("Dangling {} reference {}", what, id));
        let client = self
            .users
            .get(&appointment.client_id)
            .ok_or_else(|| missing("user", appointment.client_id))?;
        let service = self
            .services
            .get(&appointment.service_id)
            .ok_or_else(|| missing("service", appointment.service_id))?;
        let slot = self
            .slots
            .get(&appointment.time_slot_id)
            .ok_or_else(|| missing("slot", appointment.time_slot_id))?;
        let day = self
            .work_days
            .get(&slot.work_day_id)
            .ok_or_else(|| missing("work day", slot.work_day_id))?;

        Ok(AppointmentDetails {
            id: appointment.id,
            provider_id: appointment.provider_id,
            client_id: appointment.client_id,
            client_name: client.username.clone(),
            service_id: appointment.service_id,
            service_name: service.name.clone(),
            time_slot_id: appointment.time_slot_id,
            slot_time: slot.time,
            day_of_week: day.day_of_week,
            status: appointment.status,
            price: appointment.price,
            is_free: appointment.is_free,
            created_at: appointment.created_at,
        })
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with a zero reward counter
    pub async fn insert_user(&self, username: &str, role: Role) -> User {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let user = User {
            id,
            username: username.to_string(),
            email: None,
            role,
            reward_counter: 0,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        user
    }

    /// Seed an active catalog service
    pub async fn insert_service(&self, provider_id: i32, name: &str, price: Decimal) -> Service {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let service = Service {
            id,
            provider_id,
            name: name.to_string(),
            description: None,
            price,
            is_active: true,
        };
        state.services.insert(id, service.clone());
        service
    }

    pub async fn set_service_active(&self, id: i32, is_active: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let service = state
            .services
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", id)))?;
        service.is_active = is_active;
        Ok(())
    }

    pub async fn set_reward_counter(&self, user_id: i32, counter: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.user_mut(user_id)?.reward_counter = counter.max(0);
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_service(&self, id: i32) -> AppResult<Service> {
        let state = self.state.lock().await;
        state
            .services
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", id)))
    }

    async fn list_services(&self, provider_id: i32) -> AppResult<Vec<Service>> {
        let state = self.state.lock().await;
        Ok(state
            .services
            .values()
            .filter(|s| s.provider_id == provider_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn create_work_day(&self, provider_id: i32, data: &WorkDayRequest) -> AppResult<WorkDay> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let day = WorkDay {
            id,
            provider_id,
            day_of_week: data.day_of_week,
            is_active: data.is_active,
            start_time: data.start_time,
            end_time: data.end_time,
            lunch_start_time: data.lunch_start_time,
            lunch_end_time: data.lunch_end_time,
            slot_duration: data.slot_duration,
            weekday_order: Weekday::order(data.day_of_week),
            created_at: Utc::now(),
        };
        state.work_days.insert(id, day.clone());
        Ok(day)
    }

    async fn update_work_day(&self, id: i32, data: &WorkDayRequest, times: &[NaiveTime]) -> AppResult<WorkDay> {
        let mut state = self.state.lock().await;
        let day = state.work_day_mut(id)?;
        day.apply(data);
        let day = day.clone();
        state.swap_slots(id, times);
        Ok(day)
    }

    async fn get_work_day(&self, id: i32) -> AppResult<WorkDay> {
        let mut state = self.state.lock().await;
        state.work_day_mut(id).map(|d| d.clone())
    }

    async fn list_work_days(&self, provider_id: i32) -> AppResult<Vec<WorkDay>> {
        let state = self.state.lock().await;
        let mut days: Vec<WorkDay> = state
            .work_days
            .values()
            .filter(|d| d.provider_id == provider_id && d.is_active)
            .cloned()
            .collect();
        days.sort_by_key(|d| (d.weekday_order, d.id));
        Ok(days)
    }

    async fn deactivate_work_day(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.work_day_mut(id)?.is_active = false;
        for slot in state.slots.values_mut().filter(|s| s.work_day_id == id) {
            slot.is_active = false;
            slot.is_available = false;
        }
        Ok(())
    }

    async fn replace_slots(&self, work_day_id: i32, times: &[NaiveTime]) -> AppResult<Vec<TimeSlot>> {
        let mut state = self.state.lock().await;
        state.work_day_mut(work_day_id)?;
        Ok(state.swap_slots(work_day_id, times))
    }

    async fn get_slot(&self, id: i32) -> AppResult<TimeSlot> {
        let state = self.state.lock().await;
        state
            .slots
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", id)))
    }

    async fn list_available_slots(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<TimeSlot> = state
            .slots
            .values()
            .filter(|s| s.work_day_id == work_day_id && s.is_active && s.is_available)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.time, s.id));
        Ok(slots)
    }

    async fn reserve_slot(&self, id: i32) -> AppResult<()> {
        self.state.lock().await.reserve(id)
    }

    async fn release_slot(&self, id: i32) -> AppResult<()> {
        self.state.lock().await.release(id);
        Ok(())
    }

    async fn delete_slot(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.slots.contains_key(&id) {
            return Err(AppError::NotFound(format!("Time slot {} not found", id)));
        }
        if state.slot_referenced(id) {
            return Err(AppError::Validation(
                "Slot is referenced by appointments and cannot be deleted".to_string(),
            ));
        }
        state.slots.remove(&id);
        Ok(())
    }

    async fn delete_slots(&self, work_day_id: i32) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let ids: Vec<i32> = state
            .slots
            .values()
            .filter(|s| s.work_day_id == work_day_id)
            .map(|s| s.id)
            .collect();
        if ids.iter().any(|id| state.slot_referenced(*id)) {
            return Err(AppError::Validation(
                "Slot is referenced by appointments and cannot be deleted".to_string(),
            ));
        }
        for id in &ids {
            state.slots.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn create_appointment(&self, draft: &AppointmentDraft, policy: &RewardPolicy) -> AppResult<Appointment> {
        let mut state = self.state.lock().await;
        let counter = state.user_mut(draft.client_id)?.reward_counter;

        state.reserve(draft.time_slot_id)?;

        let decision = policy.evaluate_new_appointment(counter, draft.price);
        state.user_mut(draft.client_id)?.reward_counter = decision.counter;

        let id = state.next_id();
        let appointment = Appointment {
            id,
            provider_id: draft.provider_id,
            client_id: draft.client_id,
            service_id: draft.service_id,
            time_slot_id: draft.time_slot_id,
            status: AppointmentStatus::Pending,
            price: Some(decision.price),
            is_free: decision.is_free,
            created_at: Utc::now(),
        };
        state.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, id: i32) -> AppResult<Appointment> {
        let state = self.state.lock().await;
        state
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Appointment with id {} not found", id)))
    }

    async fn transition_appointment(
        &self,
        id: i32,
        actor: &Actor,
        transition: Transition,
        policy: &RewardPolicy,
    ) -> AppResult<Appointment> {
        let mut state = self.state.lock().await;
        let current = state
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Appointment with id {} not found", id)))?;

        let plan = lifecycle::plan(&current, actor, transition, policy)?;

        let client = state.user_mut(current.client_id)?;
        client.reward_counter = plan.counter_change.apply(client.reward_counter);

        if plan.release_slot {
            state.release(current.time_slot_id);
        }

        let updated = Appointment {
            status: plan.to,
            ..current
        };
        state.appointments.insert(id, updated.clone());
        Ok(updated)
    }

    async fn list_provider_appointments(
        &self,
        provider_id: i32,
        filter: &ProviderAppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let state = self.state.lock().await;
        let mut list = Vec::new();
        for appointment in state.appointments.values().filter(|a| a.provider_id == provider_id) {
            let details = state.details(appointment)?;
            if filter.matches(&details) {
                list.push(details);
            }
        }
        sort_for_provider(&mut list);
        Ok(list)
    }

    async fn list_client_appointments(&self, client_id: i32) -> AppResult<Vec<AppointmentDetails>> {
        let state = self.state.lock().await;
        let mut list = state
            .appointments
            .values()
            .filter(|a| a.client_id == client_id)
            .map(|a| state.details(a))
            .collect::<AppResult<Vec<_>>>()?;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }
}
