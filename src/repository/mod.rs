//! Repository layer for database operations

pub mod appointments;
pub mod memory;
pub mod schedules;
pub mod users;

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        appointment::{AppointmentDraft, ProviderAppointmentFilter},
        schedule::WorkDayRequest,
        Actor, Appointment, AppointmentDetails, Service, TimeSlot, User, WorkDay,
    },
    services::{lifecycle::Transition, rewards::RewardPolicy},
};

pub use memory::MemoryRepository;

/// Persistence boundary of the booking core.
///
/// Methods that change an appointment apply the whole change (slot flag,
/// reward counter, appointment row) atomically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> AppResult<()>;

    // ---- Users & catalog ----
    async fn get_user(&self, id: i32) -> AppResult<User>;
    async fn get_service(&self, id: i32) -> AppResult<Service>;
    async fn list_services(&self, provider_id: i32) -> AppResult<Vec<Service>>;

    // ---- Work days ----
    async fn create_work_day(&self, provider_id: i32, data: &WorkDayRequest) -> AppResult<WorkDay>;
    /// Replace the template and its active slots in one step. The previous
    /// active slots are retired and `times` become the new ones.
    async fn update_work_day(&self, id: i32, data: &WorkDayRequest, times: &[NaiveTime]) -> AppResult<WorkDay>;
    async fn get_work_day(&self, id: i32) -> AppResult<WorkDay>;
    /// Active work days of a provider, by weekday order
    async fn list_work_days(&self, provider_id: i32) -> AppResult<Vec<WorkDay>>;
    /// Soft delete; slots are deactivated with it
    async fn deactivate_work_day(&self, id: i32) -> AppResult<()>;

    // ---- Slots ----
    /// Deactivate every slot of the work day and insert the given times
    async fn replace_slots(&self, work_day_id: i32, times: &[NaiveTime]) -> AppResult<Vec<TimeSlot>>;
    async fn get_slot(&self, id: i32) -> AppResult<TimeSlot>;
    async fn list_available_slots(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>>;
    async fn reserve_slot(&self, id: i32) -> AppResult<()>;
    async fn release_slot(&self, id: i32) -> AppResult<()>;
    async fn delete_slot(&self, id: i32) -> AppResult<()>;
    async fn delete_slots(&self, work_day_id: i32) -> AppResult<u64>;

    // ---- Appointments ----
    /// Reserve the slot, settle the reward and insert the appointment as pending
    async fn create_appointment(&self, draft: &AppointmentDraft, policy: &RewardPolicy) -> AppResult<Appointment>;
    async fn get_appointment(&self, id: i32) -> AppResult<Appointment>;
    /// Plan the transition on the locked row and apply it
    async fn transition_appointment(
        &self,
        id: i32,
        actor: &Actor,
        transition: Transition,
        policy: &RewardPolicy,
    ) -> AppResult<Appointment>;
    async fn list_provider_appointments(
        &self,
        provider_id: i32,
        filter: &ProviderAppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>>;
    /// Newest first
    async fn list_client_appointments(&self, client_id: i32) -> AppResult<Vec<AppointmentDetails>>;
}

/// Postgres repository holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub schedules: schedules::SchedulesRepository,
    pub appointments: appointments::AppointmentsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            schedules: schedules::SchedulesRepository::new(pool.clone()),
            appointments: appointments::AppointmentsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl BookingStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    async fn get_service(&self, id: i32) -> AppResult<Service> {
        self.users.get_service(id).await
    }

    async fn list_services(&self, provider_id: i32) -> AppResult<Vec<Service>> {
        self.users.list_services(provider_id).await
    }

    async fn create_work_day(&self, provider_id: i32, data: &WorkDayRequest) -> AppResult<WorkDay> {
        self.schedules.create_work_day(provider_id, data).await
    }

    async fn update_work_day(&self, id: i32, data: &WorkDayRequest, times: &[NaiveTime]) -> AppResult<WorkDay> {
        self.schedules.update_work_day(id, data, times).await
    }

    async fn get_work_day(&self, id: i32) -> AppResult<WorkDay> {
        self.schedules.get_work_day(id).await
    }

    async fn list_work_days(&self, provider_id: i32) -> AppResult<Vec<WorkDay>> {
        self.schedules.list_work_days(provider_id).await
    }

    async fn deactivate_work_day(&self, id: i32) -> AppResult<()> {
        self.schedules.deactivate_work_day(id).await
    }

    async fn replace_slots(&self, work_day_id: i32, times: &[NaiveTime]) -> AppResult<Vec<TimeSlot>> {
        self.schedules.replace_slots(work_day_id, times).await
    }

    async fn get_slot(&self, id: i32) -> AppResult<TimeSlot> {
        self.schedules.get_slot(id).await
    }

    async fn list_available_slots(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>> {
        self.schedules.list_available_slots(work_day_id).await
    }

    async fn reserve_slot(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        schedules::reserve_slot(&mut conn, id).await
    }

    async fn release_slot(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        schedules::release_slot(&mut conn, id).await
    }

    async fn delete_slot(&self, id: i32) -> AppResult<()> {
        self.schedules.delete_slot(id).await
    }

    async fn delete_slots(&self, work_day_id: i32) -> AppResult<u64> {
        self.schedules.delete_slots(work_day_id).await
    }

    async fn create_appointment(&self, draft: &AppointmentDraft, policy: &RewardPolicy) -> AppResult<Appointment> {
        self.appointments.create(draft, policy).await
    }

    async fn get_appointment(&self, id: i32) -> AppResult<Appointment> {
        self.appointments.get_by_id(id).await
    }

    async fn transition_appointment(
        &self,
        id: i32,
        actor: &Actor,
        transition: Transition,
        policy: &RewardPolicy,
    ) -> AppResult<Appointment> {
        self.appointments.transition(id, actor, transition, policy).await
    }

    async fn list_provider_appointments(
        &self,
        provider_id: i32,
        filter: &ProviderAppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>> {
        self.appointments.list_for_provider(provider_id, filter).await
    }

    async fn list_client_appointments(&self, client_id: i32) -> AppResult<Vec<AppointmentDetails>> {
        self.appointments.list_for_client(client_id).await
    }
}
