//! Shared fixture: one provider with a Monday work day, one service, two clients

use std::sync::Arc;

use chrono::NaiveTime;
use rust_decimal::Decimal;

use booking_server::{
    config::BookingConfig,
    models::{
        appointment::CreateAppointment, schedule::WorkDayRequest, Actor, Appointment, Role,
        TimeSlot, Weekday, WorkDay,
    },
    repository::{BookingStore, MemoryRepository},
    services::Services,
};

pub struct Fixture {
    pub repo: Arc<MemoryRepository>,
    pub services: Services,
    pub provider: Actor,
    pub client: Actor,
    pub other_client: Actor,
    pub service_id: i32,
    pub work_day: WorkDay,
    pub slots: Vec<TimeSlot>,
}

pub fn price() -> Decimal {
    Decimal::new(3000, 2)
}

pub fn monday_request() -> WorkDayRequest {
    WorkDayRequest {
        day_of_week: Some(Weekday::Monday),
        start_time: NaiveTime::from_hms_opt(9, 0, 0),
        end_time: NaiveTime::from_hms_opt(17, 0, 0),
        lunch_start_time: NaiveTime::from_hms_opt(12, 0, 0),
        lunch_end_time: NaiveTime::from_hms_opt(13, 0, 0),
        slot_duration: 30,
        is_active: true,
    }
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(BookingConfig::default()).await
    }

    pub async fn with_config(booking: BookingConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let provider = repo.insert_user("barber", Role::Provider).await;
        let client = repo.insert_user("joao.silva", Role::Client).await;
        let other_client = repo.insert_user("maria", Role::Client).await;
        let service = repo.insert_service(provider.id, "Haircut", price()).await;

        let store: Arc<dyn BookingStore> = repo.clone();
        let services = Services::new(store, &booking).expect("valid booking config");

        let provider = Actor::provider(provider.id);
        let work_day = services
            .schedules
            .create(&provider, &monday_request())
            .await
            .expect("work day");
        let slots = services
            .schedules
            .list_available_slots(work_day.id)
            .await
            .expect("slots");

        Self {
            repo,
            services,
            provider,
            client: Actor::client(client.id),
            other_client: Actor::client(other_client.id),
            service_id: service.id,
            work_day,
            slots,
        }
    }

    pub async fn book(&self, client: &Actor, slot_index: usize) -> booking_server::AppResult<Appointment> {
        self.services
            .appointments
            .create(
                client,
                &CreateAppointment {
                    service_id: self.service_id,
                    time_slot_id: self.slots[slot_index].id,
                },
            )
            .await
    }

    /// Book, confirm and complete one appointment
    pub async fn complete_visit(&self, client: &Actor, slot_index: usize) -> Appointment {
        let appointment = self.book(client, slot_index).await.expect("booked");
        self.services
            .appointments
            .confirm(&self.provider, appointment.id)
            .await
            .expect("confirmed");
        self.services
            .appointments
            .complete(&self.provider, appointment.id)
            .await
            .expect("completed")
    }

    pub async fn counter(&self, client: &Actor) -> i32 {
        self.repo
            .get_user(client.user_id)
            .await
            .expect("user")
            .reward_counter
    }

    pub async fn slot(&self, slot_index: usize) -> TimeSlot {
        self.repo
            .get_slot(self.slots[slot_index].id)
            .await
            .expect("slot")
    }
}
