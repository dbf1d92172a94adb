//! Appointment service: booking and status changes

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        appointment::{AppointmentDraft, CreateAppointment, ProviderAppointmentFilter},
        Actor, Appointment, AppointmentDetails,
    },
    repository::BookingStore,
    services::{lifecycle::Transition, rewards::RewardPolicy},
};

#[derive(Clone)]
pub struct AppointmentsService {
    store: Arc<dyn BookingStore>,
    policy: RewardPolicy,
    max_retries: u32,
}

impl AppointmentsService {
    pub fn new(store: Arc<dyn BookingStore>, policy: RewardPolicy, max_retries: u32) -> Self {
        Self {
            store,
            policy,
            max_retries,
        }
    }

    /// Book a slot for the calling client.
    ///
    /// The service price is copied onto the appointment unless the client's
    /// reward counter earns a free one.
    pub async fn create(&self, actor: &Actor, request: &CreateAppointment) -> AppResult<Appointment> {
        actor.require_client()?;

        let service = self.store.get_service(request.service_id).await?;
        if !service.is_active {
            return Err(AppError::NotFound(format!(
                "Service with id {} not found",
                request.service_id
            )));
        }

        let slot = self.store.get_slot(request.time_slot_id).await?;
        let day = self.store.get_work_day(slot.work_day_id).await?;
        if !day.is_active {
            return Err(AppError::NotFound(format!(
                "Work day {} not found",
                day.id
            )));
        }
        if day.provider_id != service.provider_id {
            return Err(AppError::Validation(format!(
                "Time slot {} does not belong to the provider of service {}",
                slot.id, service.id
            )));
        }

        let draft = AppointmentDraft {
            provider_id: service.provider_id,
            client_id: actor.user_id,
            service_id: service.id,
            time_slot_id: slot.id,
            price: service.price,
        };

        let mut attempt = 0;
        let appointment = loop {
            match self.store.create_appointment(&draft, &self.policy).await {
                Ok(appointment) => break appointment,
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        tracing::warn!(
                            slot_id = draft.time_slot_id,
                            attempts = attempt,
                            "Reservation kept conflicting, giving up"
                        );
                        return Err(AppError::SlotUnavailable(format!(
                            "Time slot {} is being booked by someone else",
                            draft.time_slot_id
                        )));
                    }
                    tracing::debug!(slot_id = draft.time_slot_id, attempt, "Retrying reservation");
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!(
            appointment_id = appointment.id,
            client_id = appointment.client_id,
            slot_id = appointment.time_slot_id,
            is_free = appointment.is_free,
            "Appointment created"
        );
        Ok(appointment)
    }

    pub async fn get(&self, id: i32) -> AppResult<Appointment> {
        self.store.get_appointment(id).await
    }

    async fn apply(&self, actor: &Actor, id: i32, transition: Transition) -> AppResult<Appointment> {
        let appointment = self
            .store
            .transition_appointment(id, actor, transition, &self.policy)
            .await?;
        tracing::info!(
            appointment_id = id,
            actor_id = actor.user_id,
            transition = transition.as_str(),
            status = %appointment.status,
            "Appointment status changed"
        );
        Ok(appointment)
    }

    /// Cancel (client or provider of the appointment); frees the slot
    pub async fn cancel(&self, actor: &Actor, id: i32) -> AppResult<Appointment> {
        self.apply(actor, id, Transition::Cancel).await
    }

    /// Pending -> Confirmed (provider of the appointment)
    pub async fn confirm(&self, actor: &Actor, id: i32) -> AppResult<Appointment> {
        self.apply(actor, id, Transition::Confirm).await
    }

    /// Confirmed -> Completed (provider of the appointment)
    pub async fn complete(&self, actor: &Actor, id: i32) -> AppResult<Appointment> {
        self.apply(actor, id, Transition::Complete).await
    }

    pub async fn list_for_provider(
        &self,
        actor: &Actor,
        filter: &ProviderAppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>> {
        actor.require_provider()?;
        self.store.list_provider_appointments(actor.user_id, filter).await
    }

    pub async fn list_for_client(&self, actor: &Actor) -> AppResult<Vec<AppointmentDetails>> {
        actor.require_client()?;
        self.store.list_client_appointments(actor.user_id).await
    }
}
