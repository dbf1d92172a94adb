//! Appointment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        appointment::{CreateAppointment, ProviderAppointmentQuery},
        Appointment, AppointmentDetails,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Book a time slot (client)
#[utoipa::path(
    post,
    path = "/appointments",
    tag = "appointments",
    security(("bearer_auth" = [])),
    request_body = CreateAppointment,
    responses(
        (status = 201, description = "Appointment created", body = Appointment),
        (status = 400, description = "Slot does not belong to the service provider"),
        (status = 403, description = "Client role required"),
        (status = 404, description = "Service or slot not found"),
        (status = 409, description = "Slot already booked")
    )
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateAppointment>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let appointment = state
        .services
        .appointments
        .create(&user.actor(), &request)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Cancel an appointment (its client or provider)
#[utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment canceled", body = Appointment),
        (status = 403, description = "Not a party of the appointment"),
        (status = 404, description = "Appointment not found")
    )
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.services.appointments.cancel(&user.actor(), id).await?;
    Ok(Json(appointment))
}

/// Confirm a pending appointment (its provider)
#[utoipa::path(
    post,
    path = "/appointments/{id}/confirm",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment confirmed", body = Appointment),
        (status = 403, description = "Not the provider of the appointment"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment is not pending")
    )
)]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.services.appointments.confirm(&user.actor(), id).await?;
    Ok(Json(appointment))
}

/// Complete a confirmed appointment (its provider)
#[utoipa::path(
    post,
    path = "/appointments/{id}/complete",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment completed", body = Appointment),
        (status = 403, description = "Not the provider of the appointment"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment is not confirmed")
    )
)]
pub async fn complete_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.services.appointments.complete(&user.actor(), id).await?;
    Ok(Json(appointment))
}

/// Appointments of the calling provider, filtered and ordered by status rank
#[utoipa::path(
    get,
    path = "/provider/appointments",
    tag = "appointments",
    security(("bearer_auth" = [])),
    params(ProviderAppointmentQuery),
    responses(
        (status = 200, description = "Provider appointments", body = Vec<AppointmentDetails>),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Provider role required")
    )
)]
pub async fn list_provider_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ProviderAppointmentQuery>,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    let filter = query.into_filter()?;
    let list = state
        .services
        .appointments
        .list_for_provider(&user.actor(), &filter)
        .await?;
    Ok(Json(list))
}

/// Appointments of the calling client, newest first
#[utoipa::path(
    get,
    path = "/client/appointments",
    tag = "appointments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Client appointments", body = Vec<AppointmentDetails>),
        (status = 403, description = "Client role required")
    )
)]
pub async fn list_client_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    let list = state.services.appointments.list_for_client(&user.actor()).await?;
    Ok(Json(list))
}
