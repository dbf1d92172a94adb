//! Work day and time slot endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::schedule::{PublicWorkDayQuery, TimeSlot, WorkDay, WorkDayRequest},
    AppState,
};

use super::AuthenticatedUser;

/// Number of slots removed
#[derive(Serialize, ToSchema)]
pub struct DeletedSlotsResponse {
    pub deleted: u64,
}

// ---- Work days ----

/// Active work days of the calling provider
#[utoipa::path(
    get,
    path = "/workdays",
    tag = "schedules",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Work days ordered by weekday", body = Vec<WorkDay>),
        (status = 403, description = "Provider role required")
    )
)]
pub async fn list_work_days(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<WorkDay>>> {
    let days = state.services.schedules.list_own(&user.actor()).await?;
    Ok(Json(days))
}

/// Active work days of a provider
#[utoipa::path(
    get,
    path = "/workdays/public",
    tag = "schedules",
    params(PublicWorkDayQuery),
    responses(
        (status = 200, description = "Work days ordered by weekday", body = Vec<WorkDay>),
        (status = 404, description = "Provider not found")
    )
)]
pub async fn list_public_work_days(
    State(state): State<AppState>,
    Query(query): Query<PublicWorkDayQuery>,
) -> AppResult<Json<Vec<WorkDay>>> {
    let days = state.services.schedules.list_public(query.provider_id).await?;
    Ok(Json(days))
}

/// Create a work day; slots are generated when the times are complete
#[utoipa::path(
    post,
    path = "/workdays",
    tag = "schedules",
    security(("bearer_auth" = [])),
    request_body = WorkDayRequest,
    responses(
        (status = 201, description = "Work day created", body = WorkDay),
        (status = 400, description = "Invalid slot duration"),
        (status = 403, description = "Provider role required")
    )
)]
pub async fn create_work_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(data): Json<WorkDayRequest>,
) -> AppResult<(StatusCode, Json<WorkDay>)> {
    let day = state.services.schedules.create(&user.actor(), &data).await?;
    Ok((StatusCode::CREATED, Json(day)))
}

/// Get an owned work day
#[utoipa::path(
    get,
    path = "/workdays/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Work day ID")),
    responses(
        (status = 200, description = "Work day", body = WorkDay),
        (status = 403, description = "Work day of another provider"),
        (status = 404, description = "Work day not found")
    )
)]
pub async fn get_work_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<WorkDay>> {
    let day = state.services.schedules.get(&user.actor(), id).await?;
    Ok(Json(day))
}

/// Replace an owned work day; slots are regenerated
#[utoipa::path(
    put,
    path = "/workdays/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Work day ID")),
    request_body = WorkDayRequest,
    responses(
        (status = 200, description = "Work day updated", body = WorkDay),
        (status = 403, description = "Work day of another provider"),
        (status = 404, description = "Work day not found")
    )
)]
pub async fn update_work_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<WorkDayRequest>,
) -> AppResult<Json<WorkDay>> {
    let day = state.services.schedules.update(&user.actor(), id, &data).await?;
    Ok(Json(day))
}

/// Deactivate an owned work day and its slots
#[utoipa::path(
    delete,
    path = "/workdays/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Work day ID")),
    responses(
        (status = 204, description = "Work day deactivated"),
        (status = 403, description = "Work day of another provider"),
        (status = 404, description = "Work day not found")
    )
)]
pub async fn delete_work_day(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.schedules.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Slots ----

/// Regenerate the slots of an owned work day
#[utoipa::path(
    post,
    path = "/workdays/{id}/slots/generate",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Work day ID")),
    responses(
        (status = 200, description = "New slots ordered by time", body = Vec<TimeSlot>),
        (status = 403, description = "Work day of another provider"),
        (status = 422, description = "Work day times are incomplete")
    )
)]
pub async fn generate_slots(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let slots = state.services.schedules.generate_slots(&user.actor(), id).await?;
    Ok(Json(slots))
}

/// Permanently remove every slot of an owned work day
#[utoipa::path(
    delete,
    path = "/workdays/{id}/slots",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Work day ID")),
    responses(
        (status = 200, description = "Slots removed", body = DeletedSlotsResponse),
        (status = 400, description = "Slots referenced by appointments"),
        (status = 403, description = "Work day of another provider")
    )
)]
pub async fn delete_slots(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<DeletedSlotsResponse>> {
    let deleted = state.services.schedules.delete_slots(&user.actor(), id).await?;
    Ok(Json(DeletedSlotsResponse { deleted }))
}

/// Bookable slots of a work day
#[utoipa::path(
    get,
    path = "/workdays/{id}/slots/available",
    tag = "schedules",
    params(("id" = i32, Path, description = "Work day ID")),
    responses(
        (status = 200, description = "Available slots ordered by time", body = Vec<TimeSlot>),
        (status = 404, description = "Work day not found")
    )
)]
pub async fn list_available_slots(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let slots = state.services.schedules.list_available_slots(id).await?;
    Ok(Json(slots))
}

/// Permanently remove one slot
#[utoipa::path(
    delete,
    path = "/slots/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Slot ID")),
    responses(
        (status = 204, description = "Slot removed"),
        (status = 400, description = "Slot referenced by appointments"),
        (status = 403, description = "Slot of another provider"),
        (status = 404, description = "Slot not found")
    )
)]
pub async fn delete_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.schedules.delete_slot(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
