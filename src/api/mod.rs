//! API handlers for the booking REST endpoints

pub mod appointments;
pub mod health;
pub mod openapi;
pub mod schedules;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, models::Actor, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Appointments
        .route("/appointments", post(appointments::create_appointment))
        .route("/appointments/:id/cancel", post(appointments::cancel_appointment))
        .route("/appointments/:id/confirm", post(appointments::confirm_appointment))
        .route("/appointments/:id/complete", post(appointments::complete_appointment))
        .route("/provider/appointments", get(appointments::list_provider_appointments))
        .route("/client/appointments", get(appointments::list_client_appointments))
        // Statistics
        .route("/provider/statistics", get(stats::provider_statistics))
        .route("/client/statistics", get(stats::client_statistics))
        // Work days
        .route("/workdays", get(schedules::list_work_days).post(schedules::create_work_day))
        .route("/workdays/public", get(schedules::list_public_work_days))
        .route(
            "/workdays/:id",
            get(schedules::get_work_day)
                .put(schedules::update_work_day)
                .delete(schedules::delete_work_day),
        )
        // Slots
        .route("/workdays/:id/slots/generate", post(schedules::generate_slots))
        .route("/workdays/:id/slots", delete(schedules::delete_slots))
        .route("/workdays/:id/slots/available", get(schedules::list_available_slots))
        .route("/slots/:id", delete(schedules::delete_slot))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
