//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{appointments, health, schedules, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Booking API",
        version = "1.0.0",
        description = "Appointment booking REST API: work days, time slots, appointments and rewards",
        license(name = "GPL-2.0", url = "https://www.gnu.org/licenses/gpl-2.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Appointments
        appointments::create_appointment,
        appointments::cancel_appointment,
        appointments::confirm_appointment,
        appointments::complete_appointment,
        appointments::list_provider_appointments,
        appointments::list_client_appointments,
        // Schedules
        schedules::list_work_days,
        schedules::list_public_work_days,
        schedules::create_work_day,
        schedules::get_work_day,
        schedules::update_work_day,
        schedules::delete_work_day,
        schedules::generate_slots,
        schedules::delete_slots,
        schedules::list_available_slots,
        schedules::delete_slot,
        // Stats
        stats::provider_statistics,
        stats::client_statistics,
    ),
    components(
        schemas(
            // Appointments
            crate::models::Appointment,
            crate::models::AppointmentDetails,
            crate::models::AppointmentStatus,
            crate::models::appointment::CreateAppointment,
            crate::models::appointment::ProviderAppointmentQuery,
            crate::services::lifecycle::Transition,
            // Schedules
            crate::models::Weekday,
            crate::models::WorkDay,
            crate::models::TimeSlot,
            crate::models::schedule::WorkDayRequest,
            crate::models::schedule::PublicWorkDayQuery,
            schedules::DeletedSlotsResponse,
            // Users & catalog
            crate::models::Role,
            crate::models::User,
            crate::models::Service,
            // Stats
            crate::models::stats::ProviderStatistics,
            crate::models::stats::WindowStats,
            crate::models::stats::StatusCount,
            crate::models::stats::UpcomingAppointment,
            crate::models::stats::PopularService,
            crate::models::stats::FinancialMetrics,
            crate::models::stats::ClientHistory,
            crate::models::stats::ClientAppointmentEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "appointments", description = "Appointment booking and lifecycle"),
        (name = "schedules", description = "Work days and time slots"),
        (name = "stats", description = "Provider and client statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
