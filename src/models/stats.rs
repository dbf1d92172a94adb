//! Read models produced by the statistics projector

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::{appointment::AppointmentStatus, schedule::Weekday};

/// Number of appointments in one status
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: i64,
}

/// Counts and revenue over the trailing window
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WindowStats {
    pub days: i64,
    pub total_appointments: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub canceled: i64,
    /// Sum of prices of completed appointments
    pub revenue: Decimal,
}

/// A confirmed appointment still ahead today
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingAppointment {
    pub id: i32,
    pub client: String,
    pub service: String,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PopularService {
    pub service_id: i32,
    pub service: String,
    pub appointments_count: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinancialMetrics {
    pub lifetime_gross_revenue: Decimal,
    pub window_revenue: Decimal,
}

/// Provider dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderStatistics {
    pub provider_id: i32,
    pub provider: String,
    pub window: WindowStats,
    /// Lifetime count per status, every status listed
    pub status_distribution: Vec<StatusCount>,
    pub today_upcoming_appointments: Vec<UpcomingAppointment>,
    pub most_popular_services: Vec<PopularService>,
    pub financial_metrics: FinancialMetrics,
}

/// One line of a client's history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientAppointmentEntry {
    pub id: i32,
    pub service: String,
    pub status: AppointmentStatus,
    pub time_slot: NaiveTime,
    pub day_of_week: Option<Weekday>,
    pub price: Option<Decimal>,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}

/// A client's appointment history and reward progress
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientHistory {
    pub client_id: i32,
    pub client: String,
    pub reward_counter: i32,
    pub total_appointments: i64,
    pub appointments: Vec<ClientAppointmentEntry>,
}
