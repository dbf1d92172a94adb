//! Appointment model, status and list filters

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::schedule::Weekday;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// AppointmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
        }
    }

    /// Position in provider listings
    pub fn rank(&self) -> i32 {
        match self {
            AppointmentStatus::Pending => 1,
            AppointmentStatus::Confirmed => 2,
            AppointmentStatus::Canceled => 3,
            AppointmentStatus::Completed => 4,
        }
    }

    /// Parse an optional query value, rejecting anything but a status name
    pub fn parse_filter(value: Option<&str>) -> AppResult<Option<AppointmentStatus>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| {
                let allowed: Vec<&str> =
                    AppointmentStatus::ALL.iter().map(AppointmentStatus::as_str).collect();
                AppError::Validation(format!(
                    "Invalid status '{}'. Allowed values: {}",
                    v,
                    allowed.join(", ")
                ))
            }),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "canceled" => Ok(AppointmentStatus::Canceled),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

super::pg_text_enum!(AppointmentStatus);

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

/// Appointment model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Appointment {
    pub id: i32,
    pub provider_id: i32,
    pub client_id: i32,
    pub service_id: i32,
    pub time_slot_id: i32,
    pub status: AppointmentStatus,
    pub price: Option<Decimal>,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything the store needs to insert a new appointment; price and reward
/// are settled inside the reservation transaction
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub provider_id: i32,
    pub client_id: i32,
    pub service_id: i32,
    pub time_slot_id: i32,
    pub price: Decimal,
}

/// Appointment with denormalized client, service and slot fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AppointmentDetails {
    pub id: i32,
    pub provider_id: i32,
    pub client_id: i32,
    pub client_name: String,
    pub service_id: i32,
    pub service_name: String,
    pub time_slot_id: i32,
    pub slot_time: NaiveTime,
    pub day_of_week: Option<Weekday>,
    pub status: AppointmentStatus,
    pub price: Option<Decimal>,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}

/// Create appointment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppointment {
    pub service_id: i32,
    pub time_slot_id: i32,
}

// ---------------------------------------------------------------------------
// Provider listing filters
// ---------------------------------------------------------------------------

/// Query parameters of the provider appointment list
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
pub struct ProviderAppointmentQuery {
    /// pending, confirmed, completed or canceled
    pub status: Option<String>,
    /// Case-insensitive substring of the client username
    #[validate(length(max = 150, message = "client_name is too long"))]
    pub client_name: Option<String>,
    /// Weekday name (monday .. sunday)
    pub day: Option<String>,
}

/// Validated provider list filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderAppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub client_name: Option<String>,
    pub day: Option<Weekday>,
}

impl ProviderAppointmentQuery {
    pub fn into_filter(self) -> AppResult<ProviderAppointmentFilter> {
        self.validate()?;
        Ok(ProviderAppointmentFilter {
            status: AppointmentStatus::parse_filter(self.status.as_deref())?,
            client_name: self
                .client_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            day: Weekday::parse_filter(self.day.as_deref())?,
        })
    }
}

impl ProviderAppointmentFilter {
    pub fn matches(&self, details: &AppointmentDetails) -> bool {
        if let Some(status) = self.status {
            if details.status != status {
                return false;
            }
        }
        if let Some(ref name) = self.client_name {
            if !details
                .client_name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if let Some(day) = self.day {
            if details.day_of_week != Some(day) {
                return false;
            }
        }
        true
    }
}

/// Provider listing order: status rank, then slot time descending
pub fn sort_for_provider(list: &mut [AppointmentDetails]) {
    list.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then(b.slot_time.cmp(&a.slot_time))
            .then(a.id.cmp(&b.id))
    });
}
