//! Schedule models (work days and their time slots)

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day of the week a work day template applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Sort key of a work day (monday = 1 .. sunday = 7, unset = 8)
    pub fn order(day: Option<Weekday>) -> i16 {
        match day {
            Some(d) => d.to_chrono().num_days_from_monday() as i16 + 1,
            None => 8,
        }
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }

    /// Parse an optional query value, rejecting anything but a weekday name
    pub fn parse_filter(value: Option<&str>) -> AppResult<Option<Weekday>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| {
                let allowed: Vec<&str> = Weekday::ALL.iter().map(Weekday::as_str).collect();
                AppError::Validation(format!(
                    "Invalid day '{}'. Allowed values: {}",
                    v,
                    allowed.join(", ")
                ))
            }),
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| format!("Invalid weekday: {}", s))
    }
}

super::pg_text_enum!(Weekday);

// ---------------------------------------------------------------------------
// WorkDay
// ---------------------------------------------------------------------------

/// Weekly availability template of a provider for one weekday
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct WorkDay {
    pub id: i32,
    pub provider_id: i32,
    pub day_of_week: Option<Weekday>,
    pub is_active: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub lunch_start_time: Option<NaiveTime>,
    pub lunch_end_time: Option<NaiveTime>,
    /// Slot length in minutes
    pub slot_duration: i32,
    pub weekday_order: i16,
    pub created_at: DateTime<Utc>,
}

impl WorkDay {
    /// All four time fields are set, so slots can be derived
    pub fn is_schedulable(&self) -> bool {
        self.start_time.is_some()
            && self.end_time.is_some()
            && self.lunch_start_time.is_some()
            && self.lunch_end_time.is_some()
    }

    /// Overwrite the template with a full replacement request
    pub fn apply(&mut self, data: &WorkDayRequest) {
        self.day_of_week = data.day_of_week;
        self.is_active = data.is_active;
        self.start_time = data.start_time;
        self.end_time = data.end_time;
        self.lunch_start_time = data.lunch_start_time;
        self.lunch_end_time = data.lunch_end_time;
        self.slot_duration = data.slot_duration;
        self.weekday_order = Weekday::order(data.day_of_week);
    }
}

/// Create or update work day request (full replacement of the template)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct WorkDayRequest {
    pub day_of_week: Option<Weekday>,
    /// Start of the working day (HH:MM)
    pub start_time: Option<NaiveTime>,
    /// End of the working day (HH:MM)
    pub end_time: Option<NaiveTime>,
    pub lunch_start_time: Option<NaiveTime>,
    pub lunch_end_time: Option<NaiveTime>,
    /// Slot length in minutes (default 30)
    #[validate(range(min = 1, max = 720, message = "Slot duration must be between 1 and 720 minutes"))]
    #[serde(default = "default_slot_duration")]
    pub slot_duration: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_slot_duration() -> i32 {
    30
}

fn default_true() -> bool {
    true
}

/// Query parameters of the public work day list
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PublicWorkDayQuery {
    pub provider_id: i32,
}

// ---------------------------------------------------------------------------
// TimeSlot
// ---------------------------------------------------------------------------

/// A bookable time of day derived from a work day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimeSlot {
    pub id: i32,
    pub work_day_id: i32,
    pub time: NaiveTime,
    pub is_available: bool,
    pub is_active: bool,
}
