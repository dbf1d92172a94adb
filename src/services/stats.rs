//! Statistics projector: provider dashboard and client history
//!
//! Everything is computed from snapshot reads of committed rows; nothing here
//! writes or locks.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{
        stats::{
            ClientAppointmentEntry, ClientHistory, FinancialMetrics, PopularService,
            ProviderStatistics, StatusCount, UpcomingAppointment, WindowStats,
        },
        Actor, AppointmentDetails, AppointmentStatus, Service, User, Weekday,
    },
    repository::BookingStore,
};

/// Clock readings a projection is evaluated at
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    /// Server local wall time, used to find today's remaining appointments
    pub local_now: NaiveDateTime,
}

impl Clock {
    pub fn system() -> Self {
        Self {
            now: Utc::now(),
            local_now: Local::now().naive_local(),
        }
    }
}

fn completed_revenue<'a>(list: impl Iterator<Item = &'a AppointmentDetails>) -> Decimal {
    list.filter(|a| a.status == AppointmentStatus::Completed)
        .filter_map(|a| a.price)
        .sum()
}

/// Build the provider dashboard from the provider's appointments and services
pub fn project_provider_statistics(
    provider: &User,
    services: &[Service],
    appointments: &[AppointmentDetails],
    window_days: i64,
    top_services: usize,
    clock: Clock,
) -> ProviderStatistics {
    let since = clock.now - Duration::days(window_days);
    let in_window: Vec<&AppointmentDetails> =
        appointments.iter().filter(|a| a.created_at >= since).collect();

    let count_in_window =
        |status: AppointmentStatus| in_window.iter().filter(|a| a.status == status).count() as i64;
    let window_revenue = completed_revenue(in_window.iter().copied());

    let window = WindowStats {
        days: window_days,
        total_appointments: in_window.len() as i64,
        pending: count_in_window(AppointmentStatus::Pending),
        confirmed: count_in_window(AppointmentStatus::Confirmed),
        completed: count_in_window(AppointmentStatus::Completed),
        canceled: count_in_window(AppointmentStatus::Canceled),
        revenue: window_revenue,
    };

    let status_distribution = AppointmentStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: appointments.iter().filter(|a| a.status == status).count() as i64,
        })
        .collect();

    let today = Weekday::from(clock.local_now.weekday());
    let current_time = clock.local_now.time();
    let mut today_upcoming_appointments: Vec<UpcomingAppointment> = appointments
        .iter()
        .filter(|a| {
            a.status == AppointmentStatus::Confirmed
                && a.day_of_week == Some(today)
                && a.slot_time >= current_time
        })
        .map(|a| UpcomingAppointment {
            id: a.id,
            client: a.client_name.clone(),
            service: a.service_name.clone(),
            time: a.slot_time,
            status: a.status,
        })
        .collect();
    today_upcoming_appointments.sort_by_key(|u| (u.time, u.id));

    let mut booked: HashMap<i32, i64> = HashMap::new();
    for a in in_window.iter().filter(|a| {
        matches!(a.status, AppointmentStatus::Confirmed | AppointmentStatus::Completed)
    }) {
        *booked.entry(a.service_id).or_default() += 1;
    }
    let mut most_popular_services: Vec<PopularService> = services
        .iter()
        .filter(|s| s.is_active)
        .filter_map(|s| {
            let count = booked.get(&s.id).copied().unwrap_or(0);
            (count > 0).then(|| PopularService {
                service_id: s.id,
                service: s.name.clone(),
                appointments_count: count,
                price: s.price,
            })
        })
        .collect();
    most_popular_services.sort_by(|a, b| {
        b.appointments_count
            .cmp(&a.appointments_count)
            .then(a.service_id.cmp(&b.service_id))
    });
    most_popular_services.truncate(top_services);

    ProviderStatistics {
        provider_id: provider.id,
        provider: provider.username.clone(),
        window,
        status_distribution,
        today_upcoming_appointments,
        most_popular_services,
        financial_metrics: FinancialMetrics {
            lifetime_gross_revenue: completed_revenue(appointments.iter()),
            window_revenue,
        },
    }
}

/// Build a client's history; `appointments` is expected newest first
pub fn project_client_history(client: &User, appointments: &[AppointmentDetails]) -> ClientHistory {
    ClientHistory {
        client_id: client.id,
        client: client.username.clone(),
        reward_counter: client.reward_counter,
        total_appointments: appointments.len() as i64,
        appointments: appointments
            .iter()
            .map(|a| ClientAppointmentEntry {
                id: a.id,
                service: a.service_name.clone(),
                status: a.status,
                time_slot: a.slot_time,
                day_of_week: a.day_of_week,
                price: a.price,
                is_free: a.is_free,
                created_at: a.created_at,
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn BookingStore>,
    window_days: i64,
    top_services: usize,
}

impl StatsService {
    pub fn new(store: Arc<dyn BookingStore>, window_days: i64, top_services: usize) -> Self {
        Self {
            store,
            window_days,
            top_services,
        }
    }

    pub async fn provider_statistics(&self, actor: &Actor) -> AppResult<ProviderStatistics> {
        self.provider_statistics_at(actor, Clock::system()).await
    }

    pub async fn provider_statistics_at(&self, actor: &Actor, clock: Clock) -> AppResult<ProviderStatistics> {
        actor.require_provider()?;
        let provider = self.store.get_user(actor.user_id).await?;
        let services = self.store.list_services(actor.user_id).await?;
        let appointments = self
            .store
            .list_provider_appointments(actor.user_id, &Default::default())
            .await?;

        Ok(project_provider_statistics(
            &provider,
            &services,
            &appointments,
            self.window_days,
            self.top_services,
            clock,
        ))
    }

    pub async fn client_history(&self, actor: &Actor) -> AppResult<ClientHistory> {
        actor.require_client()?;
        let client = self.store.get_user(actor.user_id).await?;
        let appointments = self.store.list_client_appointments(actor.user_id).await?;
        Ok(project_client_history(&client, &appointments))
    }
}
