//! Appointments repository: reservation and status transactions

use sqlx::{Pool, Postgres};

use super::schedules::{release_slot, reserve_slot};
use crate::{
    error::{AppError, AppResult},
    models::{
        appointment::{AppointmentDraft, ProviderAppointmentFilter},
        Actor, Appointment, AppointmentDetails,
    },
    services::{
        lifecycle::{self, Transition},
        rewards::{CounterChange, RewardPolicy},
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT a.id, a.provider_id, a.client_id, u.username AS client_name,
           a.service_id, s.name AS service_name, a.time_slot_id,
           ts.time AS slot_time, wd.day_of_week, a.status, a.price, a.is_free,
           a.created_at
    FROM appointments a
    JOIN users u ON u.id = a.client_id
    JOIN services s ON s.id = a.service_id
    JOIN time_slots ts ON ts.id = a.time_slot_id
    JOIN work_days wd ON wd.id = ts.work_day_id
"#;

#[derive(Clone)]
pub struct AppointmentsRepository {
    pool: Pool<Postgres>,
}

impl AppointmentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get appointment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Appointment> {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appointment with id {} not found", id)))
    }

    /// Reserve the slot and insert a pending appointment in one transaction.
    ///
    /// The client row is locked first so that the reward counter read here is
    /// the one written back.
    pub async fn create(&self, draft: &AppointmentDraft, policy: &RewardPolicy) -> AppResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let counter: i32 = sqlx::query_scalar(
            "SELECT reward_counter FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(draft.client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", draft.client_id)))?;

        reserve_slot(&mut *tx, draft.time_slot_id).await?;

        let decision = policy.evaluate_new_appointment(counter, draft.price);
        if decision.counter != counter {
            sqlx::query("UPDATE users SET reward_counter = $2 WHERE id = $1")
                .bind(draft.client_id)
                .bind(decision.counter)
                .execute(&mut *tx)
                .await?;
        }

        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (provider_id, client_id, service_id, time_slot_id, status, price, is_free)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *
            "#,
        )
        .bind(draft.provider_id)
        .bind(draft.client_id)
        .bind(draft.service_id)
        .bind(draft.time_slot_id)
        .bind(decision.price)
        .bind(decision.is_free)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| live_slot_conflict(e, draft.time_slot_id))?;

        tx.commit().await?;
        Ok(appointment)
    }

    /// Apply a status transition under a row lock on the appointment
    pub async fn transition(
        &self,
        id: i32,
        actor: &Actor,
        transition: Transition,
        policy: &RewardPolicy,
    ) -> AppResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment with id {} not found", id)))?;

        let plan = lifecycle::plan(&current, actor, transition, policy)?;

        if plan.counter_change != CounterChange::None {
            sqlx::query(
                "UPDATE users SET reward_counter = GREATEST(reward_counter + $2, 0) WHERE id = $1",
            )
            .bind(current.client_id)
            .bind(plan.counter_change.delta())
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(plan.to)
        .fetch_one(&mut *tx)
        .await?;

        if plan.release_slot {
            release_slot(&mut *tx, current.time_slot_id).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Provider list with optional status / client name / weekday filters
    pub async fn list_for_provider(
        &self,
        provider_id: i32,
        filter: &ProviderAppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let mut conditions = vec!["a.provider_id = $1".to_string()];
        let mut idx = 2;

        if filter.status.is_some() {
            conditions.push(format!("a.status = ${}", idx));
            idx += 1;
        }
        if filter.client_name.is_some() {
            conditions.push(format!("u.username ILIKE ${}", idx));
            idx += 1;
        }
        if filter.day.is_some() {
            conditions.push(format!("wd.day_of_week = ${}", idx));
        }

        let query = format!(
            r#"{}
            WHERE {}
            ORDER BY CASE a.status
                         WHEN 'pending' THEN 1
                         WHEN 'confirmed' THEN 2
                         WHEN 'canceled' THEN 3
                         ELSE 4
                     END,
                     ts.time DESC, a.id"#,
            DETAILS_SELECT,
            conditions.join(" AND ")
        );

        let mut builder = sqlx::query_as::<_, AppointmentDetails>(&query).bind(provider_id);
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(ref name) = filter.client_name {
            builder = builder.bind(format!("%{}%", escape_like(name)));
        }
        if let Some(day) = filter.day {
            builder = builder.bind(day);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// All appointments of a client, newest first
    pub async fn list_for_client(&self, client_id: i32) -> AppResult<Vec<AppointmentDetails>> {
        let query = format!(
            "{} WHERE a.client_id = $1 ORDER BY a.created_at DESC, a.id DESC",
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, AppointmentDetails>(&query)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// The partial unique index on live slots was hit by a concurrent booking
fn live_slot_conflict(e: sqlx::Error, slot_id: i32) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::SlotUnavailable(format!("Time slot {} is already booked", slot_id))
        }
        _ => AppError::Database(e),
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
