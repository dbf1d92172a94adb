//! Work days and time slots

use chrono::NaiveTime;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::schedule::{TimeSlot, Weekday, WorkDay, WorkDayRequest},
};

#[derive(Clone)]
pub struct SchedulesRepository {
    pool: Pool<Postgres>,
}

impl SchedulesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ---- Work days ----

    /// Create a work day
    pub async fn create_work_day(&self, provider_id: i32, data: &WorkDayRequest) -> AppResult<WorkDay> {
        let row = sqlx::query_as::<_, WorkDay>(
            r#"
            INSERT INTO work_days (
                provider_id, day_of_week, is_active, start_time, end_time,
                lunch_start_time, lunch_end_time, slot_duration, weekday_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(provider_id)
        .bind(data.day_of_week)
        .bind(data.is_active)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.lunch_start_time)
        .bind(data.lunch_end_time)
        .bind(data.slot_duration)
        .bind(Weekday::order(data.day_of_week))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replace the template of a work day together with its active slots
    pub async fn update_work_day(&self, id: i32, data: &WorkDayRequest, times: &[NaiveTime]) -> AppResult<WorkDay> {
        let mut tx = self.pool.begin().await?;

        let day = sqlx::query_as::<_, WorkDay>(
            r#"
            UPDATE work_days
            SET day_of_week = $2, is_active = $3, start_time = $4, end_time = $5,
                lunch_start_time = $6, lunch_end_time = $7, slot_duration = $8,
                weekday_order = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.day_of_week)
        .bind(data.is_active)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.lunch_start_time)
        .bind(data.lunch_end_time)
        .bind(data.slot_duration)
        .bind(Weekday::order(data.day_of_week))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Work day {} not found", id)))?;

        swap_slots(&mut *tx, id, times).await?;

        tx.commit().await?;
        Ok(day)
    }

    /// Get a work day by ID (active or not)
    pub async fn get_work_day(&self, id: i32) -> AppResult<WorkDay> {
        sqlx::query_as::<_, WorkDay>("SELECT * FROM work_days WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Work day {} not found", id)))
    }

    /// Active work days of a provider, monday first
    pub async fn list_work_days(&self, provider_id: i32) -> AppResult<Vec<WorkDay>> {
        let rows = sqlx::query_as::<_, WorkDay>(
            "SELECT * FROM work_days WHERE provider_id = $1 AND is_active ORDER BY weekday_order, id",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Deactivate a work day together with its slots
    pub async fn deactivate_work_day(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE work_days SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Work day {} not found", id)));
        }

        sqlx::query(
            "UPDATE time_slots SET is_active = FALSE, is_available = FALSE WHERE work_day_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ---- Slots ----

    /// Deactivate the previous slots of a work day and insert the new times
    pub async fn replace_slots(&self, work_day_id: i32, times: &[NaiveTime]) -> AppResult<Vec<TimeSlot>> {
        let mut tx = self.pool.begin().await?;
        let slots = swap_slots(&mut *tx, work_day_id, times).await?;
        tx.commit().await?;
        Ok(slots)
    }

    /// Get a slot by ID
    pub async fn get_slot(&self, id: i32) -> AppResult<TimeSlot> {
        sqlx::query_as::<_, TimeSlot>("SELECT * FROM time_slots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", id)))
    }

    /// Bookable slots of a work day, by time
    pub async fn list_available_slots(&self, work_day_id: i32) -> AppResult<Vec<TimeSlot>> {
        let rows = sqlx::query_as::<_, TimeSlot>(
            r#"
            SELECT * FROM time_slots
            WHERE work_day_id = $1 AND is_active AND is_available
            ORDER BY time
            "#,
        )
        .bind(work_day_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete one slot
    pub async fn delete_slot(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM time_slots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(referenced_slot)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Time slot {} not found", id)));
        }
        Ok(())
    }

    /// Delete every slot of a work day
    pub async fn delete_slots(&self, work_day_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM time_slots WHERE work_day_id = $1")
            .bind(work_day_id)
            .execute(&self.pool)
            .await
            .map_err(referenced_slot)?;
        Ok(result.rows_affected())
    }
}

/// Retire the active slots of a work day and insert `times` as fresh ones
async fn swap_slots(conn: &mut PgConnection, work_day_id: i32, times: &[NaiveTime]) -> AppResult<Vec<TimeSlot>> {
    sqlx::query(
        "UPDATE time_slots SET is_active = FALSE, is_available = FALSE WHERE work_day_id = $1 AND is_active",
    )
    .bind(work_day_id)
    .execute(&mut *conn)
    .await?;

    let mut slots = sqlx::query_as::<_, TimeSlot>(
        r#"
        INSERT INTO time_slots (work_day_id, time, is_available, is_active)
        SELECT $1, t, TRUE, TRUE FROM UNNEST($2::time[]) AS t
        RETURNING *
        "#,
    )
    .bind(work_day_id)
    .bind(times)
    .fetch_all(&mut *conn)
    .await?;

    slots.sort_by_key(|s| s.time);
    Ok(slots)
}

/// Take a slot: only an active, available row flips. Zero rows means the
/// slot is gone or somebody else holds it.
pub async fn reserve_slot(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE time_slots SET is_available = FALSE WHERE id = $1 AND is_available AND is_active",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM time_slots WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Err(AppError::SlotUnavailable(format!("Time slot {} is already booked", id)))
    } else {
        Err(AppError::NotFound(format!("Time slot {} not found", id)))
    }
}

/// Give a slot back (idempotent; deactivated slots stay untouched)
pub async fn release_slot(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    sqlx::query("UPDATE time_slots SET is_available = TRUE WHERE id = $1 AND is_active")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Appointments keep their slot rows alive
fn referenced_slot(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => AppError::Validation(
            "Slot is referenced by appointments and cannot be deleted".to_string(),
        ),
        _ => AppError::Database(e),
    }
}
