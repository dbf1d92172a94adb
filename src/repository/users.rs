//! Users and service catalog lookups (read-only for the booking core)

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Service, User},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, role, reward_counter, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get a catalog service by ID
    pub async fn get_service(&self, id: i32) -> AppResult<Service> {
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", id)))
    }

    /// Active services of a provider
    pub async fn list_services(&self, provider_id: i32) -> AppResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE provider_id = $1 AND is_active ORDER BY id",
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
