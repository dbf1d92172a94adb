//! Booking core against a live Postgres database
//!
//! Needs `DATABASE_URL` pointing at a scratch database. Every test seeds its
//! own provider, clients and service, so the tests can share one database.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use booking_server::{
    config::BookingConfig,
    models::{appointment::CreateAppointment, AppointmentStatus, Actor, Appointment},
    repository::{BookingStore, Repository},
    services::Services,
    AppError, AppResult,
};

use crate::common::monday_request;

struct Db {
    pool: PgPool,
    services: Services,
    provider: Actor,
    service_id: i32,
    slots: Vec<i32>,
}

async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

async fn insert_user(pool: &PgPool, username: &str, role: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO users (username, role) VALUES ($1, $2) RETURNING id")
        .bind(username)
        .bind(role)
        .fetch_one(pool)
        .await
        .expect("Failed to insert user")
}

impl Db {
    async fn new() -> Self {
        let pool = pool().await;
        let provider = insert_user(&pool, "pg-barber", "provider").await;
        let service_id: i32 = sqlx::query_scalar(
            "INSERT INTO services (provider_id, name, price) VALUES ($1, 'Haircut', $2) RETURNING id",
        )
        .bind(provider)
        .bind(Decimal::new(3000, 2))
        .fetch_one(&pool)
        .await
        .expect("Failed to insert service");

        let store: Arc<dyn BookingStore> = Arc::new(Repository::new(pool.clone()));
        let services = Services::new(store, &BookingConfig::default()).expect("valid booking config");

        let provider = Actor::provider(provider);
        let day = services
            .schedules
            .create(&provider, &monday_request())
            .await
            .expect("work day");
        let slots = services
            .schedules
            .list_available_slots(day.id)
            .await
            .expect("slots")
            .into_iter()
            .map(|s| s.id)
            .collect();

        Self {
            pool,
            services,
            provider,
            service_id,
            slots,
        }
    }

    async fn client(&self, name: &str) -> Actor {
        Actor::client(insert_user(&self.pool, name, "client").await)
    }

    async fn book(&self, client: &Actor, slot_index: usize) -> AppResult<Appointment> {
        self.services
            .appointments
            .create(
                client,
                &CreateAppointment {
                    service_id: self.service_id,
                    time_slot_id: self.slots[slot_index],
                },
            )
            .await
    }

    async fn counter(&self, client: &Actor) -> i32 {
        sqlx::query_scalar("SELECT reward_counter FROM users WHERE id = $1")
            .bind(client.user_id)
            .fetch_one(&self.pool)
            .await
            .expect("counter")
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Run with: cargo test -- --ignored
async fn test_pg_concurrent_bookings_have_one_winner() {
    let db = Arc::new(Db::new().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        let client = db.client(&format!("pg-client-{}", i)).await;
        handles.push(tokio::spawn(async move { db.book(&client, 0).await }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => won += 1,
            Err(AppError::SlotUnavailable(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(won, 1);

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE time_slot_id = $1 AND status <> 'canceled'",
    )
    .bind(db.slots[0])
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(live, 1);
}

#[tokio::test]
#[ignore]
async fn test_pg_cancel_then_book_same_slot() {
    let db = Db::new().await;
    let first = db.client("pg-first").await;
    let second = db.client("pg-second").await;

    let appointment = db.book(&first, 0).await.unwrap();
    assert!(matches!(db.book(&second, 0).await, Err(AppError::SlotUnavailable(_))));

    db.services.appointments.cancel(&first, appointment.id).await.unwrap();
    let rebooked = db.book(&second, 0).await.unwrap();
    assert_eq!(rebooked.status, AppointmentStatus::Pending);
}

#[tokio::test]
#[ignore]
async fn test_pg_cancel_completed_decrements_once() {
    let db = Db::new().await;
    let client = db.client("pg-loyal").await;

    let appointment = db.book(&client, 0).await.unwrap();
    db.services.appointments.confirm(&db.provider, appointment.id).await.unwrap();
    db.services.appointments.complete(&db.provider, appointment.id).await.unwrap();
    assert_eq!(db.counter(&client).await, 1);

    db.services.appointments.cancel(&client, appointment.id).await.unwrap();
    assert_eq!(db.counter(&client).await, 0);

    db.services.appointments.cancel(&client, appointment.id).await.unwrap();
    assert_eq!(db.counter(&client).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_pg_counter_floor() {
    let db = Db::new().await;
    let client = db.client("pg-floor").await;

    let appointment = db.book(&client, 1).await.unwrap();
    db.services.appointments.confirm(&db.provider, appointment.id).await.unwrap();
    db.services.appointments.complete(&db.provider, appointment.id).await.unwrap();

    sqlx::query("UPDATE users SET reward_counter = 0 WHERE id = $1")
        .bind(client.user_id)
        .execute(&db.pool)
        .await
        .unwrap();

    db.services.appointments.cancel(&client, appointment.id).await.unwrap();
    assert_eq!(db.counter(&client).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_pg_booked_slot_cannot_be_deleted() {
    let db = Db::new().await;
    let client = db.client("pg-holder").await;
    db.book(&client, 0).await.unwrap();

    let result = db.services.schedules.delete_slot(&db.provider, db.slots[0]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
#[ignore]
async fn test_pg_switching_day_off_retires_slots() {
    let db = Db::new().await;
    let client = db.client("pg-late").await;
    let day_id: i32 = sqlx::query_scalar("SELECT work_day_id FROM time_slots WHERE id = $1")
        .bind(db.slots[0])
        .fetch_one(&db.pool)
        .await
        .unwrap();

    let mut request = monday_request();
    request.is_active = false;
    db.services.schedules.update(&db.provider, day_id, &request).await.unwrap();

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM time_slots WHERE work_day_id = $1 AND (is_active OR is_available)",
    )
    .bind(day_id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(live, 0);
    assert!(matches!(db.book(&client, 0).await, Err(AppError::NotFound(_))));
}
