//! Booking core behavior: reservation, lifecycle and rewards

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

use booking_server::{
    config::BookingConfig,
    models::{
        appointment::{CreateAppointment, ProviderAppointmentQuery},
        AppointmentStatus,
    },
    repository::BookingStore,
    services::stats::Clock,
    AppError,
};

use crate::common::{monday_request, price, Fixture};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_slot_have_one_winner() {
    let fx = Fixture::new().await;
    let request = CreateAppointment {
        service_id: fx.service_id,
        time_slot_id: fx.slots[0].id,
    };

    let mut handles = Vec::new();
    for client in [fx.client, fx.other_client] {
        let services = fx.services.clone();
        let request = CreateAppointment {
            service_id: request.service_id,
            time_slot_id: request.time_slot_id,
        };
        handles.push(tokio::spawn(async move {
            services.appointments.create(&client, &request).await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::SlotUnavailable(_)) => lost += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((won, lost), (1, 1));
    assert!(!fx.slot(0).await.is_available);
}

#[tokio::test]
async fn booking_takes_the_slot_and_copies_the_price() {
    let fx = Fixture::new().await;
    let appointment = fx.book(&fx.client, 0).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.price, Some(price()));
    assert!(!appointment.is_free);
    assert!(!fx.slot(0).await.is_available);

    let available = fx
        .services
        .schedules
        .list_available_slots(fx.work_day.id)
        .await
        .unwrap();
    assert_eq!(available.len(), 13);
}

#[tokio::test]
async fn inactive_service_cannot_be_booked() {
    let fx = Fixture::new().await;
    fx.repo.set_service_active(fx.service_id, false).await.unwrap();

    assert!(matches!(fx.book(&fx.client, 0).await, Err(AppError::NotFound(_))));
    assert!(fx.slot(0).await.is_available);
}

#[tokio::test]
async fn cancel_then_book_same_slot() {
    let fx = Fixture::new().await;
    let first = fx.book(&fx.client, 0).await.unwrap();
    assert!(matches!(
        fx.book(&fx.other_client, 0).await,
        Err(AppError::SlotUnavailable(_))
    ));

    fx.services.appointments.cancel(&fx.client, first.id).await.unwrap();
    assert!(fx.slot(0).await.is_available);

    let second = fx.book(&fx.other_client, 0).await.unwrap();
    assert_eq!(second.time_slot_id, first.time_slot_id);
}

#[tokio::test]
async fn recancel_does_not_free_a_rebooked_slot() {
    let fx = Fixture::new().await;
    let first = fx.book(&fx.client, 0).await.unwrap();
    fx.services.appointments.cancel(&fx.client, first.id).await.unwrap();
    fx.book(&fx.other_client, 0).await.unwrap();

    let again = fx.services.appointments.cancel(&fx.provider, first.id).await.unwrap();
    assert_eq!(again.status, AppointmentStatus::Canceled);
    assert!(!fx.slot(0).await.is_available);
}

#[tokio::test]
async fn sixth_appointment_after_five_completions_is_free() {
    let fx = Fixture::new().await;
    for i in 0..5 {
        let done = fx.complete_visit(&fx.client, i).await;
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(fx.counter(&fx.client).await, i as i32 + 1);
    }

    let sixth = fx.book(&fx.client, 5).await.unwrap();
    assert!(sixth.is_free);
    assert_eq!(sixth.price, Some(Decimal::ZERO));
    assert_eq!(fx.counter(&fx.client).await, 0);

    // the free visit does not count toward the next reward
    fx.services.appointments.confirm(&fx.provider, sixth.id).await.unwrap();
    fx.services.appointments.complete(&fx.provider, sixth.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 0);

    let seventh = fx.book(&fx.client, 6).await.unwrap();
    assert!(!seventh.is_free);
}

#[tokio::test]
async fn counter_four_plus_one_completion_earns_free_visit() {
    let fx = Fixture::new().await;
    fx.repo.set_reward_counter(fx.client.user_id, 4).await.unwrap();

    fx.complete_visit(&fx.client, 0).await;
    assert_eq!(fx.counter(&fx.client).await, 5);

    let next = fx.book(&fx.client, 1).await.unwrap();
    assert!(next.is_free);
    assert_eq!(fx.counter(&fx.client).await, 0);
}

#[tokio::test]
async fn canceling_completed_appointment_decrements_once() {
    let fx = Fixture::new().await;
    fx.complete_visit(&fx.client, 0).await;
    let done = fx.complete_visit(&fx.client, 1).await;
    assert_eq!(fx.counter(&fx.client).await, 2);

    fx.services.appointments.cancel(&fx.client, done.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 1);

    fx.services.appointments.cancel(&fx.client, done.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 1);
}

#[tokio::test]
async fn counter_never_goes_negative() {
    let fx = Fixture::new().await;
    let done = fx.complete_visit(&fx.client, 0).await;
    fx.repo.set_reward_counter(fx.client.user_id, 0).await.unwrap();

    fx.services.appointments.cancel(&fx.client, done.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 0);
}

#[tokio::test]
async fn complete_requires_confirmed() {
    let fx = Fixture::new().await;
    let appointment = fx.book(&fx.client, 0).await.unwrap();

    assert!(matches!(
        fx.services.appointments.complete(&fx.provider, appointment.id).await,
        Err(AppError::InvalidTransition(_))
    ));
    let stored = fx.services.appointments.get(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn confirm_requires_pending() {
    let fx = Fixture::new().await;
    let appointment = fx.book(&fx.client, 0).await.unwrap();
    fx.services.appointments.cancel(&fx.client, appointment.id).await.unwrap();

    assert!(matches!(
        fx.services.appointments.confirm(&fx.provider, appointment.id).await,
        Err(AppError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn strangers_cannot_touch_an_appointment() {
    let fx = Fixture::new().await;
    let appointment = fx.book(&fx.client, 0).await.unwrap();

    assert!(matches!(
        fx.services.appointments.cancel(&fx.other_client, appointment.id).await,
        Err(AppError::Permission(_))
    ));
    assert!(matches!(
        fx.services.appointments.confirm(&fx.client, appointment.id).await,
        Err(AppError::Permission(_))
    ));
    assert!(matches!(
        fx.services.appointments.confirm(&fx.provider, 9999).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn confirmed_policy_counts_at_confirmation() {
    let fx = Fixture::with_config(BookingConfig {
        qualifying_status: "confirmed".to_string(),
        ..BookingConfig::default()
    })
    .await;

    let appointment = fx.book(&fx.client, 0).await.unwrap();
    fx.services.appointments.confirm(&fx.provider, appointment.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 1);

    fx.services.appointments.complete(&fx.provider, appointment.id).await.unwrap();
    assert_eq!(fx.counter(&fx.client).await, 0);
}

#[tokio::test]
async fn invalid_policy_is_rejected_at_startup() {
    let repo = std::sync::Arc::new(booking_server::repository::MemoryRepository::new());
    let result = booking_server::services::Services::new(
        repo,
        &BookingConfig {
            reward_threshold: 0,
            ..BookingConfig::default()
        },
    );
    assert!(matches!(result, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn slot_registry_reserve_and_release() {
    let fx = Fixture::new().await;
    let id = fx.slots[0].id;

    fx.services.slots.reserve(id).await.unwrap();
    assert!(matches!(
        fx.services.slots.reserve(id).await,
        Err(AppError::SlotUnavailable(_))
    ));

    fx.services.slots.release(id).await.unwrap();
    fx.services.slots.release(id).await.unwrap();
    assert!(fx.slot(0).await.is_available);
}

#[tokio::test]
async fn booked_slot_cannot_be_deleted() {
    let fx = Fixture::new().await;
    fx.book(&fx.client, 0).await.unwrap();

    assert!(matches!(
        fx.services.schedules.delete_slot(&fx.provider, fx.slots[0].id).await,
        Err(AppError::Validation(_))
    ));
    fx.services
        .schedules
        .delete_slot(&fx.provider, fx.slots[1].id)
        .await
        .unwrap();
    assert!(matches!(
        fx.repo.get_slot(fx.slots[1].id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn switching_a_work_day_off_stops_bookings() {
    let fx = Fixture::new().await;
    let mut request = monday_request();
    request.is_active = false;
    fx.services
        .schedules
        .update(&fx.provider, fx.work_day.id, &request)
        .await
        .unwrap();

    let slot = fx.slot(0).await;
    assert!(!slot.is_active && !slot.is_available);
    assert!(matches!(fx.book(&fx.client, 0).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn clearing_lunch_retires_the_old_slots() {
    let fx = Fixture::new().await;
    let mut request = monday_request();
    request.lunch_start_time = None;
    fx.services
        .schedules
        .update(&fx.provider, fx.work_day.id, &request)
        .await
        .unwrap();

    assert!(fx
        .services
        .schedules
        .list_available_slots(fx.work_day.id)
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        fx.book(&fx.client, 0).await,
        Err(AppError::SlotUnavailable(_))
    ));
}

#[tokio::test]
async fn regeneration_keeps_booked_history() {
    let fx = Fixture::new().await;
    let appointment = fx.book(&fx.client, 0).await.unwrap();

    let fresh = fx
        .services
        .schedules
        .generate_slots(&fx.provider, fx.work_day.id)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 14);

    let old = fx.slot(0).await;
    assert!(!old.is_active);

    // canceling after regeneration leaves the retired slot unavailable
    fx.services.appointments.cancel(&fx.client, appointment.id).await.unwrap();
    assert!(!fx.slot(0).await.is_available);
}

#[tokio::test]
async fn provider_listing_is_filtered_and_ranked() {
    let fx = Fixture::new().await;
    let a = fx.book(&fx.client, 0).await.unwrap(); // 09:00 pending
    let b = fx.book(&fx.client, 2).await.unwrap(); // 10:00 pending
    let c = fx.book(&fx.other_client, 1).await.unwrap(); // 09:30 confirmed
    fx.services.appointments.confirm(&fx.provider, c.id).await.unwrap();
    let d = fx.complete_visit(&fx.other_client, 3).await; // 10:30 completed

    let all = fx
        .services
        .appointments
        .list_for_provider(&fx.provider, &Default::default())
        .await
        .unwrap();
    let ids: Vec<i32> = all.iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![b.id, a.id, c.id, d.id]);

    let filter = ProviderAppointmentQuery {
        status: Some("Pending".to_string()),
        client_name: Some("SILVA".to_string()),
        day: Some("monday".to_string()),
    }
    .into_filter()
    .unwrap();
    let pending = fx
        .services
        .appointments
        .list_for_provider(&fx.provider, &filter)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|x| x.client_name == "joao.silva"));

    let tuesday = ProviderAppointmentQuery {
        day: Some("tuesday".to_string()),
        ..Default::default()
    }
    .into_filter()
    .unwrap();
    assert!(fx
        .services
        .appointments
        .list_for_provider(&fx.provider, &tuesday)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn client_listing_is_newest_first() {
    let fx = Fixture::new().await;
    let first = fx.book(&fx.client, 0).await.unwrap();
    let second = fx.book(&fx.client, 1).await.unwrap();

    let list = fx
        .services
        .appointments
        .list_for_client(&fx.client)
        .await
        .unwrap();
    let ids: Vec<i32> = list.iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn statistics_reflect_committed_history() {
    let fx = Fixture::new().await;
    fx.complete_visit(&fx.client, 0).await; // 09:00
    let upcoming = fx.book(&fx.client, 8).await.unwrap(); // 14:00
    fx.services.appointments.confirm(&fx.provider, upcoming.id).await.unwrap();
    let canceled = fx.book(&fx.other_client, 1).await.unwrap();
    fx.services.appointments.cancel(&fx.other_client, canceled.id).await.unwrap();

    // a Monday at 11:00, shortly after the bookings were made
    let now = Utc::now();
    let clock = Clock {
        now,
        local_now: NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(11, 0, 0).unwrap()),
    };
    let stats = fx
        .services
        .stats
        .provider_statistics_at(&fx.provider, clock)
        .await
        .unwrap();

    assert_eq!(stats.window.total_appointments, 3);
    assert_eq!(stats.window.completed, 1);
    assert_eq!(stats.window.revenue, price());
    assert_eq!(stats.financial_metrics.lifetime_gross_revenue, price());
    assert_eq!(stats.most_popular_services.len(), 1);
    assert_eq!(stats.most_popular_services[0].appointments_count, 2);
    let upcoming_ids: Vec<i32> = stats.today_upcoming_appointments.iter().map(|u| u.id).collect();
    assert_eq!(upcoming_ids, vec![upcoming.id]);

    // nothing falls inside a window that ended before the bookings
    let later = Clock {
        now: Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap(),
        ..clock
    };
    let stale = fx
        .services
        .stats
        .provider_statistics_at(&fx.provider, later)
        .await
        .unwrap();
    assert_eq!(stale.window.total_appointments, 0);
    assert_eq!(stale.financial_metrics.lifetime_gross_revenue, price());

    let history = fx.services.stats.client_history(&fx.client).await.unwrap();
    assert_eq!(history.total_appointments, 2);
    assert_eq!(history.reward_counter, 1);
}
