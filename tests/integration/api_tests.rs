//! API integration tests (router driven in-process with `oneshot`)

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use booking_server::{
    api,
    config::AppConfig,
    models::{user::UserClaims, Actor},
    AppState,
};

use crate::common::Fixture;

fn router(fx: &Fixture) -> (Router, String) {
    let config = AppConfig::default();
    let secret = config.auth.jwt_secret.clone();
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(fx.services.clone()),
    };
    (api::create_router(state), secret)
}

fn token(actor: &Actor, secret: &str) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", actor.user_id),
        user_id: actor.user_id,
        role: actor.role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(secret)
    .unwrap()
}

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let fx = Fixture::new().await;
    let (app, _) = router(&fx);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, request(Method::GET, "/api/v1/ready", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let fx = Fixture::new().await;
    let (app, _) = router(&fx);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/client/appointments", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/client/appointments", Some("not-a-jwt"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_book_and_walk_the_lifecycle() {
    let fx = Fixture::new().await;
    let (app, secret) = router(&fx);
    let client = token(&fx.client, &secret);
    let provider = token(&fx.provider, &secret);

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/appointments",
            Some(&client),
            Some(json!({ "service_id": fx.service_id, "time_slot_id": fx.slots[0].id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["is_free"], false);
    let id = created["id"].as_i64().unwrap();

    // same slot again
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/appointments",
            Some(&token(&fx.other_client, &secret)),
            Some(json!({ "service_id": fx.service_id, "time_slot_id": fx.slots[0].id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SlotUnavailable");

    // completing a pending appointment
    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/appointments/{}/complete", id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");

    // the client cannot confirm
    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/appointments/{}/confirm", id), Some(&client), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PermissionDenied");

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/appointments/{}/confirm", id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/appointments/{}/complete", id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, body) = send(&app, request(Method::GET, "/api/v1/client/statistics", Some(&client), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reward_counter"], 1);
}

#[tokio::test]
async fn test_provider_filters_are_validated() {
    let fx = Fixture::new().await;
    let (app, secret) = router(&fx);
    let provider = token(&fx.provider, &secret);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/provider/appointments?status=done", Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/provider/appointments?day=someday", Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/provider/appointments?status=PENDING&day=Monday",
            Some(&provider),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_work_day_endpoints() {
    let fx = Fixture::new().await;
    let (app, secret) = router(&fx);
    let provider = token(&fx.provider, &secret);

    let (status, day) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/workdays",
            Some(&provider),
            Some(json!({
                "day_of_week": "wednesday",
                "start_time": "08:00:00",
                "end_time": "10:00:00",
                "lunch_start_time": "09:00:00",
                "lunch_end_time": "09:00:00",
                "slot_duration": 60
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let day_id = day["id"].as_i64().unwrap();

    let (status, slots) = send(
        &app,
        request(Method::GET, &format!("/api/v1/workdays/{}/slots/available", day_id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slots.as_array().unwrap().len(), 2);

    let (status, days) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/workdays/public?provider_id={}", fx.provider.user_id),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<&str> = days
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["day_of_week"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["monday", "wednesday"]);

    // a client cannot manage work days
    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/api/v1/workdays/{}", day_id), Some(&token(&fx.client, &secret)), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::DELETE, &format!("/api/v1/workdays/{}/slots", day_id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/api/v1/workdays/{}", day_id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_incomplete_work_day_cannot_generate() {
    let fx = Fixture::new().await;
    let (app, secret) = router(&fx);
    let provider = token(&fx.provider, &secret);

    let (_, day) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/workdays",
            Some(&provider),
            Some(json!({ "day_of_week": "friday", "start_time": "08:00:00" })),
        ),
    )
    .await;
    let day_id = day["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/workdays/{}/slots/generate", day_id), Some(&provider), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Configuration");
}
