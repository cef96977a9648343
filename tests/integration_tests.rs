use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Duration, Local};
use tower::ServiceExt;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::handlers;
use barberbook::state::AppState;

const ADMIN_TOKEN: &str = "test-token";

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: ADMIN_TOKEN.to_string(),
        capacity_early_week: 2,
        capacity_late_week: 3,
        booking_window_days: 90,
        cutoff_hours: 2,
        max_photos: 5,
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/availability",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/availability/range",
            get(handlers::availability::get_availability_range),
        )
        .route("/api/services", get(handlers::bookings::list_services))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/search",
            get(handlers::bookings::search_bookings),
        )
        .route(
            "/api/bookings/:ticket/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:ticket/reschedule",
            post(handlers::bookings::reschedule_booking),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings", post(handlers::admin::create_booking))
        .route(
            "/api/admin/bookings/:ticket/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/services", get(handlers::admin::list_services))
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route(
            "/api/admin/services/:id",
            post(handlers::admin::update_service),
        )
        .route("/api/admin/overrides", get(handlers::admin::list_overrides))
        .route(
            "/api/admin/overrides",
            post(handlers::admin::create_override),
        )
        .route(
            "/api/admin/overrides/block-day",
            post(handlers::admin::block_day),
        )
        .route(
            "/api/admin/overrides/:id/disable",
            post(handlers::admin::disable_override),
        )
        .route("/api/admin/reports", get(handlers::admin::get_report))
        .with_state(state)
}

/// A date safely inside the booking window, as YYYY-MM-DD.
fn future_date(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_body(date: &str, time: &str) -> serde_json::Value {
    serde_json::json!({
        "date": date,
        "time": time,
        "customer_name": "Alice",
        "customer_phone": "+15551110000",
    })
}

async fn create_booking(state: &Arc<AppState>, date: &str, time: &str) -> serde_json::Value {
    let res = test_app(state.clone())
        .oneshot(post_json("/api/bookings", booking_body(date, time), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

async fn set_override(state: &Arc<AppState>, date: &str, time_slot: &str, capacity: i64) {
    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/admin/overrides",
            serde_json::json!({ "date": date, "time_slot": time_slot, "capacity": capacity }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let res = test_app(test_state())
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_returns_ticket() {
    let state = test_state();
    let date = future_date(7);

    let body = create_booking(&state, &date, "10:00").await;
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["time_slot"], "10:00");
    let ticket = body["ticket_number"].as_str().unwrap();
    let expected_prefix = format!("TKT-{}-", date.replace('-', ""));
    assert!(ticket.starts_with(&expected_prefix), "got {ticket}");
    assert!(body["confirmed_at"].is_string());
}

#[tokio::test]
async fn test_slot_full_after_capacity_reached() {
    let state = test_state();
    let date = future_date(7);
    set_override(&state, &date, "11:20", 1).await;

    create_booking(&state, &date, "11:20").await;

    let res = test_app(state.clone())
        .oneshot(post_json("/api/bookings", booking_body(&date, "11:20"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["code"], "SLOT_FULL");
}

#[tokio::test]
async fn test_past_date_rejected() {
    let state = test_state();

    let res = test_app(state)
        .oneshot(post_json(
            "/api/bookings",
            booking_body("2020-01-06", "10:00"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "PAST_DATE");
}

#[tokio::test]
async fn test_beyond_window_rejected() {
    let state = test_state();
    let date = future_date(91);

    let res = test_app(state)
        .oneshot(post_json("/api/bookings", booking_body(&date, "10:00"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "BEYOND_BOOKING_WINDOW");
}

#[tokio::test]
async fn test_malformed_date_rejected() {
    let state = test_state();

    let res = test_app(state)
        .oneshot(post_json(
            "/api/bookings",
            booking_body("not-a-date", "10:00"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_slot_rejected() {
    let state = test_state();
    let date = future_date(7);

    let res = test_app(state)
        .oneshot(post_json("/api/bookings", booking_body(&date, "10:20"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ── Availability ──

#[tokio::test]
async fn test_availability_reflects_bookings() {
    let state = test_state();
    let date = future_date(7);

    create_booking(&state, &date, "12:00").await;

    let res = test_app(state)
        .oneshot(get_request(&format!("/api/availability?date={date}"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;

    assert_eq!(body["is_day_blocked"], false);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 8);
    let noon = slots.iter().find(|s| s["time"] == "12:00").unwrap();
    assert_eq!(noon["booked_count"], 1);
    assert_eq!(
        noon["available_spots"].as_i64().unwrap(),
        noon["total_capacity"].as_i64().unwrap() - 1
    );
}

#[tokio::test]
async fn test_blocked_day_via_block_day() {
    let state = test_state();
    let date = future_date(10);

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/admin/overrides/block-day",
            serde_json::json!({ "date": date }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(get_request(&format!("/api/availability?date={date}"), None))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["is_day_blocked"], true);

    // Booking against a blocked slot is rejected
    let res = test_app(state)
        .oneshot(post_json("/api/bookings", booking_body(&date, "10:00"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["code"], "SLOT_FULL");
}

#[tokio::test]
async fn test_disable_override_restores_base_capacity() {
    let state = test_state();
    let date = future_date(12);
    set_override(&state, &date, "10:00", 0).await;

    let res = test_app(state.clone())
        .oneshot(get_request("/api/admin/overrides", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    let overrides = body_json(res).await;
    let id = overrides.as_array().unwrap()[0]["id"].as_i64().unwrap();

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/admin/overrides/{id}/disable"),
            serde_json::json!({}),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(get_request(&format!("/api/availability?date={date}"), None))
        .await
        .unwrap();
    let body = body_json(res).await;
    let slot = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == "10:00")
        .unwrap()
        .clone();
    assert!(slot["total_capacity"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_availability_range() {
    let state = test_state();

    let start = future_date(5);
    let end = future_date(7);
    let res = test_app(state.clone())
        .oneshot(get_request(
            &format!("/api/availability/range?start_date={start}&end_date={end}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    // Oversized range is rejected
    let end = future_date(120);
    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/availability/range?start_date={start}&end_date={end}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Search ──

#[tokio::test]
async fn test_search_by_ticket_is_case_insensitive() {
    let state = test_state();
    let date = future_date(7);

    let created = create_booking(&state, &date, "10:40").await;
    let ticket = created["ticket_number"].as_str().unwrap().to_lowercase();

    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/bookings/search?ticket_number={ticket}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], created["id"]);
    assert_eq!(found[0]["customer_phone"], created["customer_phone"]);
}

#[tokio::test]
async fn test_search_by_phone_and_date() {
    let state = test_state();
    let date = future_date(7);

    create_booking(&state, &date, "10:00").await;
    create_booking(&state, &date, "12:40").await;

    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/bookings/search?phone=%2B15551110000&date={date}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_without_params_rejected() {
    let res = test_app(test_state())
        .oneshot(get_request("/api/bookings/search", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "INVALID_SEARCH_PARAMS");
}

// ── Cancel / complete / reschedule ──

#[tokio::test]
async fn test_cancel_and_cancel_again() {
    let state = test_state();
    let date = future_date(7);

    let created = create_booking(&state, &date, "13:20").await;
    let ticket = created["ticket_number"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/cancel"),
            serde_json::json!({ "reason": "plans changed" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancelled_by"], "customer");
    assert_eq!(body["cancellation_reason"], "plans changed");

    let res = test_app(state)
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/cancel"),
            serde_json::json!({ "reason": "again" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["code"], "ALREADY_CANCELLED");
}

#[tokio::test]
async fn test_admin_cancel_records_admin_actor() {
    let state = test_state();
    let date = future_date(7);

    let created = create_booking(&state, &date, "13:20").await;
    let ticket = created["ticket_number"].as_str().unwrap();

    let res = test_app(state)
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/cancel"),
            serde_json::json!({ "reason": "no-show" }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["cancelled_by"], "admin");
}

#[tokio::test]
async fn test_cancel_unknown_ticket() {
    let res = test_app(test_state())
        .oneshot(post_json(
            "/api/bookings/TKT-20250101-001/cancel",
            serde_json::json!({ "reason": "whatever" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["code"], "BOOKING_NOT_FOUND");
}

#[tokio::test]
async fn test_complete_then_cancel_rejected() {
    let state = test_state();
    let date = future_date(7);

    let created = create_booking(&state, &date, "14:00").await;
    let ticket = created["ticket_number"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/admin/bookings/{ticket}/complete"),
            serde_json::json!({}),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "completed");

    let res = test_app(state)
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/cancel"),
            serde_json::json!({ "reason": "too late" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["code"], "CANNOT_CANCEL_COMPLETED");
}

#[tokio::test]
async fn test_reschedule_moves_booking() {
    let state = test_state();
    let old_date = future_date(7);
    let new_date = future_date(9);

    let created = create_booking(&state, &old_date, "10:00").await;
    let ticket = created["ticket_number"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/reschedule"),
            serde_json::json!({ "new_date": new_date, "new_time": "12:00" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;

    assert_eq!(body["new_booking"]["status"], "confirmed");
    assert_eq!(body["new_booking"]["date"], new_date);
    assert_eq!(body["new_booking"]["original_booking_id"], created["id"]);
    assert_eq!(body["original_booking"]["status"], "cancelled");
    let new_ticket = body["new_booking"]["ticket_number"].as_str().unwrap();
    assert_eq!(
        body["original_booking"]["cancellation_reason"],
        format!("rescheduled to {new_ticket}")
    );

    // The old slot is free again
    let res = test_app(state)
        .oneshot(get_request(&format!("/api/availability?date={old_date}"), None))
        .await
        .unwrap();
    let body = body_json(res).await;
    let slot = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == "10:00")
        .unwrap()
        .clone();
    assert_eq!(slot["booked_count"], 0);
}

#[tokio::test]
async fn test_reschedule_to_blocked_slot_keeps_original() {
    let state = test_state();
    let old_date = future_date(7);
    let new_date = future_date(9);
    set_override(&state, &new_date, "12:00", 0).await;

    let created = create_booking(&state, &old_date, "10:00").await;
    let ticket = created["ticket_number"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/reschedule"),
            serde_json::json!({ "new_date": new_date, "new_time": "12:00" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/bookings/search?ticket_number={ticket}"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap()[0]["status"], "confirmed");
}

// ── Admin auth ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let res = test_app(test_state())
        .oneshot(get_request("/api/admin/bookings", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let res = test_app(test_state())
        .oneshot(get_request("/api/admin/bookings", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Services ──

#[tokio::test]
async fn test_service_lifecycle() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/admin/services",
            serde_json::json!({
                "name": "Haircut",
                "description": "Classic cut",
                "duration_minutes": 40,
                "price_cents": 3000,
            }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let service = body_json(res).await;
    let id = service["id"].as_str().unwrap().to_string();

    // Public listing shows the active service
    let res = test_app(state.clone())
        .oneshot(get_request("/api/services", None))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Haircut");

    // Deactivating hides it from the public list
    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/admin/services/{id}"),
            serde_json::json!({ "active": false }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(get_request("/api/services", None))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert!(body.as_array().unwrap().is_empty());

    // Admin listing still shows it
    let res = test_app(state)
        .oneshot(get_request("/api/admin/services", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["active"], false);
}

#[tokio::test]
async fn test_booking_with_service() {
    let state = test_state();
    let date = future_date(7);

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/admin/services",
            serde_json::json!({ "name": "Beard trim", "duration_minutes": 20, "price_cents": 1500 }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    let service = body_json(res).await;
    let service_id = service["id"].as_str().unwrap();

    let mut body = booking_body(&date, "10:00");
    body["service_id"] = serde_json::json!(service_id);
    let res = test_app(state)
        .oneshot(post_json("/api/bookings", body, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let booking = body_json(res).await;
    assert_eq!(booking["duration_minutes"], 20);
    assert_eq!(booking["service_id"], service_id);
}

// ── Admin bookings and reports ──

#[tokio::test]
async fn test_admin_manual_booking_with_notes() {
    let state = test_state();
    let date = future_date(7);

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/admin/bookings",
            serde_json::json!({
                "date": date,
                "time": "10:00",
                "customer_name": "Walk In",
                "customer_phone": "+15552220000",
                "admin_notes": "regular, prefers chair 2",
            }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["admin_notes"], "regular, prefers chair 2");

    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/admin/bookings?date={date}&status=confirmed"),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_counts_by_status() {
    let state = test_state();
    let date = future_date(7);

    let a = create_booking(&state, &date, "10:00").await;
    create_booking(&state, &date, "10:40").await;

    let ticket = a["ticket_number"].as_str().unwrap();
    let res = test_app(state.clone())
        .oneshot(post_json(
            &format!("/api/bookings/{ticket}/cancel"),
            serde_json::json!({ "reason": "sick" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(get_request(
            &format!("/api/admin/reports?start_date={date}&end_date={date}"),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["total_bookings"], 2);
    assert_eq!(body["total_cancelled"], 1);
    let days = body["days"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["confirmed"], 1);
    assert_eq!(days[0]["cancelled"], 1);
}
