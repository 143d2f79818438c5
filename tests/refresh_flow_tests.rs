// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh-and-replay tests against a mock backend.
//!
//! These tests verify that:
//! 1. A 401 with a stored refresh token triggers exactly one refresh and replay
//! 2. A failed refresh clears the session and announces expiry
//! 3. Requests are never replayed more than once
//! 4. Other statuses pass through untouched

use carebook_client::{
    services::{Dispatcher, RefreshPolicy},
    CredentialStore, Gateway, GatewayError, RefreshError, SessionEvent, Slot,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

mod common;
use common::{gateway_for, gateway_with_timeout, seeded_store};

async fn mount_bookings(server: &MockServer, token: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!([{ "id": 1 }])))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, refresh: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .and(body_json(json!({ "refresh": refresh })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_access_is_refreshed_and_replayed() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 1).await;
    mount_bookings(&server, "tok-new", 200, 1).await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new" })),
        1,
    )
    .await;

    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);
    let mut events = gateway.subscribe();

    let response = gateway.get("/bookings").send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-new"));
    assert_eq!(store.get(Slot::Refresh).as_deref(), Some("ref-1"));
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::Refreshed { .. })
    ));

    // The exchange itself is unauthenticated
    let received = server.received_requests().await.unwrap();
    let refresh_call = received
        .iter()
        .find(|r| r.url.path() == "/token/refresh/")
        .expect("refresh call recorded");
    assert!(refresh_call.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_replay_resends_identical_body() {
    let server = MockServer::start().await;
    let booking = json!({ "nurse_id": 7, "slot": "2026-10-20T09:00" });

    Mock::given(method("POST"))
        .and(path("/bookings/"))
        .and(header("authorization", "Bearer tok-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bookings/"))
        .and(header("authorization", "Bearer tok-new"))
        .and(body_json(booking.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 99 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new" })),
        1,
    )
    .await;

    let gateway = gateway_for(
        &server,
        seeded_store(Some("tok-old"), Some("ref-1")),
        RefreshPolicy::Independent,
    );

    let created: serde_json::Value = gateway
        .post("/bookings/")
        .json(&booking)
        .send_json()
        .await
        .unwrap();

    assert_eq!(created["id"], 99);
}

#[tokio::test]
async fn test_replay_keeps_caller_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/kyc/"))
        .and(header("authorization", "Bearer tok-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/kyc/"))
        .and(header("authorization", "Bearer tok-new"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new" })),
        1,
    )
    .await;

    let gateway = gateway_for(
        &server,
        seeded_store(Some("tok-old"), Some("ref-1")),
        RefreshPolicy::Independent,
    );

    let response = gateway
        .put("/kyc/")
        .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .body("licence-4411")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 204);

    let received = server.received_requests().await.unwrap();
    let uploads: Vec<_> = received
        .iter()
        .filter(|r| r.url.path() == "/kyc/")
        .collect();
    assert_eq!(uploads.len(), 2);
    for upload in uploads {
        let types: Vec<_> = upload.headers.get_all("content-type").iter().collect();
        assert_eq!(types, vec!["text/plain"]);
        assert_eq!(upload.body, b"licence-4411");
    }
}

#[tokio::test]
async fn test_unauthenticated_request_refreshes_with_stored_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/"))
        .and(header("authorization", "Bearer tok-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "balance": 0 })))
        .expect(1)
        .mount(&server)
        .await;
    // Lower priority fallback for the first, headerless attempt
    Mock::given(method("GET"))
        .and(path("/wallet/"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new" })),
        1,
    )
    .await;

    let store = seeded_store(None, Some("ref-1"));
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);

    let response = gateway.get("/wallet/").send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-new"));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 1).await;
    mount_bookings(&server, "tok-new", 200, 1).await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new", "refresh": "ref-2" })),
        1,
    )
    .await;

    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);

    let response = gateway.get("/bookings").send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-new"));
    assert_eq!(store.get(Slot::Refresh).as_deref(), Some("ref-2"));
}

#[tokio::test]
async fn test_missing_refresh_token_returns_original_401() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 2).await;
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = seeded_store(Some("tok-old"), None);
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);
    let mut events = gateway.subscribe();

    let response = gateway.get("/bookings").send().await.unwrap();
    assert_eq!(response.status(), 401);

    let err = gateway
        .get("/bookings")
        .send_json::<serde_json::Value>()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Status { status, .. } if status == 401
    ));
    assert!(!err.is_session_expired());

    // Nothing was cleared or announced
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-old"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_rejected_refresh_expires_session() {
    for refresh_status in [201u16, 204, 400, 401, 500] {
        let server = MockServer::start().await;
        mount_bookings(&server, "tok-old", 401, 1).await;
        mount_refresh(
            &server,
            "ref-1",
            ResponseTemplate::new(refresh_status).set_body_json(json!({ "detail": "invalid" })),
            1,
        )
        .await;

        let store = seeded_store(Some("tok-old"), Some("ref-1"));
        let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);
        let mut events = gateway.subscribe();

        let err = gateway.get("/bookings").send().await.unwrap_err();

        match &err {
            GatewayError::Refresh(RefreshError::Rejected { status, .. }) => {
                assert_eq!(status.as_u16(), refresh_status);
            }
            other => panic!("Expected rejected refresh, got {other:?}"),
        }
        assert!(err.is_session_expired());
        assert_eq!(err.status().map(|s| s.as_u16()), Some(refresh_status));

        assert_eq!(store.get(Slot::Access), None);
        assert_eq!(store.get(Slot::Refresh), None);
        assert!(!gateway.is_authenticated());

        match events.try_recv() {
            Ok(event @ SessionEvent::Expired { .. }) => {
                assert_eq!(event.login_path(), Some("/login"))
            }
            other => panic!("Expected expiry event, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_malformed_refresh_response_expires_session() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 1).await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "detail": "ok" })),
        1,
    )
    .await;

    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);
    let mut events = gateway.subscribe();

    let err = gateway.get("/bookings").send().await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Refresh(RefreshError::MalformedResponse(_))
    ));
    assert_eq!(store.get(Slot::Access), None);
    assert_eq!(store.get(Slot::Refresh), None);
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::Expired { .. })
    ));
}

#[tokio::test]
async fn test_refresh_transport_failure_expires_session() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 1).await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "access": "tok-new" }))
            .set_delay(Duration::from_secs(5)),
        1,
    )
    .await;

    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = gateway_with_timeout(
        &server,
        store.clone(),
        RefreshPolicy::Independent,
        Duration::from_secs(1),
    );
    let mut events = gateway.subscribe();

    let err = gateway.get("/bookings").send().await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Refresh(RefreshError::Transport(_))
    ));
    assert!(err.is_session_expired());
    assert_eq!(store.get(Slot::Access), None);
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::Expired { .. })
    ));
}

#[tokio::test]
async fn test_replayed_request_is_not_refreshed_again() {
    let server = MockServer::start().await;
    mount_bookings(&server, "tok-old", 401, 1).await;
    // Server rejects the fresh token too
    mount_bookings(&server, "tok-new", 401, 1).await;
    mount_refresh(
        &server,
        "ref-1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok-new" })),
        1,
    )
    .await;

    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);

    let response = gateway.get("/bookings").send().await.unwrap();

    assert_eq!(response.status(), 401);
    // The refresh itself succeeded, so the session stays
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-new"));
    assert_eq!(store.get(Slot::Refresh).as_deref(), Some("ref-1"));
}

#[tokio::test]
async fn test_other_error_statuses_pass_through() {
    for status in [403u16, 404, 500] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token/refresh/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = seeded_store(Some("tok-old"), Some("ref-1"));
        let gateway = gateway_for(&server, store.clone(), RefreshPolicy::Independent);

        let err = gateway
            .get("/bookings")
            .send_json::<serde_json::Value>()
            .await
            .unwrap_err();

        match err {
            GatewayError::Status { status: got, body } => {
                assert_eq!(got.as_u16(), status);
                assert_eq!(body, "nope");
            }
            other => panic!("Expected status error, got {other:?}"),
        }
        assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-old"));
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let dispatcher =
        Dispatcher::with_client(reqwest::Client::new(), "http://127.0.0.1:1/api").unwrap();
    let store = seeded_store(Some("tok-old"), Some("ref-1"));
    let gateway = Gateway::from_parts(
        dispatcher,
        store.clone(),
        "/login".to_string(),
        RefreshPolicy::Independent,
    )
    .unwrap();

    let err = gateway.get("/bookings").send().await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport(_)));
    assert!(!err.is_session_expired());
    assert_eq!(store.get(Slot::Access).as_deref(), Some("tok-old"));
    assert_eq!(store.get(Slot::Refresh).as_deref(), Some("ref-1"));
}
