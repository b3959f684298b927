//! Shared test utilities and fixtures
//!
//! Mock API servers and page wiring for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vouch_core::{LeaveReferencePage, PageCaches, PageSources};
use vouch_providers::retry::RetryConfig;
use vouch_providers::{ApiClient, ApiConfig};
use vouch_types::ReferenceTypeRequest;

pub type ApiPage = LeaveReferencePage<ApiClient, ApiClient>;

pub fn user_json(id: u64, username: &str, friends: &str) -> Value {
    json!({
        "userId": id,
        "username": username,
        "name": "Ana Sousa",
        "city": "Lisbon",
        "friends": friends,
    })
}

pub fn availability_json(can_write_friend: bool, host_requests: &[(u64, &str)]) -> Value {
    let references: Vec<Value> = host_requests
        .iter()
        .map(|(id, reference_type)| {
            json!({
                "hostRequestId": id,
                "referenceType": reference_type,
                "timeExpires": "2026-11-01T00:00:00Z",
            })
        })
        .collect();
    json!({
        "canWriteFriendReference": can_write_friend,
        "availableWriteReferences": references,
    })
}

pub async fn mount_user(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/users/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_availability(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/references/available/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Client for `server` with retries short enough to keep tests fast.
pub fn client(server: &MockServer) -> Arc<ApiClient> {
    let config = ApiConfig::new(server.uri().parse().unwrap())
        .unwrap()
        .with_session_token("test-session")
        .with_retry(RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        });
    Arc::new(ApiClient::new(config).unwrap())
}

pub fn open_page(server: &MockServer, route: &str, caches: PageCaches) -> ApiPage {
    let client = client(server);
    LeaveReferencePage::open(
        ReferenceTypeRequest::parse_path(route).unwrap(),
        PageSources {
            users: Arc::clone(&client),
            availability: client,
        },
        caches,
    )
}

pub fn caches() -> PageCaches {
    PageCaches::new(Duration::from_secs(60))
}
