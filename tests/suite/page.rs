//! Leave-reference page over the HTTP client

use crate::common::{
    availability_json, caches, mount_availability, mount_status, mount_user, open_page, user_json,
};
use vouch_core::{Alert, INVALID_REFERENCE_TYPE, Indicator, PageView, USER_REFERENCES_UNAVAILABLE};
use vouch_types::{EligibilityResult, FetchState, Grant, HostRequestId, ReferenceType};
use wiremock::MockServer;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn friend_reference_between_friends() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "FRIENDS")).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let mut page = open_page(&server, "/leave-reference/friend/5", caches());
    page.settled().await;

    assert_eq!(
        page.eligibility(),
        EligibilityResult::Eligible {
            grant: Grant::Friend
        }
    );
    assert_eq!(
        page.view().to_string(),
        "Write a friend reference for Ana Sousa (@ana), Lisbon"
    );
}

#[tokio::test]
async fn hosted_reference_for_listed_host_request() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "NOT_FRIENDS")).await;
    mount_availability(&server, 5, availability_json(false, &[(42, "hosted")])).await;

    let mut page = open_page(&server, "/leave-reference/hosted/5/42", caches());
    page.settled().await;

    match page.view() {
        PageView::Form {
            reference_type,
            host_request_id,
            grant,
            ..
        } => {
            assert_eq!(reference_type, ReferenceType::Hosted);
            assert_eq!(host_request_id, Some(HostRequestId::new(42)));
            assert_eq!(grant, Grant::HostRequest);
        }
        other => panic!("expected Form, got {other:?}"),
    }
}

#[tokio::test]
async fn unlisted_host_request_is_not_available() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "NOT_FRIENDS")).await;
    mount_availability(&server, 5, availability_json(false, &[(42, "hosted")])).await;

    let mut page = open_page(&server, "/leave-reference/hosted/5/43", caches());
    page.settled().await;

    assert_eq!(page.eligibility(), EligibilityResult::NotAvailable);
    assert!(matches!(page.view(), PageView::Alert(_)));
}

#[tokio::test]
async fn missing_user_blocks_the_page() {
    let server = MockServer::start().await;
    mount_status(&server, "/api/users/5", 404).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let mut page = open_page(&server, "/leave-reference/friend/5", caches());
    let state = page.settled().await;

    assert!(matches!(state.user, FetchState::Failed(_)));
    assert!(state.availability.value().is_some());
    assert_eq!(page.eligibility(), EligibilityResult::DataUnavailable);
    match page.view() {
        PageView::Blocked { indicators, alert } => {
            assert_eq!(indicators.len(), 1);
            assert!(matches!(indicators[0], Indicator::Error(_)));
            assert_eq!(alert, Alert::error(USER_REFERENCES_UNAVAILABLE));
        }
        other => panic!("expected Blocked, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "FRIENDS")).await;
    Mock::given(method("GET"))
        .and(path("/api/references/available/5"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut page = open_page(&server, "/leave-reference/friend/5", caches());
    let state = page.settled().await;

    assert!(matches!(state.availability, FetchState::Failed(_)));
    assert_eq!(page.eligibility(), EligibilityResult::DataUnavailable);
}

#[tokio::test]
async fn invalid_type_alert_does_not_wait_for_the_network() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "FRIENDS")).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let page = open_page(&server, "/leave-reference/acquaintance/5", caches());

    assert_eq!(page.eligibility(), EligibilityResult::InvalidType);
    assert_eq!(page.view(), PageView::Alert(Alert::error(INVALID_REFERENCE_TYPE)));
}

#[tokio::test]
async fn requests_carry_the_session_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/5"))
        .and(header("authorization", "Bearer test-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(5, "ana", "FRIENDS")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/references/available/5"))
        .and(header("authorization", "Bearer test-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(availability_json(true, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let mut page = open_page(&server, "/leave-reference/friend/5", caches());
    page.settled().await;
    assert!(page.eligibility().is_eligible());
}

#[tokio::test]
async fn pages_share_the_query_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(5, "ana", "FRIENDS")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/references/available/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(availability_json(true, &[(42, "hosted")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let shared = caches();
    let mut friend = open_page(&server, "/leave-reference/friend/5", shared.clone());
    friend.settled().await;
    drop(friend);

    let mut hosted = open_page(&server, "/leave-reference/hosted/5/42", shared);
    hosted.settled().await;
    assert_eq!(
        hosted.eligibility(),
        EligibilityResult::Eligible { grant: Grant::HostRequest }
    );
}

#[tokio::test]
async fn unrecognised_entry_type_keeps_the_listing() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "FRIENDS")).await;
    let available = availability_json(true, &[(7, "REFERENCE_TYPE_HOSTED"), (42, "hosted")]);
    mount_availability(&server, 5, available).await;

    let mut page = open_page(&server, "/leave-reference/friend/5", caches());
    page.settled().await;

    assert_eq!(
        page.eligibility(),
        EligibilityResult::Eligible {
            grant: Grant::Friend
        }
    );
    let state = page.state();
    let FetchState::Succeeded(available) = &state.availability else {
        panic!("availability should have decoded");
    };
    let types: Vec<_> = available
        .available_write_references
        .iter()
        .map(|entry| entry.reference_type)
        .collect();
    assert_eq!(types, [None, Some(ReferenceType::Hosted)]);
}
