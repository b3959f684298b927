//! Resolver decisions over decoded API payloads

use crate::common::{availability_json, user_json};
use vouch_types::{
    AvailableReferences, EligibilityInput, EligibilityResult, Grant, ReferenceTypeRequest,
    SubjectUser, resolve_eligibility,
};

fn decode(
    user: serde_json::Value,
    available: serde_json::Value,
) -> (SubjectUser, AvailableReferences) {
    (
        serde_json::from_value(user).unwrap(),
        serde_json::from_value(available).unwrap(),
    )
}

fn resolve(route: &str, user: &SubjectUser, available: &AvailableReferences) -> EligibilityResult {
    let request = ReferenceTypeRequest::parse_path(route).unwrap();
    resolve_eligibility(&EligibilityInput {
        reference_type: &request.reference_type,
        subject_user: Some(user),
        available_references: Some(available),
        host_request_id: request.host_request_id,
    })
}

#[test]
fn decision_table() {
    let cases: &[(&str, &str, bool, &[(u64, &str)], EligibilityResult)] = &[
        (
            "/leave-reference/friend/5",
            "FRIENDS",
            true,
            &[],
            EligibilityResult::Eligible {
                grant: Grant::Friend,
            },
        ),
        (
            "/leave-reference/friend/5",
            "PENDING",
            true,
            &[],
            EligibilityResult::NotAvailable,
        ),
        (
            "/leave-reference/friend/5",
            "FRIENDS",
            false,
            &[],
            EligibilityResult::NotAvailable,
        ),
        (
            "/leave-reference/surfed/5",
            "FRIENDS",
            true,
            &[],
            EligibilityResult::NotAvailable,
        ),
        (
            "/leave-reference/surfed/5/8",
            "NOT_FRIENDS",
            false,
            &[(8, "surfed")],
            EligibilityResult::Eligible {
                grant: Grant::HostRequest,
            },
        ),
        (
            "/leave-reference/hosted/5/9",
            "NA",
            false,
            &[(8, "hosted")],
            EligibilityResult::NotAvailable,
        ),
        (
            "/leave-reference/friend/5/8",
            "FRIENDS",
            true,
            &[(8, "hosted")],
            EligibilityResult::Eligible { grant: Grant::Both },
        ),
        (
            "/leave-reference/Friend/5",
            "FRIENDS",
            true,
            &[],
            EligibilityResult::InvalidType,
        ),
    ];

    for (route, friends, can_write, host_requests, expected) in cases {
        let (user, available) = decode(
            user_json(5, "ana", friends),
            availability_json(*can_write, host_requests),
        );
        assert_eq!(
            resolve(route, &user, &available),
            *expected,
            "{route} friends={friends} can_write={can_write} host_requests={host_requests:?}"
        );
    }
}

#[test]
fn invalid_type_wins_over_missing_data() {
    let request = ReferenceTypeRequest::parse_path("/leave-reference/enemy/5/8").unwrap();
    let input = EligibilityInput {
        reference_type: &request.reference_type,
        subject_user: None,
        available_references: None,
        host_request_id: request.host_request_id,
    };
    assert_eq!(resolve_eligibility(&input), EligibilityResult::InvalidType);
}

#[test]
fn missing_either_source_is_data_unavailable() {
    let (user, available) = decode(
        user_json(5, "ana", "FRIENDS"),
        availability_json(true, &[(8, "hosted")]),
    );
    for (subject_user, available_references) in
        [(Some(&user), None), (None, Some(&available)), (None, None)]
    {
        let input = EligibilityInput {
            reference_type: "friend",
            subject_user,
            available_references,
            host_request_id: None,
        };
        assert_eq!(resolve_eligibility(&input), EligibilityResult::DataUnavailable);
    }
}
