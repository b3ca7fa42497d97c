//! Service-account gate integration tests.
//!
//! Every bridge route must reject callers that are not the configured
//! service account before any operation runs.

use salvo::http::StatusCode;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn anonymous_request_is_rejected() {
    let (_host, service) = create_test_service();

    let response = TestRequest::get("/api/users/alice/calendars")
        .send(&service)
        .await;
    let response = response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json()["message"], "not the service account");
}

#[test_log::test(tokio::test)]
async fn foreign_credentials_are_rejected() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    TestRequest::get("/api/users/alice/calendars")
        .as_user("alice", "hunter2")
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn wrong_secret_is_rejected() {
    let (_host, service) = create_test_service();

    TestRequest::post("/api/calendars")
        .as_user(SERVICE_ACCOUNT, "wrong")
        .json_body(&serde_json::json!({
            "mxRoomId": "!abc:matrix",
            "displayName": "Team",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn rejection_happens_before_any_mutation() {
    let (host, service) = create_test_service();

    TestRequest::post("/api/calendars")
        .json_body(&serde_json::json!({
            "mxRoomId": "!abc:matrix",
            "displayName": "Team",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(host.journal().is_empty(), "no host call may precede the gate");
}

#[test_log::test(tokio::test)]
async fn healthcheck_is_open() {
    let (_host, service) = create_test_service();

    TestRequest::get("/api/healthcheck")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn service_account_is_accepted() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    TestRequest::get("/api/users/alice/calendars")
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
}
